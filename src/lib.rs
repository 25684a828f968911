//! # topology_checker_release
//!
//! Release packaging pipeline for the topology-checker geospatial CLI.
//!
//! topology-checker links against GDAL, so shipping it means shipping the
//! native runtime alongside the binary. This crate drives the whole release:
//! it provisions a GDAL runtime under a staging directory (copying a local
//! installation or downloading the pinned distribution), compiles the tool in
//! release mode with an explicit build environment, packages the end-user
//! launcher with PyInstaller, and streams the staged tree into a versioned
//! zip archive.
//!
//! ## Features
//!
//! - **Explicit build hand-off**: the build subprocess receives a
//!   [`config::BuildEnv`] value; the process-wide environment is never
//!   mutated
//! - **Interchangeable acquisition**: [`gdal::GdalSource`] copies a local
//!   GDAL tree or fetches the pinned release, selected once per run
//! - **Unattended operation**: `--yes` auto-approves downloads; sessions
//!   without a terminal decline instead of blocking
//! - **Bounded network**: every fetch has connect/download timeouts and
//!   retry with exponential backoff; builds are never retried
//! - **Filtered archives**: headers, import libraries, staged tooling, and
//!   OS cruft never reach the distribution zip
//!
//! ## Usage
//!
//! ```bash
//! topology_checker_release build ./out --yes          # download GDAL, full run
//! topology_checker_release build ./out --local-gdal   # reuse GDAL_HOME
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod archive;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod gdal;
pub mod utils;
pub mod version;

// Re-export main types for public API
pub use archive::ArchiveSummary;
pub use cli::{Args, OutputManager};
pub use config::{BuildEnv, GdalInstall, ProjectLayout, StagingRoot};
pub use error::{ReleaseError, Result};
pub use gdal::{GdalSource, Provisioned, RuntimeLocation};
