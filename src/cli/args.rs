//! Command line argument parsing.
//!
//! One subcommand, a handful of flags. The tool is designed to "just work":
//! run it from the project root, point it at an output directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::OutputManager;

/// Release pipeline for the topology-checker CLI
#[derive(Parser, Debug)]
#[command(
    name = "topology_checker_release",
    version,
    about = "Build, stage, and archive a topology-checker release",
    long_about = "Compiles topology-checker in release mode, stages the GDAL \
runtime it links against, packages the end-user launcher, and assembles the \
versioned distribution archive.

Usage:
  topology_checker_release build ./out --yes
  topology_checker_release build ./out --local-gdal"
)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the release pipeline, staging into TARGET_DIR
    Build {
        /// Directory the release tree is staged into
        #[arg(value_name = "TARGET_DIR")]
        target_dir: PathBuf,

        /// Reuse the GDAL installation from the environment instead of
        /// downloading the pinned release
        #[arg(long)]
        local_gdal: bool,

        /// Answer every download prompt with yes
        #[arg(long, env = "TOPOLOGY_RELEASE_ASSUME_YES")]
        yes: bool,
    },
}

impl Command {
    /// Subcommand name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}
