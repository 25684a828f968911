//! Pipeline configuration: environment resolution, build environment
//! hand-off, and the fixed project/staging layouts.
//!
//! Everything the pipeline knows about paths lives here. The build step never
//! reads the process environment itself; it receives an explicit [`BuildEnv`]
//! assembled during provisioning and materialized only onto the child
//! process.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FsResultExt, Result};

/// Environment variable naming the GDAL installation root.
pub const GDAL_HOME: &str = "GDAL_HOME";
/// Environment variable naming the PROJ resource directory.
pub const PROJ_DATA: &str = "PROJ_LIB";
/// Environment variable with the pkg-config search path.
pub const PKG_CONFIG_PATH: &str = "PKG_CONFIG_PATH";
/// Environment variable governing companion pkg-config provisioning.
pub const PKG_CONFIG_SYSROOT: &str = "PKG_CONFIG_SYSROOT_DIR";
/// Environment variable naming the pkg-config executable for the build.
pub const PKG_CONFIG_EXE: &str = "PKG_CONFIG";

/// Stem of the release archive: `topology_checker_v<version>.zip`.
pub const ARCHIVE_STEM: &str = "topology_checker";
/// File name of the compiled CLI binary.
pub const BIN_FILE: &str = "topology-checker.exe";
/// File name of the wrapper launcher placed at the staging root.
pub const WRAPPER_FILE: &str = "topology-checker.exe";
/// Staging subdirectory holding the compiled binary.
pub const BIN_DIR: &str = "bin";
/// Staging subdirectory holding the bundled GDAL runtime.
pub const GDAL_DIR: &str = "gdal";
/// Staging subdirectory holding the provisioned pkg-config toolchain.
pub const PKG_CONFIG_DIR: &str = "pkg-config";

/// Read every variable in `names`, collecting all missing entries into one
/// error.
///
/// Resolution is all-or-nothing: either every variable is present (and
/// non-empty) or a [`ConfigError::MissingEnv`] names each absent one and
/// nothing else happens.
pub fn require_env(names: &[&str]) -> std::result::Result<Vec<OsString>, ConfigError> {
    require_env_from(|name| std::env::var_os(name), names)
}

/// [`require_env`] over an arbitrary lookup, so tests never touch the
/// process-global environment table.
pub fn require_env_from<F>(
    lookup: F,
    names: &[&str],
) -> std::result::Result<Vec<OsString>, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match lookup(name) {
            Some(value) if !value.is_empty() => values.push(value),
            _ => missing.push((*name).to_string()),
        }
    }
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(ConfigError::MissingEnv { names: missing })
    }
}

/// A pre-installed GDAL tree, as described by `{GDAL_HOME, PROJ_LIB}`.
#[derive(Debug, Clone)]
pub struct GdalInstall {
    /// GDAL installation root.
    pub home: PathBuf,
    /// PROJ resource directory; must live inside `home`.
    pub proj_data: PathBuf,
}

impl GdalInstall {
    /// Resolve from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Resolve from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut values = require_env_from(lookup, &[GDAL_HOME, PROJ_DATA])?.into_iter();
        Ok(Self {
            home: PathBuf::from(values.next().unwrap_or_default()),
            proj_data: PathBuf::from(values.next().unwrap_or_default()),
        })
    }

    /// The PROJ resource directory relative to the installation root.
    ///
    /// The check is lexical, exactly as strict as the paths the user
    /// configured; no canonicalization happens.
    pub fn proj_relative(&self) -> std::result::Result<PathBuf, ConfigError> {
        self.proj_data
            .strip_prefix(&self.home)
            .map(Path::to_path_buf)
            .map_err(|_| ConfigError::ProjOutsideGdal {
                proj_data: self.proj_data.clone(),
                gdal_home: self.home.clone(),
            })
    }
}

/// How the build toolchain discovers a pre-installed GDAL:
/// `{GDAL_HOME, PKG_CONFIG_PATH}`.
#[derive(Debug, Clone)]
pub struct DiscoveryEnv {
    /// GDAL installation root handed to the build.
    pub gdal_home: PathBuf,
    /// pkg-config search path handed to the build.
    pub pkg_config_path: OsString,
}

impl DiscoveryEnv {
    /// Resolve from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Resolve from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut values = require_env_from(lookup, &[GDAL_HOME, PKG_CONFIG_PATH])?.into_iter();
        Ok(Self {
            gdal_home: PathBuf::from(values.next().unwrap_or_default()),
            pkg_config_path: values.next().unwrap_or_default(),
        })
    }
}

/// Environment handed to the build subprocess.
///
/// Provisioning fills this in; nothing is written to the process-wide
/// environment table. The variables reach the child via [`BuildEnv::apply`]
/// at the spawn site and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    vars: BTreeMap<String, OsString>,
}

impl BuildEnv {
    /// Empty environment: the child inherits the parent untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one variable for the build subprocess.
    pub fn set(&mut self, name: &str, value: impl Into<OsString>) {
        self.vars.insert(name.to_string(), value.into());
    }

    /// True when no overrides are carried.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate the overrides in stable (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_os_str()))
    }

    /// Materialize the overrides onto a child process command.
    pub fn apply(&self, command: &mut tokio::process::Command) {
        for (name, value) in &self.vars {
            command.env(name, value);
        }
    }

    /// Human-readable `NAME=value` listing for verbose output.
    pub fn describe(&self) -> String {
        self.vars
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.to_string_lossy()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fixed layout of the tool project being released.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Layout rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the current working directory.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self {
            root: std::env::current_dir()?,
        })
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The manifest carrying the `version = "X.Y.Z"` line.
    pub fn manifest(&self) -> PathBuf {
        self.root.join("Cargo.toml")
    }

    /// Where the release build drops the compiled binary.
    pub fn release_binary(&self) -> PathBuf {
        self.root.join("target").join("release").join(BIN_FILE)
    }

    /// The fixed PyInstaller spec file.
    pub fn wrapper_spec(&self) -> PathBuf {
        self.root.join("scripts").join("topology_checker.spec")
    }

    /// Where PyInstaller drops the launcher, relative to the spec directory.
    pub fn wrapper_dist_binary(&self) -> PathBuf {
        self.root.join("scripts").join("dist").join(WRAPPER_FILE)
    }
}

/// Output directory the release tree is assembled in.
///
/// Owns `bin/`, `gdal/`, the wrapper at its root, and the final archive.
/// Created once per run and never deleted by the pipeline.
#[derive(Debug, Clone)]
pub struct StagingRoot {
    root: PathBuf,
}

impl StagingRoot {
    /// Create the staging directory (and parents) if needed.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let root = path.into();
        tokio::fs::create_dir_all(&root)
            .await
            .fs_context("creating staging directory", &root)?;
        Ok(Self { root })
    }

    /// Staging root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `bin/` subdirectory holding the compiled binary.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    /// `gdal/` subdirectory holding the staged runtime.
    pub fn gdal_dir(&self) -> PathBuf {
        self.root.join(GDAL_DIR)
    }

    /// `pkg-config/` subdirectory holding the provisioned toolchain.
    pub fn pkg_config_dir(&self) -> PathBuf {
        self.root.join(PKG_CONFIG_DIR)
    }

    /// Wrapper launcher path at the staging root.
    pub fn wrapper_path(&self) -> PathBuf {
        self.root.join(WRAPPER_FILE)
    }

    /// File name of the release archive for a version.
    pub fn archive_file_name(version: &str) -> String {
        format!("{}_v{}.zip", ARCHIVE_STEM, version)
    }

    /// Full path of the release archive for a version.
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.root.join(Self::archive_file_name(version))
    }
}
