//! Error types for the release pipeline.
//!
//! Every stage reports through one taxonomy so the top-level handler can
//! print a single actionable message and decide the process exit code.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for release pipeline operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release pipeline operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Environment and configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime provisioning errors
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Native build errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Wrapper packaging errors
    #[error("Wrapper error: {0}")]
    Wrapper(#[from] WrapperError),

    /// Manifest version errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Archive assembly errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO errors carrying the operation and the path it failed on
    #[error("{context} {path}: {source}")]
    Fs {
        /// What was being attempted
        context: &'static str,
        /// Path the operation failed on
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {reason}")]
    Task {
        /// Reason for the error
        reason: String,
    },
}

/// Environment and configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required environment variables are unset
    #[error("missing required environment variable(s): {}", names.join(", "))]
    MissingEnv {
        /// Names of every unset variable in the requested set
        names: Vec<String>,
    },

    /// PROJ resources must live inside the GDAL installation
    #[error("PROJ_LIB ({proj_data}) is not inside GDAL_HOME ({gdal_home})")]
    ProjOutsideGdal {
        /// Configured PROJ resource path
        proj_data: PathBuf,
        /// Configured GDAL installation root
        gdal_home: PathBuf,
    },

    /// Pinned runtime version and download URL drifted apart
    #[error("pinned GDAL version {version} does not appear in download URL {url}")]
    VersionNotInUrl {
        /// Pinned version string
        version: String,
        /// Offending download URL
        url: String,
    },
}

/// Runtime provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Transport-level download failure (connect, timeout, TLS)
    #[error("download failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("download of {url} failed with HTTP {status}")]
    Status {
        /// URL that was fetched
        url: String,
        /// Status the server returned
        status: reqwest::StatusCode,
    },

    /// Downloaded archive could not be read
    #[error("corrupt archive: {reason}")]
    BadArchive {
        /// Reason for the error
        reason: String,
    },

    /// A required download was declined
    #[error("required download declined: {what}")]
    Declined {
        /// What the user declined to download
        what: String,
    },

    /// Confirmation prompt could not be read
    #[error("confirmation prompt failed: {reason}")]
    Prompt {
        /// Reason for the error
        reason: String,
    },

    /// Expected executable was not present in an extracted tree
    #[error("'{name}' not found under {dir} after extraction")]
    MissingToolBinary {
        /// Executable file name searched for
        name: String,
        /// Extraction root that was searched
        dir: PathBuf,
    },
}

/// Native build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build tool could not be started
    #[error("failed to run {tool}: {source}")]
    Spawn {
        /// Tool that failed to start
        tool: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Compiler reported failure
    #[error("cargo build --release failed with {status}")]
    Failed {
        /// Exit status of the build
        status: ExitStatus,
    },

    /// Build reported success but the binary is not where it should be
    #[error("compiled binary not found at {path}")]
    MissingBinary {
        /// Expected binary path
        path: PathBuf,
    },
}

/// Wrapper packaging errors
#[derive(Error, Debug)]
pub enum WrapperError {
    /// Packaging tool is not installed
    #[error("wrapper packaging tool '{tool}' not found on PATH")]
    ToolMissing {
        /// Tool name looked up
        tool: String,
    },

    /// Fixed wrapper spec file is absent
    #[error("wrapper spec file not found at {path}")]
    SpecMissing {
        /// Expected spec file path
        path: PathBuf,
    },

    /// Packaging tool could not be started
    #[error("failed to run {tool}: {source}")]
    Spawn {
        /// Tool that failed to start
        tool: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Packaging tool reported failure; its stderr is preserved verbatim
    #[error("wrapper build failed with {status}\n{stderr}")]
    Failed {
        /// Exit status of the packaging tool
        status: ExitStatus,
        /// Captured stderr of the packaging tool
        stderr: String,
    },

    /// Packaging tool succeeded but produced no launcher
    #[error("wrapper artifact not found at {path}")]
    ArtifactMissing {
        /// Expected launcher path
        path: PathBuf,
    },
}

/// Manifest version errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Manifest file could not be read
    #[error("cannot read manifest {path}: {source}")]
    Unreadable {
        /// Manifest path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No line in the manifest starts with `version`
    #[error("no version line found in {path}")]
    NoVersionLine {
        /// Manifest path
        path: PathBuf,
    },

    /// The version line carried no digits to name the archive with
    #[error("version line in {path} contains no digits: {line:?}")]
    NoDigits {
        /// Manifest path
        path: PathBuf,
        /// Offending line
        line: String,
    },
}

/// Archive assembly errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Zip writer failure
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Staging tree walk failure
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Exclusion pattern failed to compile
    #[error("exclusion pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A walked entry resolved outside the staging root
    #[error("entry {path} is outside the staging root")]
    OutsideRoot {
        /// Offending path
        path: PathBuf,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::MissingEnv { names }) => vec![
                format!("Set the missing variable(s): {}", names.join(", ")),
                "GDAL_HOME points at the GDAL install root, PROJ_LIB at its PROJ data directory"
                    .to_string(),
            ],
            ReleaseError::Config(ConfigError::ProjOutsideGdal { .. }) => vec![
                "Point PROJ_LIB at a directory inside the GDAL_HOME tree".to_string(),
                "A typical layout is GDAL_HOME=C:\\gdal with PROJ_LIB=C:\\gdal\\bin\\proj9\\share"
                    .to_string(),
            ],
            ReleaseError::Config(ConfigError::VersionNotInUrl { .. }) => vec![
                "Update the pinned GDAL version and its download URLs together".to_string(),
            ],
            ReleaseError::Provision(ProvisionError::Declined { .. }) => vec![
                "Re-run with --yes to approve downloads unattended".to_string(),
                "Or pass --local-gdal to reuse a pre-installed GDAL".to_string(),
            ],
            ReleaseError::Provision(
                ProvisionError::Request(_) | ProvisionError::Status { .. },
            ) => vec![
                "Check network connectivity and retry".to_string(),
                "Raise TOPOLOGY_RELEASE_FETCH_RETRIES on a flaky connection".to_string(),
            ],
            ReleaseError::Build(BuildError::Failed { .. }) => vec![
                "Inspect the compiler output above".to_string(),
                "Reproduce with 'cargo build --release' in the project root".to_string(),
            ],
            ReleaseError::Wrapper(WrapperError::ToolMissing { .. }) => vec![
                "Install PyInstaller: pip install pyinstaller".to_string(),
                "Make sure the Python scripts directory is on PATH".to_string(),
            ],
            ReleaseError::Wrapper(WrapperError::Failed { .. }) => vec![
                "Review the PyInstaller stderr above".to_string(),
                "Reproduce with 'pyinstaller topology_checker.spec' in scripts/".to_string(),
            ],
            ReleaseError::Version(_) => vec![
                "Ensure the project Cargo.toml has a version = \"X.Y.Z\" line".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check whether a retry could plausibly succeed.
    ///
    /// Only transport failures and server-side HTTP errors qualify; build,
    /// wrapper, and configuration failures are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ReleaseError::Provision(ProvisionError::Request(_)) => true,
            ReleaseError::Provision(ProvisionError::Status { status, .. }) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Extension trait attaching operation context and a path to raw IO results
pub trait FsResultExt<T> {
    /// Wrap an IO error with what was being attempted and where
    fn fs_context(self, context: &'static str, path: &Path) -> Result<T>;
}

impl<T> FsResultExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| ReleaseError::Fs {
            context,
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_covers_transport_failures_only() {
        let declined: ReleaseError = ProvisionError::Declined {
            what: "GDAL runtime archives".to_string(),
        }
        .into();
        assert!(!declined.is_transient());

        let server_error: ReleaseError = ProvisionError::Status {
            url: "https://example.invalid/gdal.zip".to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        }
        .into();
        assert!(server_error.is_transient());

        let not_found: ReleaseError = ProvisionError::Status {
            url: "https://example.invalid/gdal.zip".to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        }
        .into();
        assert!(!not_found.is_transient());
    }

    #[test]
    fn missing_env_names_every_variable() {
        let err = ConfigError::MissingEnv {
            names: vec!["GDAL_HOME".to_string(), "PROJ_LIB".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("GDAL_HOME"));
        assert!(message.contains("PROJ_LIB"));
    }

    #[test]
    fn wrapper_failure_preserves_stderr() {
        #[cfg(unix)]
        use std::os::unix::process::ExitStatusExt;
        #[cfg(windows)]
        use std::os::windows::process::ExitStatusExt;

        let err = WrapperError::Failed {
            status: ExitStatus::from_raw(1),
            stderr: "spec file rejected: bad hidden import".to_string(),
        };
        assert!(err.to_string().contains("spec file rejected"));
    }
}
