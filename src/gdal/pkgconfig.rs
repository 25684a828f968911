//! Companion pkg-config toolchain provisioning.
//!
//! The GISInternals runtime ships no pkg-config binary, so builds on a bare
//! machine cannot discover the staged GDAL. When the governing variable
//! (`PKG_CONFIG_SYSROOT_DIR`) is absent, this downloads pkg-config-lite,
//! stages it under `pkg-config/` (never archived), and wires the build
//! environment to the extracted executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cli::output::OutputManager;
use crate::config::{self, BuildEnv, StagingRoot};
use crate::error::{FsResultExt, ProvisionError, Result};
use crate::utils::http::{self, FetchClient};

use super::confirm;

/// SourceForge "latest release" redirect for pkg-config-lite.
const PKG_CONFIG_LITE_URL: &str =
    "https://sourceforge.net/projects/pkgconfiglite/files/latest/download";

/// Executable searched for inside the extracted tree.
const PKG_CONFIG_EXE_NAME: &str = "pkg-config.exe";

/// Fetches pkg-config-lite and adds `{PKG_CONFIG, PKG_CONFIG_SYSROOT_DIR}`
/// to the build environment.
///
/// Gated by the same confirmation rules as the GDAL download; a decline is
/// fatal because the build cannot discover the staged runtime without it.
pub(super) async fn provision(
    client: &FetchClient,
    staging: &StagingRoot,
    gdal_dir: &Path,
    assume_yes: bool,
    build_env: &mut BuildEnv,
    output: &OutputManager,
) -> Result<()> {
    let approved = confirm(
        "PKG_CONFIG_SYSROOT_DIR is unset. Download pkg-config-lite for the build?",
        assume_yes,
    )?;
    if !approved {
        return Err(ProvisionError::Declined {
            what: "pkg-config-lite toolchain".to_string(),
        }
        .into());
    }

    let dest = staging.pkg_config_dir();
    tokio::fs::create_dir_all(&dest)
        .await
        .fs_context("creating toolchain directory", &dest)?;

    output.progress("Downloading pkg-config-lite");
    let data = client.download_with_retry(PKG_CONFIG_LITE_URL, output).await?;
    http::extract_zip(&data, &dest).await?;

    let exe = find_executable(&dest, PKG_CONFIG_EXE_NAME)?;
    output.success(&format!("pkg-config staged at {}", exe.display()));

    build_env.set(config::PKG_CONFIG_EXE, &exe);
    build_env.set(config::PKG_CONFIG_SYSROOT, gdal_dir);
    Ok(())
}

/// Locates `name` inside the extracted tree.
///
/// The release archive nests its binaries under a version-dependent top
/// directory, so the executable is found by search rather than fixed path.
fn find_executable(root: &Path, name: &str) -> std::result::Result<PathBuf, ProvisionError> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == OsStr::new(name))
        .map(|entry| entry.into_path())
        .ok_or_else(|| ProvisionError::MissingToolBinary {
            name: name.to_string(),
            dir: root.to_path_buf(),
        })
}
