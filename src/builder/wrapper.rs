//! Wrapper launcher packaging.
//!
//! The end-user launcher is produced by PyInstaller from a fixed spec file.
//! This is the most environment-sensitive stage of the pipeline, so its
//! stderr is captured and surfaced verbatim on failure.

use tokio::process::Command;

use crate::cli::output::OutputManager;
use crate::config::{ProjectLayout, StagingRoot};
use crate::error::{Result, WrapperError};
use crate::utils;

/// Tool that turns the launcher spec into a self-contained executable.
const WRAPPER_TOOL: &str = "pyinstaller";

/// Builds the wrapper launcher and places it at the staging root.
///
/// The tool's presence is checked up front so a missing PyInstaller reads as
/// exactly that instead of a raw spawn failure. It runs from the spec file's
/// directory, where its `dist/` output lands.
pub async fn build_and_stage(
    project: &ProjectLayout,
    staging: &StagingRoot,
    output: &OutputManager,
) -> Result<()> {
    let tool = which::which(WRAPPER_TOOL).map_err(|_| WrapperError::ToolMissing {
        tool: WRAPPER_TOOL.to_string(),
    })?;
    log::debug!("found {} at {}", WRAPPER_TOOL, tool.display());

    let spec = project.wrapper_spec();
    if !spec.exists() {
        return Err(WrapperError::SpecMissing { path: spec }.into());
    }
    let spec_dir = spec.parent().unwrap_or(project.root());

    output.progress("Packaging wrapper launcher");
    let result = Command::new(&tool)
        .arg(spec.file_name().unwrap_or_default())
        .current_dir(spec_dir)
        .output()
        .await
        .map_err(|source| WrapperError::Spawn {
            tool: WRAPPER_TOOL.to_string(),
            source,
        })?;

    if !result.status.success() {
        return Err(WrapperError::Failed {
            status: result.status,
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        }
        .into());
    }

    stage_launcher(project, staging).await?;
    output.success(&format!(
        "Wrapper staged at {}",
        staging.wrapper_path().display()
    ));
    Ok(())
}

/// Copies the produced launcher to the staging root.
///
/// A prior artifact of the same name is removed first, whether file or
/// directory; some tool versions leave a directory there.
async fn stage_launcher(project: &ProjectLayout, staging: &StagingRoot) -> Result<()> {
    let built = project.wrapper_dist_binary();
    if !built.exists() {
        return Err(WrapperError::ArtifactMissing { path: built }.into());
    }

    let dest = staging.wrapper_path();
    utils::fs::remove_existing(&dest).await?;
    utils::fs::copy_file(&built, &dest).await?;
    Ok(())
}
