//! Native build invocation and artifact placement.

pub mod wrapper;

use tokio::process::Command;

use crate::cli::output::OutputManager;
use crate::config::{self, BuildEnv, ProjectLayout, StagingRoot};
use crate::error::{BuildError, FsResultExt, Result};
use crate::utils;

/// Runs `cargo build --release` in the project root with the provisioned
/// environment applied to the child process.
///
/// Compiler output streams straight through to the console; only the exit
/// status is inspected. Nonzero exit aborts the pipeline before any
/// packaging. Builds are never retried; incremental behavior is the
/// toolchain's own business.
pub async fn build_release(
    project: &ProjectLayout,
    build_env: &BuildEnv,
    output: &OutputManager,
) -> Result<()> {
    output.progress("Running cargo build --release");
    if output.is_verbose() && !build_env.is_empty() {
        output.verbose("build environment overrides:");
        for line in build_env.describe().lines() {
            output.indent(line);
        }
    }

    let mut cmd = Command::new("cargo");
    cmd.args(["build", "--release"]);
    cmd.current_dir(project.root());
    build_env.apply(&mut cmd);

    let status = cmd.status().await.map_err(|source| BuildError::Spawn {
        tool: "cargo".to_string(),
        source,
    })?;

    if !status.success() {
        return Err(BuildError::Failed { status }.into());
    }

    output.success("Native build finished");
    Ok(())
}

/// Copies the freshly built binary into `staging/bin`, replacing any
/// previous copy.
///
/// The binary's presence is verified first; a build that "succeeded" without
/// producing it is reported as such rather than as a copy failure.
pub async fn stage_binary(
    project: &ProjectLayout,
    staging: &StagingRoot,
    output: &OutputManager,
) -> Result<()> {
    let built = project.release_binary();
    if !built.exists() {
        return Err(BuildError::MissingBinary { path: built }.into());
    }

    let bin_dir = staging.bin_dir();
    tokio::fs::create_dir_all(&bin_dir)
        .await
        .fs_context("creating bin directory", &bin_dir)?;

    let dest = bin_dir.join(config::BIN_FILE);
    utils::fs::remove_existing(&dest).await?;
    utils::fs::copy_file(&built, &dest).await?;

    output.success(&format!("Binary staged at {}", dest.display()));
    Ok(())
}
