//! The `build` command: the full release pipeline, start to finish.

use std::path::Path;

use crate::archive;
use crate::builder;
use crate::cli::RuntimeConfig;
use crate::config::{DiscoveryEnv, GdalInstall, PKG_CONFIG_SYSROOT, ProjectLayout, StagingRoot};
use crate::error::Result;
use crate::gdal::{GdalSource, RemoteEndpoints};
use crate::version;

/// Runs the pipeline: provision the GDAL runtime, build the binary, package
/// the wrapper, stage everything, and assemble the versioned archive.
///
/// Stages run strictly in sequence. The acquisition strategy is selected
/// once, here, with everything it needs resolved before the first stage
/// touches the filesystem; the first failing stage aborts the run.
pub(super) async fn execute_build(
    target_dir: &Path,
    local_gdal: bool,
    yes: bool,
    config: &RuntimeConfig,
) -> Result<()> {
    let output = config.output();
    let project = ProjectLayout::from_current_dir()?;

    output.section("topology-checker release");
    output.info(&format!("project root: {}", project.root().display()));
    output.info(&format!("staging into: {}", target_dir.display()));

    let staging = StagingRoot::create(target_dir).await?;

    let source = if local_gdal {
        GdalSource::Local {
            install: GdalInstall::from_env()?,
            discovery: DiscoveryEnv::from_env()?,
        }
    } else {
        GdalSource::Remote {
            endpoints: RemoteEndpoints::pinned()?,
            provision_pkg_config: std::env::var_os(PKG_CONFIG_SYSROOT).is_none(),
            assume_yes: yes,
        }
    };
    output.info(&format!("GDAL source: {}", source.describe()));

    output.section("Provisioning GDAL runtime");
    let provisioned = source.provision(&staging, output).await?;
    log::debug!("runtime staged at {}", provisioned.location.home.display());

    output.section("Building topology-checker");
    builder::build_release(&project, &provisioned.build_env, output).await?;
    builder::stage_binary(&project, &staging, output).await?;

    output.section("Packaging wrapper");
    builder::wrapper::build_and_stage(&project, &staging, output).await?;

    output.section("Assembling archive");
    let tool_version = version::read_tool_version(&project.manifest())?;
    output.info(&format!("tool version: {tool_version}"));
    let summary = archive::assemble(&staging, &tool_version, output).await?;

    output.section("Release summary");
    output.success(&format!("archive: {}", summary.path.display()));
    output.indent(&format!("files:  {}", summary.entries));
    output.indent(&format!("sha256: {}", summary.sha256));

    Ok(())
}
