//! GDAL runtime provisioning.
//!
//! Two strategies make the native runtime available under the staging root:
//! [`GdalSource::Local`] copies the installation the caller's environment
//! points at, [`GdalSource::Remote`] downloads the pinned distribution. The
//! strategy is selected once per run, with every input it needs resolved at
//! selection time, and exposes a single capability: [`GdalSource::provision`].

pub mod local;
pub mod pkgconfig;
pub mod remote;

use std::io::IsTerminal;
use std::path::PathBuf;

use crate::cli::output::OutputManager;
use crate::config::{BuildEnv, DiscoveryEnv, GdalInstall, StagingRoot};
use crate::error::{ProvisionError, Result};

pub use remote::RemoteEndpoints;

/// Where the staged runtime lives once provisioning is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLocation {
    /// Runtime root directory under the staging root.
    pub home: PathBuf,
    /// PROJ resource directory, always inside `home`.
    pub proj_data: PathBuf,
}

/// What a strategy hands back: the staged runtime plus the environment the
/// native build must see.
#[derive(Debug)]
pub struct Provisioned {
    /// The staged (or reused) runtime.
    pub location: RuntimeLocation,
    /// Variables for the build subprocess.
    pub build_env: BuildEnv,
}

/// How the GDAL runtime reaches the staging root.
#[derive(Debug)]
pub enum GdalSource {
    /// Copy the installation the caller's environment points at.
    Local {
        /// The pre-installed tree (`GDAL_HOME`, `PROJ_LIB`).
        install: GdalInstall,
        /// What the build uses to find it (`GDAL_HOME`, `PKG_CONFIG_PATH`).
        discovery: DiscoveryEnv,
    },
    /// Download and stage the pinned distribution.
    Remote {
        /// The two fixed download endpoints.
        endpoints: RemoteEndpoints,
        /// Offer the companion pkg-config download as well.
        provision_pkg_config: bool,
        /// Answer every download prompt affirmatively.
        assume_yes: bool,
    },
}

impl GdalSource {
    /// Makes the runtime available under `staging`, returning where it landed
    /// and the build environment to hand the compiler.
    pub async fn provision(
        &self,
        staging: &StagingRoot,
        output: &OutputManager,
    ) -> Result<Provisioned> {
        match self {
            GdalSource::Local { install, discovery } => {
                local::provision(install, discovery, staging, output).await
            }
            GdalSource::Remote {
                endpoints,
                provision_pkg_config,
                assume_yes,
            } => {
                remote::provision(endpoints, *provision_pkg_config, *assume_yes, staging, output)
                    .await
            }
        }
    }

    /// Strategy name for progress output.
    pub fn describe(&self) -> &'static str {
        match self {
            GdalSource::Local { .. } => "local GDAL installation",
            GdalSource::Remote { .. } => "pinned GDAL download",
        }
    }
}

/// Asks the user to approve a download. Returns `true` to proceed.
///
/// `assume_yes` always accepts. Without a terminal on stdin the answer is
/// "no" immediately, so unattended runs never block on a prompt.
pub(crate) fn confirm(
    prompt: &str,
    assume_yes: bool,
) -> std::result::Result<bool, ProvisionError> {
    if assume_yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        log::info!("no interactive terminal, declining: {prompt}");
        return Ok(false);
    }

    let answer = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact_opt()
        .map_err(|e| ProvisionError::Prompt {
            reason: e.to_string(),
        })?;

    // None is an interrupted prompt (Ctrl-C); treat it as a decline.
    Ok(answer.unwrap_or(false))
}
