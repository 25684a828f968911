//! LocalCopy strategy: reuse a pre-installed GDAL tree.

use crate::cli::output::OutputManager;
use crate::config::{self, BuildEnv, DiscoveryEnv, GdalInstall, StagingRoot};
use crate::error::Result;
use crate::utils;

use super::{Provisioned, RuntimeLocation};

/// Copies the caller's GDAL installation into `staging/gdal`.
///
/// The path relationship is validated before anything is touched: a
/// `PROJ_LIB` outside `GDAL_HOME` fails with no filesystem mutation. An
/// already-staged `gdal/` directory is trusted as-is and not re-copied; a
/// stale copy is the caller's to delete.
pub(super) async fn provision(
    install: &GdalInstall,
    discovery: &DiscoveryEnv,
    staging: &StagingRoot,
    output: &OutputManager,
) -> Result<Provisioned> {
    let proj_rel = install.proj_relative()?;

    let gdal_dir = staging.gdal_dir();
    if gdal_dir.exists() {
        output.info(&format!(
            "GDAL runtime already staged at {}, skipping copy",
            gdal_dir.display()
        ));
        log::info!("reusing staged GDAL at {}", gdal_dir.display());
    } else {
        output.progress(&format!(
            "Copying GDAL runtime from {}",
            install.home.display()
        ));
        utils::fs::copy_dir(&install.home, &gdal_dir).await?;
        output.success("GDAL runtime staged");
    }

    // The build keeps seeing the caller's own installation; the hand-off is
    // just made explicit instead of inherited.
    let mut build_env = BuildEnv::new();
    build_env.set(config::GDAL_HOME, &install.home);
    build_env.set(config::PROJ_DATA, &install.proj_data);
    build_env.set(config::PKG_CONFIG_PATH, &discovery.pkg_config_path);

    let proj_data = gdal_dir.join(proj_rel);
    Ok(Provisioned {
        location: RuntimeLocation {
            home: gdal_dir,
            proj_data,
        },
        build_env,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn quiet_output() -> OutputManager {
        OutputManager::new(false, true)
    }

    fn discovery_for(install: &GdalInstall) -> DiscoveryEnv {
        DiscoveryEnv {
            gdal_home: install.home.clone(),
            pkg_config_path: OsString::from(install.home.join("lib/pkgconfig")),
        }
    }

    async fn fake_install(root: &std::path::Path) -> GdalInstall {
        let home = root.join("gdal-install");
        let proj = home.join("bin").join("proj9").join("share");
        tokio::fs::create_dir_all(&proj).await.expect("proj dirs");
        tokio::fs::create_dir_all(home.join("bin")).await.expect("bin dir");
        tokio::fs::write(home.join("bin").join("gdal306.dll"), b"dll")
            .await
            .expect("dll");
        tokio::fs::write(proj.join("proj.db"), b"db").await.expect("db");
        GdalInstall {
            home,
            proj_data: proj,
        }
    }

    #[tokio::test]
    async fn copies_the_install_into_staging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let install = fake_install(dir.path()).await;
        let staging = StagingRoot::create(dir.path().join("out")).await.expect("staging");

        let provisioned = provision(&install, &discovery_for(&install), &staging, &quiet_output())
            .await
            .expect("provision");

        assert!(staging.gdal_dir().join("bin/gdal306.dll").exists());
        assert_eq!(provisioned.location.home, staging.gdal_dir());
        assert_eq!(
            provisioned.location.proj_data,
            staging.gdal_dir().join("bin/proj9/share")
        );
    }

    #[tokio::test]
    async fn build_env_forwards_the_callers_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let install = fake_install(dir.path()).await;
        let staging = StagingRoot::create(dir.path().join("out")).await.expect("staging");

        let provisioned = provision(&install, &discovery_for(&install), &staging, &quiet_output())
            .await
            .expect("provision");

        let vars: Vec<(String, OsString)> = provisioned
            .build_env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_os_string()))
            .collect();
        assert!(vars.contains(&("GDAL_HOME".to_string(), install.home.clone().into())));
        assert!(vars.contains(&("PROJ_LIB".to_string(), install.proj_data.clone().into())));
        assert!(vars.iter().any(|(k, _)| k == "PKG_CONFIG_PATH"));
    }

    #[tokio::test]
    async fn existing_staged_runtime_is_not_recopied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let install = fake_install(dir.path()).await;
        let staging = StagingRoot::create(dir.path().join("out")).await.expect("staging");

        let staged = staging.gdal_dir();
        tokio::fs::create_dir_all(&staged).await.expect("staged dir");
        tokio::fs::write(staged.join("sentinel.txt"), b"keep")
            .await
            .expect("sentinel");

        provision(&install, &discovery_for(&install), &staging, &quiet_output())
            .await
            .expect("provision");

        assert!(staged.join("sentinel.txt").exists());
        assert!(
            !staged.join("bin/gdal306.dll").exists(),
            "existing staging must be trusted as-is"
        );
    }

    #[tokio::test]
    async fn proj_outside_home_fails_before_any_mutation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let install = GdalInstall {
            home: dir.path().join("gdal-install"),
            proj_data: PathBuf::from("/usr/share/proj"),
        };
        let staging = StagingRoot::create(dir.path().join("out")).await.expect("staging");

        let err = provision(&install, &discovery_for(&install), &staging, &quiet_output())
            .await
            .expect_err("proj outside home");

        assert!(err.to_string().contains("not inside"));
        assert!(!staging.gdal_dir().exists(), "no mutation on bad config");
    }
}
