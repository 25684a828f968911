//! RemoteFetch strategy: download and stage the pinned GDAL distribution.

use std::path::{Path, PathBuf};

use crate::cli::output::OutputManager;
use crate::config::{self, BuildEnv, StagingRoot};
use crate::error::{ConfigError, FsResultExt, ProvisionError, Result};
use crate::utils::http::{self, FetchClient};

use super::{Provisioned, RuntimeLocation, confirm, pkgconfig};

/// Pinned GDAL release staged on the remote path.
pub const GDAL_VERSION: &str = "3.6.3";

/// GISInternals MSVC 2022 x64 binaries archive for the pinned release.
const GDAL_BINARIES_URL: &str =
    "https://download.gisinternals.com/sdk/downloads/release-1930-x64-gdal-3-6-3-mapserver-8-0-0.zip";

/// Matching headers and import-libraries archive.
const GDAL_LIBS_URL: &str =
    "https://download.gisinternals.com/sdk/downloads/release-1930-x64-gdal-3-6-3-mapserver-8-0-0-libs.zip";

/// PROJ resources inside the extracted release tree.
const PROJ_SHARE_SUBDIR: &str = "bin/proj9/share";

/// The two fixed download endpoints, cross-checked against the pinned
/// version string.
#[derive(Debug, Clone)]
pub struct RemoteEndpoints {
    binaries_url: String,
    libs_url: String,
}

impl RemoteEndpoints {
    /// The pinned GISInternals endpoints.
    ///
    /// Fails when the pinned version no longer appears in either URL, which
    /// catches a bumped endpoint whose version constant was left behind (or
    /// the reverse) before any download starts.
    pub fn pinned() -> std::result::Result<Self, ConfigError> {
        Self::checked(GDAL_VERSION, GDAL_BINARIES_URL, GDAL_LIBS_URL)
    }

    fn checked(
        version: &str,
        binaries_url: &str,
        libs_url: &str,
    ) -> std::result::Result<Self, ConfigError> {
        // GISInternals spells the version with dashes in its file names.
        let dashed = version.replace('.', "-");
        for url in [binaries_url, libs_url] {
            if !url.contains(&dashed) {
                return Err(ConfigError::VersionNotInUrl {
                    version: version.to_string(),
                    url: url.to_string(),
                });
            }
        }
        Ok(Self {
            binaries_url: binaries_url.to_string(),
            libs_url: libs_url.to_string(),
        })
    }
}

/// Downloads both pinned archives, extracts them into `staging/gdal`, writes
/// the package descriptor, and (when asked) provisions the companion
/// pkg-config toolchain.
pub(super) async fn provision(
    endpoints: &RemoteEndpoints,
    provision_pkg_config: bool,
    assume_yes: bool,
    staging: &StagingRoot,
    output: &OutputManager,
) -> Result<Provisioned> {
    let approved = confirm(
        &format!("Download the GDAL {GDAL_VERSION} runtime from GISInternals?"),
        assume_yes,
    )?;
    if !approved {
        return Err(ProvisionError::Declined {
            what: "GDAL runtime archives".to_string(),
        }
        .into());
    }

    let gdal_dir = staging.gdal_dir();
    tokio::fs::create_dir_all(&gdal_dir)
        .await
        .fs_context("creating runtime directory", &gdal_dir)?;

    let client = FetchClient::insecure()?;
    for url in [&endpoints.binaries_url, &endpoints.libs_url] {
        let name = http::file_name_of(url);
        output.progress(&format!("Downloading {name}"));
        let data = client.download_with_retry(url, output).await?;
        output.progress(&format!("Extracting {name}"));
        http::extract_zip(&data, &gdal_dir).await?;
    }
    output.success(&format!("GDAL {GDAL_VERSION} staged"));

    let descriptor = PackageDescriptor::for_staged_runtime(&gdal_dir);
    let descriptor_path = descriptor.write_to(&gdal_dir).await?;
    log::debug!("wrote package descriptor {}", descriptor_path.display());

    let proj_data = gdal_dir.join(PROJ_SHARE_SUBDIR);
    let mut build_env = BuildEnv::new();
    build_env.set(config::GDAL_HOME, &gdal_dir);
    build_env.set(config::PROJ_DATA, &proj_data);
    // gdal.pc sits at the runtime root, so that is the search path.
    build_env.set(config::PKG_CONFIG_PATH, &gdal_dir);

    if provision_pkg_config {
        pkgconfig::provision(&client, staging, &gdal_dir, assume_yes, &mut build_env, output)
            .await?;
    }

    Ok(Provisioned {
        location: RuntimeLocation {
            home: gdal_dir,
            proj_data,
        },
        build_env,
    })
}

/// Synthesized pkg-config descriptor advertising the staged runtime's
/// install layout to the build toolchain.
#[derive(Debug)]
pub struct PackageDescriptor {
    name: String,
    prefix: PathBuf,
    version: String,
}

impl PackageDescriptor {
    fn for_staged_runtime(gdal_dir: &Path) -> Self {
        Self {
            name: "gdal".to_string(),
            prefix: gdal_dir.to_path_buf(),
            version: GDAL_VERSION.to_string(),
        }
    }

    /// The `.pc` text: prefix plus the derived lib/include dirs and link
    /// flags for the import library.
    fn render(&self) -> String {
        format!(
            "prefix={prefix}\n\
             libdir=${{prefix}}/lib\n\
             includedir=${{prefix}}/include\n\
             \n\
             Name: {name}\n\
             Description: GDAL runtime staged for release packaging\n\
             Version: {version}\n\
             Libs: -L${{libdir}} -lgdal_i\n\
             Cflags: -I${{includedir}}\n",
            prefix = self.prefix.display(),
            name = self.name,
            version = self.version,
        )
    }

    async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.pc", self.name));
        tokio::fs::write(&path, self.render())
            .await
            .fs_context("writing package descriptor", &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_endpoints_match_the_pinned_version() {
        assert!(RemoteEndpoints::pinned().is_ok());
    }

    #[test]
    fn version_and_url_drift_is_caught() {
        let err = RemoteEndpoints::checked("3.7.0", GDAL_BINARIES_URL, GDAL_LIBS_URL)
            .expect_err("URLs still carry 3.6.3");
        assert!(matches!(err, ConfigError::VersionNotInUrl { .. }));
    }

    #[test]
    fn drift_in_only_one_url_is_caught() {
        let bumped = GDAL_BINARIES_URL.replace("3-6-3", "3-7-0");
        let err = RemoteEndpoints::checked(GDAL_VERSION, &bumped, GDAL_LIBS_URL)
            .expect_err("binaries URL no longer matches");
        assert!(matches!(err, ConfigError::VersionNotInUrl { .. }));
    }

    #[test]
    fn descriptor_advertises_the_install_layout() {
        let descriptor = PackageDescriptor::for_staged_runtime(Path::new("/stage/gdal"));
        let text = descriptor.render();
        assert!(text.starts_with("prefix=/stage/gdal\n"));
        assert!(text.contains("libdir=${prefix}/lib"));
        assert!(text.contains("includedir=${prefix}/include"));
        assert!(text.contains("Name: gdal"));
        assert!(text.contains("Version: 3.6.3"));
        assert!(text.contains("Libs: -L${libdir} -lgdal_i"));
        assert!(text.contains("Cflags: -I${includedir}"));
    }

    #[tokio::test]
    async fn descriptor_lands_next_to_the_runtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = PackageDescriptor::for_staged_runtime(dir.path());
        let path = descriptor.write_to(dir.path()).await.expect("write");
        assert_eq!(path, dir.path().join("gdal.pc"));
        let written = tokio::fs::read_to_string(&path).await.expect("read back");
        assert!(written.contains("Name: gdal"));
    }
}
