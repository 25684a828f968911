//! End-to-end pipeline tests.
//!
//! These drive the real binary against a fake tool project, a fake GDAL
//! installation, and fake `cargo`/`pyinstaller` executables placed first on
//! PATH, so the whole pipeline runs without a compiler, a Python toolchain,
//! or the network.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// A fake `cargo` that drops the expected binary and records the GDAL_HOME
/// it was handed.
const CARGO_OK: &str = "#!/bin/sh
mkdir -p target/release
printf 'native-binary' > target/release/topology-checker.exe
printf '%s' \"$GDAL_HOME\" > cargo-saw-gdal-home.txt
exit 0
";

/// A fake `cargo` whose build fails.
const CARGO_FAIL: &str = "#!/bin/sh
echo 'error[E0308]: mismatched types' >&2
exit 101
";

/// A fake `pyinstaller` that drops the launcher where the real one would.
const PYINSTALLER_OK: &str = "#!/bin/sh
mkdir -p dist
printf 'launcher' > dist/topology-checker.exe
exit 0
";

/// A fake `pyinstaller` whose packaging fails.
const PYINSTALLER_FAIL: &str = "#!/bin/sh
echo 'boom: missing hook for osgeo' >&2
exit 1
";

/// Everything one pipeline run needs on disk.
struct TestWorld {
    temp: TempDir,
}

impl TestWorld {
    fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let world = Self { temp };

        // The tool project being released.
        let project = world.project_dir();
        fs::create_dir_all(project.join("scripts")).expect("scripts dir");
        fs::write(
            project.join("Cargo.toml"),
            "[package]\nname = \"topology-checker\"\nversion = \"2.0.0\"\nedition = \"2021\"\n",
        )
        .expect("manifest");
        fs::write(
            project.join("scripts").join("topology_checker.spec"),
            "# pyinstaller spec\n",
        )
        .expect("spec file");

        // A fake GDAL installation with runtime, headers, and libs.
        let gdal = world.gdal_home();
        fs::create_dir_all(gdal.join("bin/proj9/share")).expect("proj dirs");
        fs::create_dir_all(gdal.join("include")).expect("include dir");
        fs::create_dir_all(gdal.join("lib")).expect("lib dir");
        fs::write(gdal.join("bin/gdal306.dll"), b"dll").expect("dll");
        fs::write(gdal.join("bin/proj9/share/proj.db"), b"db").expect("proj db");
        fs::write(gdal.join("include/gdal.h"), b"header").expect("header");
        fs::write(gdal.join("lib/gdal_i.lib"), b"implib").expect("implib");

        fs::create_dir_all(world.fake_bin()).expect("fake bin dir");
        world.write_tool("cargo", CARGO_OK);
        world.write_tool("pyinstaller", PYINSTALLER_OK);
        world
    }

    fn project_dir(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    fn out_dir(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    fn gdal_home(&self) -> PathBuf {
        self.temp.path().join("gdal-install")
    }

    fn proj_lib(&self) -> PathBuf {
        self.gdal_home().join("bin/proj9/share")
    }

    fn fake_bin(&self) -> PathBuf {
        self.temp.path().join("fake-bin")
    }

    fn write_tool(&self, name: &str, script: &str) {
        let path = self.fake_bin().join(name);
        fs::write(&path, script).expect("tool script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    /// The release binary with fake tools first on PATH and every pipeline
    /// variable scrubbed from the inherited environment.
    fn release_cmd(&self) -> Command {
        let mut path = self.fake_bin().into_os_string();
        if let Some(inherited) = std::env::var_os("PATH") {
            path.push(":");
            path.push(inherited);
        }

        let mut cmd = cargo_bin_cmd!("topology_checker_release");
        cmd.current_dir(self.project_dir())
            .env("PATH", path)
            .env_remove("GDAL_HOME")
            .env_remove("PROJ_LIB")
            .env_remove("PKG_CONFIG_PATH")
            .env_remove("PKG_CONFIG_SYSROOT_DIR")
            .env_remove("PKG_CONFIG")
            .env_remove("TOPOLOGY_RELEASE_ASSUME_YES")
            .env_remove("TOPOLOGY_RELEASE_FETCH_RETRIES");
        cmd
    }

    /// `release_cmd` wired for the LocalCopy strategy.
    fn local_build_cmd(&self) -> Command {
        let mut cmd = self.release_cmd();
        cmd.arg("build")
            .arg(self.out_dir())
            .arg("--local-gdal")
            .env("GDAL_HOME", self.gdal_home())
            .env("PROJ_LIB", self.proj_lib())
            .env("PKG_CONFIG_PATH", self.gdal_home().join("lib/pkgconfig"));
        cmd
    }
}

fn archive_names(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).expect("open archive");
    let archive = zip::ZipArchive::new(file).expect("read archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

// =============================================================================
// Smoke
// =============================================================================

#[test]
fn help_flag_works() {
    cargo_bin_cmd!("topology_checker_release")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn fixture_manifest_version_reads_as_digits() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Cargo.toml");
    let version =
        topology_checker_release::version::read_tool_version(&manifest).expect("fixture parses");
    assert_eq!(version, "200");
}

// =============================================================================
// Full pipeline, LocalCopy strategy
// =============================================================================

#[test]
fn full_run_stages_and_archives_the_release() {
    let world = TestWorld::new();

    world.local_build_cmd().assert().success();

    let out = world.out_dir();
    assert_eq!(
        fs::read(out.join("bin/topology-checker.exe")).expect("staged binary"),
        b"native-binary"
    );
    assert!(out.join("gdal/bin/gdal306.dll").exists());
    assert_eq!(
        fs::read(out.join("topology-checker.exe")).expect("staged wrapper"),
        b"launcher"
    );

    let archive = out.join("topology_checker_v200.zip");
    assert!(archive.exists(), "versioned archive must be produced");
    assert_eq!(
        archive_names(&archive),
        vec![
            "bin/topology-checker.exe",
            "gdal/bin/gdal306.dll",
            "gdal/bin/proj9/share/proj.db",
            "topology-checker.exe",
        ]
    );
}

#[test]
fn build_subprocess_receives_the_explicit_environment() {
    let world = TestWorld::new();

    world.local_build_cmd().assert().success();

    let seen = fs::read_to_string(world.project_dir().join("cargo-saw-gdal-home.txt"))
        .expect("fake cargo recorded its environment");
    assert_eq!(PathBuf::from(seen.trim()), world.gdal_home());
}

#[test]
fn rerun_reuses_the_staged_runtime_and_replaces_the_archive() {
    let world = TestWorld::new();

    world.local_build_cmd().assert().success();
    world.local_build_cmd().assert().success();

    assert!(world.out_dir().join("topology_checker_v200.zip").exists());
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn failed_build_stops_the_pipeline_before_archiving() {
    let world = TestWorld::new();
    world.write_tool("cargo", CARGO_FAIL);

    world
        .local_build_cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cargo build --release failed"));

    assert!(
        !world.out_dir().join("topology_checker_v200.zip").exists(),
        "no archive may exist after a failed build"
    );
}

#[test]
fn wrapper_failure_surfaces_the_tool_stderr() {
    let world = TestWorld::new();
    world.write_tool("pyinstaller", PYINSTALLER_FAIL);

    world
        .local_build_cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("boom: missing hook for osgeo"));

    assert!(!world.out_dir().join("topology_checker_v200.zip").exists());
}

#[test]
fn missing_environment_names_every_absent_variable() {
    let world = TestWorld::new();

    world
        .release_cmd()
        .arg("build")
        .arg(world.out_dir())
        .arg("--local-gdal")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GDAL_HOME").and(predicate::str::contains("PROJ_LIB")));
}

#[test]
fn non_interactive_run_declines_the_download() {
    let world = TestWorld::new();

    // No --local-gdal and no --yes: the GDAL download prompt cannot be
    // answered without a terminal, so the run declines and stops.
    world
        .release_cmd()
        .arg("build")
        .arg(world.out_dir())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("declined"));

    assert!(!world.out_dir().join("gdal").exists());
}
