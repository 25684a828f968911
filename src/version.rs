//! Release version extraction from the tool manifest.

use std::path::Path;

use crate::error::{Result, VersionError};

/// Digits-only version used to name the release archive.
///
/// Scans the manifest line by line and concatenates the digits of the first
/// line that starts with `version`, so `version = "1.4.2"` yields `142`. The
/// textual scan (rather than a TOML parse) is deliberate: it is the naming
/// contract released archives have always followed. A manifest without a
/// version line, or whose version carries no digits, is an error — the
/// archive name must never be minted from an empty value.
pub fn read_tool_version(manifest: &Path) -> Result<String> {
    let text = std::fs::read_to_string(manifest).map_err(|source| VersionError::Unreadable {
        path: manifest.to_path_buf(),
        source,
    })?;

    let line = text
        .lines()
        .find(|line| line.starts_with("version"))
        .ok_or_else(|| VersionError::NoVersionLine {
            path: manifest.to_path_buf(),
        })?;

    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(VersionError::NoDigits {
            path: manifest.to_path_buf(),
            line: line.to_string(),
        }
        .into());
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use std::io::Write;

    fn manifest_with(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Cargo.toml");
        let mut file = std::fs::File::create(&path).expect("create manifest");
        file.write_all(contents.as_bytes()).expect("write manifest");
        (dir, path)
    }

    #[test]
    fn concatenates_digits_of_the_version_line() {
        let (_dir, path) = manifest_with(
            "[package]\nname = \"topology-checker\"\nversion = \"1.4.2\"\nedition = \"2021\"\n",
        );
        assert_eq!(read_tool_version(&path).expect("version"), "142");
    }

    #[test]
    fn multi_digit_components_keep_all_digits() {
        let (_dir, path) = manifest_with("version = \"0.10.2\"\n");
        assert_eq!(read_tool_version(&path).expect("version"), "0102");
    }

    #[test]
    fn first_matching_line_wins() {
        let (_dir, path) = manifest_with("version = \"2.0.0\"\nversion = \"9.9.9\"\n");
        assert_eq!(read_tool_version(&path).expect("version"), "200");
    }

    #[test]
    fn ignores_lines_not_starting_with_version() {
        let (_dir, path) = manifest_with(
            "[package]\nname = \"topology-checker\"\n\n[dependencies]\ngdal = { version = \"0.16\" }\n",
        );
        assert!(matches!(
            read_tool_version(&path),
            Err(ReleaseError::Version(VersionError::NoVersionLine { .. }))
        ));
    }

    #[test]
    fn version_without_digits_is_an_error() {
        let (_dir, path) = manifest_with("version = \"\"\n");
        assert!(matches!(
            read_tool_version(&path),
            Err(ReleaseError::Version(VersionError::NoDigits { .. }))
        ));
    }

    #[test]
    fn unreadable_manifest_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Cargo.toml");
        assert!(matches!(
            read_tool_version(&path),
            Err(ReleaseError::Version(VersionError::Unreadable { .. }))
        ));
    }
}
