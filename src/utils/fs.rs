//! File system utilities for staging release artifacts.
//!
//! Safe copy operations with automatic parent creation, symlink
//! preservation, and path-carrying errors.

use std::io;
use std::path::Path;

use tokio::fs;

use crate::error::{FsResultExt, ReleaseError, Result};

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file, creating any parent directories of the destination
/// as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::metadata(from).await.fs_context("copying file", from)?;
    if !meta.is_file() {
        return Err(ReleaseError::Fs {
            context: "copying file",
            path: from.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file to", to)?;
    Ok(())
}

/// Recursively copies a directory tree, creating any parent directories of
/// the destination as necessary.
///
/// Preserves symlinks on platforms that support them. Fails if the source
/// path is not a directory or doesn't exist.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::metadata(from).await.fs_context("copying directory", from)?;
    if !meta.is_dir() {
        return Err(ReleaseError::Fs {
            context: "copying directory",
            path: from.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| ReleaseError::Fs {
            context: "walking directory",
            path: from.to_path_buf(),
            source: io::Error::from(e),
        })?;
        let rel_path = entry.path().strip_prefix(from).map_err(|e| ReleaseError::Fs {
            context: "resolving path under",
            path: entry.path().to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            if entry.path().is_dir() {
                symlink_dir(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
            } else {
                symlink_file(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
            }
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file to", &dest_path)?;
        }
    }

    Ok(())
}

/// Removes whatever sits at `path` — file, symlink, or directory tree.
///
/// Absent paths are fine; placement stages call this before dropping a fresh
/// artifact so a stale file can never collide with a directory of the same
/// name.
pub async fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path),
        Ok(_) => fs::remove_file(path).await.fs_context("removing file", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("inspecting path", path),
    }
}
