//! Release archive assembly.
//!
//! Walks the staging tree, filters out what must not ship, and streams the
//! survivors into the versioned zip. The included set is computed fresh on
//! every run; nothing about it is persisted.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cli::output::OutputManager;
use crate::config::StagingRoot;
use crate::error::{ArchiveError, FsResultExt, ReleaseError, Result};

/// Staging subtrees that never ship: headers and import libraries trim the
/// distribution to the binary runtime, and the provisioned toolchain is
/// build-time only.
const PRUNED_SUBTREES: &[&str] = &["gdal/include", "gdal/lib", "pkg-config"];

/// File-name globs for OS and tooling cruft.
const CRUFT_GLOBS: &[&str] = &["Thumbs.db", "desktop.ini", ".DS_Store", "*.pyc"];

/// Directories whose entire contents are cruft.
const CRUFT_DIRS: &[&str] = &["__pycache__"];

/// What assembly produced: where the archive is, how many files went in,
/// and its digest.
#[derive(Debug)]
pub struct ArchiveSummary {
    /// Final archive path inside the staging root.
    pub path: PathBuf,
    /// Number of files archived.
    pub entries: usize,
    /// Hex SHA-256 of the finished archive.
    pub sha256: String,
}

/// Assembles the release archive for `version` from the staging tree.
///
/// A stale archive of the same name from an earlier run is deleted first, so
/// it can neither survive nor be archived into its successor. The zip itself
/// is written on the blocking pool; entries are streamed file by file with
/// `[current/total]` progress.
pub async fn assemble(
    staging: &StagingRoot,
    version: &str,
    output: &OutputManager,
) -> Result<ArchiveSummary> {
    let archive_name = StagingRoot::archive_file_name(version);
    let archive_path = staging.archive_path(version);

    crate::utils::fs::remove_existing(&archive_path).await?;

    let root = staging.path().to_path_buf();
    let path = archive_path.clone();
    let out = output.clone();
    let entries = tokio::task::spawn_blocking(move || write_archive(&root, &path, &archive_name, &out))
        .await
        .map_err(|e| ReleaseError::Task {
            reason: format!("archive assembly: {}", e),
        })??;

    let sha256 = sha256_of(&archive_path).await?;
    Ok(ArchiveSummary {
        path: archive_path,
        entries,
        sha256,
    })
}

fn write_archive(
    root: &Path,
    archive_path: &Path,
    archive_name: &str,
    output: &OutputManager,
) -> Result<usize> {
    let manifest = collect_manifest(root, archive_name)?;
    let total = manifest.len();
    log::info!("archiving {} files from {}", total, root.display());

    let file = File::create(archive_path).fs_context("creating archive", archive_path)?;
    let mut writer = ZipWriter::new(file);
    // One-time release artifact: maximum compression beats speed.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for (index, rel) in manifest.iter().enumerate() {
        let name = entry_name(rel);
        output.progress_step(index + 1, total, &name);

        writer.start_file(name, options).map_err(ArchiveError::Zip)?;
        let source_path = root.join(rel);
        let mut source = File::open(&source_path).fs_context("reading file", &source_path)?;
        io::copy(&mut source, &mut writer).fs_context("compressing file", &source_path)?;
    }

    writer.finish().map_err(ArchiveError::Zip)?;
    Ok(total)
}

/// Every file that ships, relative to the staging root, in walk order
/// (siblings sorted by name, so runs are deterministic).
fn collect_manifest(root: &Path, archive_name: &str) -> Result<Vec<PathBuf>> {
    let cruft = cruft_patterns()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(ArchiveError::Walk)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| ArchiveError::OutsideRoot {
                path: entry.path().to_path_buf(),
            })?
            .to_path_buf();
        if excluded(&rel, archive_name, &cruft) {
            continue;
        }
        files.push(rel);
    }

    Ok(files)
}

fn cruft_patterns() -> std::result::Result<Vec<Pattern>, ArchiveError> {
    CRUFT_GLOBS
        .iter()
        .map(|g| Pattern::new(g))
        .collect::<std::result::Result<_, _>>()
        .map_err(ArchiveError::Pattern)
}

fn excluded(rel: &Path, archive_name: &str, cruft: &[Pattern]) -> bool {
    // The archive must never swallow itself, wherever a same-named file sits.
    if rel.file_name().is_some_and(|name| name == archive_name) {
        return true;
    }
    if PRUNED_SUBTREES.iter().any(|subtree| rel.starts_with(subtree)) {
        return true;
    }
    if rel
        .components()
        .any(|c| CRUFT_DIRS.iter().any(|d| c.as_os_str() == *d))
    {
        return true;
    }
    if let Some(name) = rel.file_name().and_then(|n| n.to_str()) {
        if cruft.iter().any(|p| p.matches(name)) {
            return true;
        }
    }
    false
}

/// Zip entry name: relative path with `/` separators on every platform, so
/// extraction reproduces the staging layout.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

async fn sha256_of(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening archive", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading archive", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
