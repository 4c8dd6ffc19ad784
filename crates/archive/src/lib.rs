#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Archive service for component payloads
//!
//! Payloads are plain `tar` or zstd-compressed `tar`, told apart by their
//! magic bytes. Extraction never writes outside the destination: absolute
//! entry paths and `..` components are rejected, not clamped. All codec work
//! runs on the blocking pool.

mod create;
mod extract;
mod format;

pub use create::create_archive_sync;
pub use extract::{extract_sync, list_entries_sync};
pub use format::{detect_format_sync, ArchiveFormat, ZSTD_MAGIC};

use ifw_errors::{Error, Result};
use ifw_hash::{Hash, HashAlgorithm};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    HardLink,
    Other,
}

/// One entry as recorded in the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path relative to the extraction root, already normalised
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<PathBuf>,
}

/// What an extraction created, in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractReport {
    /// Files and links written (absolute paths)
    pub files: Vec<PathBuf>,
    /// Directories that did not exist before (absolute paths)
    pub dirs: Vec<PathBuf>,
    pub bytes: u64,
}

/// Compression used when creating an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Zstd,
}

impl Compression {
    /// zstd level used for payloads
    pub const ZSTD_LEVEL: i32 = 9;
}

/// List the entries of an archive
///
/// # Errors
///
/// `CouldNotOpen`, `Corrupt`, `PropertyRetrievalFailed` or `PathTraversal`.
pub async fn list_entries(archive: &Path) -> Result<Vec<ArchiveEntry>> {
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || list_entries_sync(&archive))
        .await
        .map_err(|e| Error::internal(format!("list task failed: {e}")))?
}

/// Extract an archive below `dest`
///
/// # Errors
///
/// Any archive error, or `Io` with the path that could not be written.
pub async fn extract(archive: &Path, dest: &Path) -> Result<ExtractReport> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_sync(&archive, &dest))
        .await
        .map_err(|e| Error::internal(format!("extract task failed: {e}")))?
}

/// Pack the contents of `source_dir` into `archive`
///
/// # Errors
///
/// `Io` for unreadable sources or an unwritable destination.
pub async fn create_archive(
    source_dir: &Path,
    archive: &Path,
    compression: Compression,
) -> Result<u64> {
    let source_dir = source_dir.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || create_archive_sync(&source_dir, &archive, compression))
        .await
        .map_err(|e| Error::internal(format!("create task failed: {e}")))?
}

/// Checksum of the archive file as published in repository metadata
///
/// # Errors
///
/// `Io` if the file cannot be read.
pub async fn checksum(archive: &Path, algorithm: HashAlgorithm) -> Result<Hash> {
    Hash::hash_file(algorithm, archive).await
}
