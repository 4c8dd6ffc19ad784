//! Listing and extraction

use crate::format::detect_format_sync;
use crate::{ArchiveEntry, EntryKind, ExtractReport};
use ifw_errors::{ArchiveError, Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

fn open_archive(archive: &Path) -> Result<tar::Archive<Box<dyn Read>>> {
    let format = detect_format_sync(archive)?;
    let file = File::open(archive).map_err(|e| ArchiveError::CouldNotOpen {
        path: archive.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = format
        .decoder(BufReader::new(file))
        .map_err(|e| corrupt(archive, &e))?;
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_preserve_mtime(true);
    tar.set_unpack_xattrs(false);
    Ok(tar)
}

fn corrupt(archive: &Path, err: &std::io::Error) -> Error {
    ArchiveError::Corrupt {
        path: archive.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

fn property_failed(archive: &Path, index: usize) -> Error {
    ArchiveError::PropertyRetrievalFailed {
        archive: archive.display().to_string(),
        index,
    }
    .into()
}

fn kind_of(entry_type: tar::EntryType) -> EntryKind {
    if entry_type.is_file() || entry_type.is_gnu_sparse() {
        EntryKind::File
    } else if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_symlink() {
        EntryKind::Symlink
    } else if entry_type.is_hard_link() {
        EntryKind::HardLink
    } else {
        EntryKind::Other
    }
}

/// Normalise an entry path to a relative path inside the destination
///
/// # Errors
///
/// `PathTraversal` for absolute paths and any `..` component.
pub(crate) fn normalize_entry_path(raw: &Path, dest: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::PathTraversal {
                    entry: raw.display().to_string(),
                    destination: dest.display().to_string(),
                }
                .into());
            }
        }
    }
    Ok(out)
}

/// Refuse to write through a symlink that an earlier entry (or the user)
/// placed between `dest` and the entry
fn ensure_no_symlink_ancestor(dest: &Path, rel: &Path) -> Result<()> {
    let mut current = dest.to_path_buf();
    let mut components = rel.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        if std::fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink()) {
            return Err(ArchiveError::PathTraversal {
                entry: rel.display().to_string(),
                destination: dest.display().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Create `path` and any missing parents, recording each new directory
fn create_dir_tracked(path: &Path, created: &mut Vec<PathBuf>) -> Result<()> {
    let mut missing = Vec::new();
    let mut cursor = Some(path);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        missing.push(dir.to_path_buf());
        cursor = dir.parent();
    }
    for dir in missing.into_iter().rev() {
        match std::fs::create_dir(&dir) {
            Ok(()) => created.push(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ArchiveError::CouldNotCreateFolder {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn create_parent_tracked(target: &Path, created: &mut Vec<PathBuf>) -> Result<()> {
    match target.parent() {
        Some(parent) => create_dir_tracked(parent, created),
        None => Ok(()),
    }
}

#[cfg(unix)]
fn make_symlink(link_target: &Path, at: &Path) -> Result<()> {
    std::os::unix::fs::symlink(link_target, at).map_err(|e| Error::io_with_path(&e, at))
}

#[cfg(not(unix))]
fn make_symlink(_link_target: &Path, at: &Path) -> Result<()> {
    Err(ArchiveError::UnsupportedEntry {
        entry: at.display().to_string(),
    }
    .into())
}

/// List entries without extracting
///
/// # Errors
///
/// See [`crate::list_entries`].
pub fn list_entries_sync(archive: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut tar = open_archive(archive)?;
    let mut out = Vec::new();
    let entries = tar.entries().map_err(|e| corrupt(archive, &e))?;
    for (index, entry) in entries.enumerate() {
        let entry = entry.map_err(|e| corrupt(archive, &e))?;
        let header = entry.header();
        if header.entry_type().is_pax_global_extensions() {
            continue;
        }
        let raw = entry
            .path()
            .map_err(|_| property_failed(archive, index))?
            .into_owned();
        let path = normalize_entry_path(&raw, Path::new("."))?;
        if path.as_os_str().is_empty() {
            continue;
        }
        let link_target = entry
            .link_name()
            .map_err(|_| property_failed(archive, index))?
            .map(std::borrow::Cow::into_owned);
        out.push(ArchiveEntry {
            path,
            kind: kind_of(header.entry_type()),
            size: header.size().map_err(|_| property_failed(archive, index))?,
            mode: header.mode().ok(),
            link_target,
        });
    }
    Ok(out)
}

/// Extract everything below `dest`
///
/// # Errors
///
/// See [`crate::extract`].
pub fn extract_sync(archive: &Path, dest: &Path) -> Result<ExtractReport> {
    let mut tar = open_archive(archive)?;
    let mut report = ExtractReport::default();
    create_dir_tracked(dest, &mut report.dirs)?;

    let entries = tar.entries().map_err(|e| corrupt(archive, &e))?;
    for (index, entry) in entries.enumerate() {
        let mut entry = entry.map_err(|e| corrupt(archive, &e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() {
            continue;
        }
        let raw = entry
            .path()
            .map_err(|_| property_failed(archive, index))?
            .into_owned();
        let rel = normalize_entry_path(&raw, dest)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        ensure_no_symlink_ancestor(dest, &rel)?;
        let target = dest.join(&rel);

        match kind_of(entry_type) {
            EntryKind::Directory => create_dir_tracked(&target, &mut report.dirs)?,
            EntryKind::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|_| property_failed(archive, index))?
                    .ok_or_else(|| property_failed(archive, index))?
                    .into_owned();
                if std::fs::symlink_metadata(&target).is_ok() {
                    return Err(ArchiveError::SymlinkAlreadyExists {
                        path: target.display().to_string(),
                    }
                    .into());
                }
                create_parent_tracked(&target, &mut report.dirs)?;
                make_symlink(&link, &target)?;
                report.files.push(target);
            }
            EntryKind::HardLink => {
                let link = entry
                    .link_name()
                    .map_err(|_| property_failed(archive, index))?
                    .ok_or_else(|| property_failed(archive, index))?
                    .into_owned();
                let source = dest.join(normalize_entry_path(&link, dest)?);
                create_parent_tracked(&target, &mut report.dirs)?;
                if target.symlink_metadata().is_ok() {
                    std::fs::remove_file(&target).map_err(|e| Error::io_with_path(&e, &target))?;
                }
                std::fs::hard_link(&source, &target)
                    .map_err(|e| Error::io_with_path(&e, &target))?;
                report.files.push(target);
            }
            EntryKind::File => {
                create_parent_tracked(&target, &mut report.dirs)?;
                if std::fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink()) {
                    std::fs::remove_file(&target).map_err(|e| Error::io_with_path(&e, &target))?;
                }
                let size = entry.header().size().unwrap_or(0);
                entry.unpack(&target).map_err(|e| match e.kind() {
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                        corrupt(archive, &e)
                    }
                    _ => Error::io_with_path(&e, &target),
                })?;
                report.bytes += size;
                report.files.push(target);
            }
            EntryKind::Other => {
                return Err(ArchiveError::UnsupportedEntry {
                    entry: raw.display().to_string(),
                }
                .into());
            }
        }
    }

    tracing::debug!(
        archive = %archive.display(),
        files = report.files.len(),
        dirs = report.dirs.len(),
        "archive extracted"
    );
    Ok(report)
}
