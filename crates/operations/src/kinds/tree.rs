//! Multi-file operations: ExtractArchive and CopyDirectory
//!
//! Both record every file and directory they create so undo removes
//! exactly those, then puts displaced files back.

use super::undo_file_set;
use crate::backup::backup_move;
use crate::context::RunContext;
use crate::operation::{BackupEntry, UndoState};
use ifw_archive::EntryKind;
use ifw_errors::{ArchiveError, Error, OperationError};
use ifw_platform::filesystem;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Directories on the way to `paths` that do not exist yet, outermost first
async fn missing_dirs(root: &Path, paths: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut candidates = BTreeSet::new();
    for path in paths {
        let mut cursor = Some(path.as_path());
        while let Some(dir) = cursor {
            if !dir.starts_with(root) || !candidates.insert(dir.to_path_buf()) {
                break;
            }
            cursor = dir.parent();
        }
    }

    let mut missing = Vec::new();
    for dir in candidates {
        if !filesystem::occupied(&dir).await {
            missing.push(dir);
        }
    }
    // BTreeSet order puts parents before children
    missing
}

async fn displace(
    ctx: &RunContext,
    path: &Path,
    backups: &mut Vec<BackupEntry>,
) -> Result<(), Error> {
    if fs::symlink_metadata(path).await.is_ok_and(|m| m.is_dir()) {
        return Ok(());
    }
    if let Some(backup) = backup_move(ctx, path).await? {
        backups.push(BackupEntry {
            original: path.to_path_buf(),
            backup,
        });
    }
    Ok(())
}

/// `ExtractArchive(archive, targetDir)`
pub(super) async fn extract_archive(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let archive = ctx.resolve(&args[0]);
    let target = ctx.resolve(&args[1]);

    let entries = ifw_archive::list_entries(&archive).await?;
    let paths: Vec<PathBuf> = entries.iter().map(|e| target.join(&e.path)).collect();
    let dirs = missing_dirs(&target, paths.iter().cloned()).await;

    // A symlink entry may not land on an occupied path
    for (entry, path) in entries.iter().zip(&paths) {
        if entry.kind == EntryKind::Symlink && filesystem::occupied(path).await {
            return Err(ArchiveError::SymlinkAlreadyExists {
                path: path.display().to_string(),
            }
            .into());
        }
    }

    let mut backups = Vec::new();
    for (entry, path) in entries.iter().zip(&paths) {
        if !matches!(entry.kind, EntryKind::Directory | EntryKind::Symlink) {
            if let Err(e) = displace(ctx, path, &mut backups).await {
                undo_file_set(&[], &[], &backups).await?;
                return Err(e);
            }
        }
    }

    match ifw_archive::extract(&archive, &target).await {
        Ok(report) => {
            tracing::debug!(
                archive = %archive.display(),
                files = report.files.len(),
                bytes = report.bytes,
                "archive extracted"
            );
            Ok(UndoState::FileSet {
                files: report.files,
                dirs: report.dirs,
                backups,
            })
        }
        Err(e) => {
            let written: Vec<PathBuf> = entries
                .iter()
                .zip(&paths)
                .filter(|(entry, _)| entry.kind != EntryKind::Directory)
                .map(|(_, path)| path.clone())
                .collect();
            undo_file_set(&written, &dirs, &backups).await?;
            Err(e)
        }
    }
}

enum Item {
    Dir(PathBuf),
    File(PathBuf),
    Link(PathBuf),
}

/// Relative paths below `source`, parents before children
async fn walk(source: &Path) -> Result<Vec<Item>, Error> {
    let root = source.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut items = Vec::new();
        for entry in walkdir::WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                Error::from(OperationError::failed("CopyDirectory", e.to_string()))
            })?;
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| Error::internal(e.to_string()))?
                .to_path_buf();
            let kind = entry.file_type();
            items.push(if kind.is_symlink() {
                Item::Link(relative)
            } else if kind.is_dir() {
                Item::Dir(relative)
            } else {
                Item::File(relative)
            });
        }
        Ok(items)
    })
    .await
    .map_err(|e| Error::internal(format!("walk task failed: {e}")))?
}

/// `CopyDirectory(source, target, [forceOverwrite])` copies the contents of
/// `source` into `target`
pub(super) async fn copy_directory(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let source = ctx.resolve(&args[0]);
    let target = ctx.resolve(&args[1]);
    let force = match args.get(2).map(String::as_str) {
        None => false,
        Some("forceOverwrite") => true,
        Some(other) => {
            return Err(OperationError::failed(
                "CopyDirectory",
                format!("unknown option '{other}', expected forceOverwrite"),
            )
            .into())
        }
    };
    if !fs::metadata(&source).await.is_ok_and(|m| m.is_dir()) {
        return Err(OperationError::failed(
            "CopyDirectory",
            format!("'{}' is not a directory", source.display()),
        )
        .into());
    }

    let items = walk(&source).await?;
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut backups = Vec::new();
    if !filesystem::occupied(&target).await {
        dirs.push(target.clone());
    }

    let result = async {
        fs::create_dir_all(&target)
            .await
            .map_err(|e| Error::io_with_path(&e, &target))?;
        for item in &items {
            match item {
                Item::Dir(rel) => {
                    let dest = target.join(rel);
                    if !filesystem::occupied(&dest).await {
                        fs::create_dir(&dest)
                            .await
                            .map_err(|e| Error::io_with_path(&e, &dest))?;
                        dirs.push(dest);
                    }
                }
                Item::File(rel) | Item::Link(rel) => {
                    let dest = target.join(rel);
                    if filesystem::occupied(&dest).await {
                        if !force {
                            return Err(OperationError::failed(
                                "CopyDirectory",
                                format!("'{}' already exists", dest.display()),
                            )
                            .into());
                        }
                        displace(ctx, &dest, &mut backups).await?;
                    }
                    let from = source.join(rel);
                    if matches!(item, Item::Link(_)) {
                        let link_target = fs::read_link(&from)
                            .await
                            .map_err(|e| Error::io_with_path(&e, &from))?;
                        filesystem::symlink(&link_target, &dest).await?;
                    } else {
                        filesystem::copy_file(&from, &dest).await?;
                    }
                    files.push(dest);
                }
            }
        }
        Ok::<(), Error>(())
    }
    .await;

    if let Err(e) = result {
        undo_file_set(&files, &dirs, &backups).await?;
        return Err(e);
    }
    Ok(UndoState::FileSet {
        files,
        dirs,
        backups,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_occupied_link_path_fails_without_displacing() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("payload");
        std::fs::create_dir_all(payload.join("1.0")).unwrap();
        std::fs::write(payload.join("README"), "new").unwrap();
        std::os::unix::fs::symlink("1.0", payload.join("current")).unwrap();
        let archive = dir.path().join("core.tar.zst");
        ifw_archive::create_archive(&payload, &archive, ifw_archive::Compression::Zstd)
            .await
            .unwrap();

        let target = dir.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("README"), "old").unwrap();
        std::os::unix::fs::symlink("/opt/elsewhere", target.join("current")).unwrap();
        let ctx = RunContext::new(&target, dir.path().join("backup"));

        let args = vec![archive.display().to_string(), target.display().to_string()];
        let err = extract_archive(&args, &ctx).await.unwrap_err();
        assert!(
            matches!(err, Error::Archive(ArchiveError::SymlinkAlreadyExists { .. })),
            "{err:?}"
        );
        assert_eq!(
            std::fs::read_link(target.join("current")).unwrap(),
            PathBuf::from("/opt/elsewhere")
        );
        assert_eq!(std::fs::read_to_string(target.join("README")).unwrap(), "old");
        assert!(!dir.path().join("backup").exists());
        assert!(!target.join("1.0").exists());
    }
}
