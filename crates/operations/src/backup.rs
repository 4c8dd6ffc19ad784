//! Backup-then-mutate helpers
//!
//! A backup is taken only if something occupies the path. If taking it
//! fails, the caller returns before touching the original.

use crate::context::RunContext;
use ifw_errors::{Error, OperationError};
use ifw_platform::filesystem;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;

fn backup_failed(path: &Path, err: &Error) -> Error {
    OperationError::BackupFailed {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

async fn backup_target(ctx: &RunContext, path: &Path) -> Result<PathBuf, Error> {
    let dir = ctx.backup_dir();
    fs::create_dir_all(dir)
        .await
        .map_err(|e| backup_failed(path, &Error::io_with_path(&e, dir)))?;
    Ok(filesystem::backup_path(dir, path))
}

/// Metadata of whatever occupies `path`; only `NotFound` means empty
async fn occupant(path: &Path) -> Result<Option<Metadata>, Error> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(backup_failed(path, &Error::io_with_path(&e, path))),
    }
}

/// Copy whatever is at `path` into the backup directory, leaving the
/// original in place
pub(crate) async fn backup_copy(ctx: &RunContext, path: &Path) -> Result<Option<PathBuf>, Error> {
    let Some(meta) = occupant(path).await? else {
        return Ok(None);
    };
    let backup = backup_target(ctx, path).await?;
    let result = if meta.file_type().is_symlink() {
        match fs::read_link(path).await {
            Ok(target) => filesystem::symlink(&target, &backup).await,
            Err(e) => Err(Error::io_with_path(&e, path)),
        }
    } else if meta.is_dir() {
        filesystem::copy_dir_all(path, &backup).await.map(|_| ())
    } else {
        filesystem::copy_file(path, &backup).await.map(|_| ())
    };
    result.map_err(|e| backup_failed(path, &e))?;
    tracing::debug!(path = %path.display(), backup = %backup.display(), "backed up");
    Ok(Some(backup))
}

/// Move whatever is at `path` into the backup directory
pub(crate) async fn backup_move(ctx: &RunContext, path: &Path) -> Result<Option<PathBuf>, Error> {
    if occupant(path).await?.is_none() {
        return Ok(None);
    }
    let backup = backup_target(ctx, path).await?;
    filesystem::move_path(path, &backup)
        .await
        .map_err(|e| backup_failed(path, &e))?;
    tracing::debug!(path = %path.display(), backup = %backup.display(), "moved to backup");
    Ok(Some(backup))
}

/// Put a backup back in place of `original`
pub(crate) async fn restore(backup: &Path, original: &Path) -> Result<(), Error> {
    if !filesystem::occupied(backup).await {
        return Err(OperationError::BackupNotFound {
            path: original.display().to_string(),
            backup: backup.display().to_string(),
        }
        .into());
    }
    filesystem::remove_path(original).await?;
    filesystem::move_path(backup, original).await
}

/// Restore `backup` if there is one, otherwise remove what was created
pub(crate) async fn restore_or_remove(backup: Option<&Path>, path: &Path) -> Result<(), Error> {
    match backup {
        Some(backup) => restore(backup, path).await,
        None => filesystem::remove_path(path).await,
    }
}

/// Delete a backup after commit; a missing one is fine
pub(crate) async fn discard(backup: &Path) -> Result<(), Error> {
    filesystem::remove_path(backup).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backup_copy_of_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path(), dir.path().join("backup"));
        let missing = dir.path().join("missing.txt");
        assert_eq!(backup_copy(&ctx, &missing).await.unwrap(), None);
        assert_eq!(backup_move(&ctx, &missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path(), dir.path().join("backup"));
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        // A regular file used as a directory fails with ENOTDIR, not ENOENT
        let below = file.join("child");

        let err = backup_copy(&ctx, &below).await.unwrap_err();
        assert!(
            matches!(err, Error::Operation(OperationError::BackupFailed { .. })),
            "{err}"
        );
        assert!(backup_move(&ctx, &below).await.is_err());
    }

    #[tokio::test]
    async fn test_backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path(), dir.path().join("backup"));
        let file = dir.path().join("app.ini");
        std::fs::write(&file, "a=1").unwrap();

        let backup = backup_copy(&ctx, &file).await.unwrap().unwrap();
        std::fs::write(&file, "a=2").unwrap();
        restore(&backup, &file).await.unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "a=1");
        assert!(!backup.exists());
    }
}
