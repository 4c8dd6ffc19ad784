//! Copy, Move, Delete, Mkdir, Rmdir and CreateLink

use super::{create_dirs, create_parent_dirs, remove_created_dirs};
use crate::backup::{backup_move, restore, restore_or_remove};
use crate::context::RunContext;
use crate::operation::UndoState;
use ifw_errors::{Error, OperationError};
use ifw_platform::filesystem;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A directory target receives the source under its own file name
async fn copy_destination(source: &Path, target: PathBuf) -> PathBuf {
    let is_dir = fs::metadata(&target).await.is_ok_and(|m| m.is_dir());
    match (is_dir, source.file_name()) {
        (true, Some(name)) => target.join(name),
        _ => target,
    }
}

pub(super) async fn copy(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let source = ctx.resolve(&args[0]);
    let target = copy_destination(&source, ctx.resolve(&args[1])).await;
    if !fs::metadata(&source).await.is_ok_and(|m| m.is_file()) {
        return Err(OperationError::failed(
            "Copy",
            format!("source file '{}' does not exist", source.display()),
        )
        .into());
    }

    let created_dirs = create_parent_dirs(&target).await?;
    let backup = match backup_move(ctx, &target).await {
        Ok(backup) => backup,
        Err(e) => {
            remove_created_dirs(&created_dirs).await;
            return Err(e);
        }
    };
    if let Err(e) = filesystem::copy_file(&source, &target).await {
        if let Some(backup) = &backup {
            let _ = restore(backup, &target).await;
        }
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(UndoState::RestoreFile {
        path: target,
        backup,
        created_dirs,
    })
}

pub(super) async fn move_file(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let source = ctx.resolve(&args[0]);
    let target = copy_destination(&source, ctx.resolve(&args[1])).await;
    if !filesystem::occupied(&source).await {
        return Err(OperationError::failed(
            "Move",
            format!("source '{}' does not exist", source.display()),
        )
        .into());
    }

    let created_dirs = create_parent_dirs(&target).await?;
    let backup = match backup_move(ctx, &target).await {
        Ok(backup) => backup,
        Err(e) => {
            remove_created_dirs(&created_dirs).await;
            return Err(e);
        }
    };
    if let Err(e) = filesystem::move_path(&source, &target).await {
        if let Some(backup) = &backup {
            let _ = restore(backup, &target).await;
        }
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(UndoState::Move {
        source,
        target,
        backup,
        created_dirs,
    })
}

pub(super) async fn undo_move(
    source: &Path,
    target: &Path,
    backup: Option<&Path>,
) -> Result<(), Error> {
    filesystem::move_path(target, source).await?;
    if let Some(backup) = backup {
        restore(backup, target).await?;
    }
    Ok(())
}

pub(super) async fn delete(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    if fs::symlink_metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        return Err(OperationError::failed(
            "Delete",
            format!("'{}' is a directory", path.display()),
        )
        .into());
    }
    // Moving the file into the backup directory is the deletion
    let backup = backup_move(ctx, &path).await?;
    Ok(UndoState::Delete { path, backup })
}

pub(super) async fn undo_delete(path: &Path, backup: Option<&Path>) -> Result<(), Error> {
    match backup {
        Some(backup) => restore(backup, path).await,
        None => Ok(()),
    }
}

pub(super) async fn mkdir(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    let created = create_dirs(&path).await?;
    Ok(UndoState::Mkdir { created })
}

pub(super) async fn rmdir(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    fs::remove_dir(&path).await.map_err(|e| {
        Error::from(OperationError::failed(
            "Rmdir",
            format!("cannot remove directory '{}': {e}", path.display()),
        ))
    })?;
    Ok(UndoState::Rmdir { path })
}

pub(super) async fn undo_rmdir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}

pub(super) async fn create_link(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let link = ctx.resolve(&args[0]);
    let target = PathBuf::from(&args[1]);
    if filesystem::occupied(&link).await {
        return Err(OperationError::failed(
            "CreateLink",
            format!("'{}' already exists", link.display()),
        )
        .into());
    }
    let created_dirs = create_parent_dirs(&link).await?;
    if let Err(e) = filesystem::symlink(&target, &link).await {
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(UndoState::Link { link, created_dirs })
}

pub(super) async fn undo_link(link: &Path) -> Result<(), Error> {
    match fs::symlink_metadata(link).await {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(link)
            .await
            .map_err(|e| Error::io_with_path(&e, link)),
        Ok(_) => {
            tracing::warn!(link = %link.display(), "not a link anymore, leaving it");
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

pub(super) async fn undo_restore_file(path: &Path, backup: Option<&Path>) -> Result<(), Error> {
    restore_or_remove(backup, path).await
}
