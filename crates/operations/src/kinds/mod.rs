//! Built-in operation implementations
//!
//! Arguments arrive validated and substituted. Every function returns the
//! undo payload for what it changed, and cleans up after itself when it
//! fails half way.

mod desktop;
mod files;
mod process;
mod settings;
mod text;
mod tree;

pub(crate) use settings::environment_needs_elevation;

use crate::backup::{backup_move, restore};
use crate::context::RunContext;
use crate::kind::OperationKind;
use crate::operation::{BackupEntry, UndoState};
use ifw_errors::Error;
use ifw_platform::filesystem;
use std::path::{Path, PathBuf};
use tokio::fs;

pub(crate) async fn execute(
    kind: &OperationKind,
    args: &[String],
    ctx: &mut RunContext,
) -> Result<UndoState, Error> {
    match kind {
        OperationKind::Copy => files::copy(args, ctx).await,
        OperationKind::Move => files::move_file(args, ctx).await,
        OperationKind::Delete => files::delete(args, ctx).await,
        OperationKind::Mkdir => files::mkdir(args, ctx).await,
        OperationKind::Rmdir => files::rmdir(args, ctx).await,
        OperationKind::CreateLink => files::create_link(args, ctx).await,
        OperationKind::AppendFile => text::append(args, ctx).await,
        OperationKind::PrependFile => text::prepend(args, ctx).await,
        OperationKind::Replace => text::replace(args, ctx).await,
        OperationKind::LineReplace => text::line_replace(args, ctx).await,
        OperationKind::CreateShortcut => desktop::create_shortcut(args, ctx).await,
        OperationKind::CreateDesktopEntry => desktop::create_desktop_entry(args, ctx).await,
        OperationKind::RegisterFileType => desktop::register_file_type(args, ctx).await,
        OperationKind::EnvironmentVariable => settings::environment_variable(args, ctx).await,
        OperationKind::GlobalSettings => settings::global_settings(args, ctx).await,
        OperationKind::ElevatedExecute => process::elevated_execute(args, ctx).await,
        OperationKind::ConsumeOutput => process::consume_output(args, ctx).await,
        OperationKind::ExtractArchive => tree::extract_archive(args, ctx).await,
        OperationKind::CopyDirectory => tree::copy_directory(args, ctx).await,
        OperationKind::Custom(name) => Err(Error::internal(format!(
            "custom operation {name} reached the built-in dispatcher"
        ))),
    }
}

pub(crate) async fn undo(state: &UndoState, ctx: &mut RunContext) -> Result<(), Error> {
    match state {
        UndoState::RestoreFile {
            path,
            backup,
            created_dirs,
        } => {
            files::undo_restore_file(path, backup.as_deref()).await?;
            remove_created_dirs(created_dirs).await;
            Ok(())
        }
        UndoState::Move {
            source,
            target,
            backup,
            created_dirs,
        } => {
            files::undo_move(source, target, backup.as_deref()).await?;
            remove_created_dirs(created_dirs).await;
            Ok(())
        }
        UndoState::Delete { path, backup } => files::undo_delete(path, backup.as_deref()).await,
        UndoState::Mkdir { created } => {
            remove_created_dirs(created).await;
            Ok(())
        }
        UndoState::Rmdir { path } => files::undo_rmdir(path).await,
        UndoState::Link { link, created_dirs } => {
            files::undo_link(link).await?;
            remove_created_dirs(created_dirs).await;
            Ok(())
        }
        UndoState::FileSet {
            files,
            dirs,
            backups,
        } => undo_file_set(files, dirs, backups).await,
        UndoState::Environment {
            name,
            previous,
            file,
            backup,
            created_dirs,
        } => {
            settings::undo_environment(
                name,
                previous.as_deref(),
                file.as_deref(),
                backup.as_deref(),
                ctx,
            )
            .await?;
            remove_created_dirs(created_dirs).await;
            Ok(())
        }
        UndoState::Setting {
            file,
            key,
            value,
            previous,
            backup,
            created_dirs,
        } => {
            settings::undo_setting(file, key, value, previous.as_deref(), backup.as_deref()).await?;
            remove_created_dirs(created_dirs).await;
            Ok(())
        }
        UndoState::Execute {
            undo_command,
            working_dir,
        } => process::undo_execute(undo_command.as_deref(), working_dir.as_ref(), ctx).await,
        UndoState::ContextValue { key, previous } => {
            match previous {
                Some(value) => ctx.set_value(key.clone(), value.clone()),
                None => ctx.remove_value(key),
            };
            Ok(())
        }
        UndoState::Custom { .. } => Err(Error::internal(
            "custom undo state reached the built-in dispatcher",
        )),
    }
}

/// Create `dir` and its missing ancestors
///
/// Returns the directories that did not exist before, outermost first.
pub(super) async fn create_dirs(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut created = Vec::new();
    let mut cursor = Some(dir).filter(|d| !d.as_os_str().is_empty());
    while let Some(current) = cursor {
        if filesystem::occupied(current).await {
            break;
        }
        created.push(current.to_path_buf());
        cursor = current.parent().filter(|d| !d.as_os_str().is_empty());
    }
    created.reverse();

    fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?;
    Ok(created)
}

/// Create the missing parent directories of `path`
pub(super) async fn create_parent_dirs(path: &Path) -> Result<Vec<PathBuf>, Error> {
    match path.parent() {
        Some(parent) => create_dirs(parent).await,
        None => Ok(Vec::new()),
    }
}

/// Remove created directories innermost first; non-empty ones stay
pub(super) async fn remove_created_dirs(created: &[PathBuf]) {
    for dir in created.iter().rev() {
        if let Err(e) = fs::remove_dir(dir).await {
            tracing::debug!(dir = %dir.display(), error = %e, "leaving directory in place");
        }
    }
}

/// A whole file written over whatever was at its path
pub(super) struct Replaced {
    pub backup: Option<PathBuf>,
    pub created_dirs: Vec<PathBuf>,
}

impl Replaced {
    pub(super) fn into_undo(self, path: PathBuf) -> UndoState {
        UndoState::RestoreFile {
            path,
            backup: self.backup,
            created_dirs: self.created_dirs,
        }
    }
}

/// Write a whole file, moving any previous occupant to the backup directory
/// first
pub(super) async fn write_replacing(
    ctx: &RunContext,
    path: &Path,
    contents: &[u8],
) -> Result<Replaced, Error> {
    let created_dirs = create_parent_dirs(path).await?;
    let backup = match backup_move(ctx, path).await {
        Ok(backup) => backup,
        Err(e) => {
            remove_created_dirs(&created_dirs).await;
            return Err(e);
        }
    };
    if let Err(e) = filesystem::atomic_write(path, contents).await {
        if let Some(backup) = &backup {
            let _ = restore(backup, path).await;
        }
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(Replaced {
        backup,
        created_dirs,
    })
}

/// Remove created files and empty created directories, then restore what
/// they displaced
///
/// Keeps going after a failure and reports the first one.
pub(crate) async fn undo_file_set(
    files: &[PathBuf],
    dirs: &[PathBuf],
    backups: &[BackupEntry],
) -> Result<(), Error> {
    let mut first_error = None;
    for file in files.iter().rev() {
        if let Err(e) = filesystem::remove_path(file).await {
            first_error.get_or_insert(e);
        }
    }
    for dir in dirs.iter().rev() {
        if let Err(e) = fs::remove_dir(dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(dir = %dir.display(), error = %e, "leaving directory in place");
            }
        }
    }
    for entry in backups {
        if let Err(e) = restore(&entry.backup, &entry.original).await {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
