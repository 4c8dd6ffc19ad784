//! In-place text edits: AppendFile, PrependFile, Replace and LineReplace
//!
//! Each edit snapshots the file first; undo puts the snapshot back, which
//! also restores the original permissions.

use super::{create_parent_dirs, remove_created_dirs};
use crate::backup::{backup_copy, restore_or_remove};
use crate::context::RunContext;
use crate::operation::UndoState;
use ifw_errors::{Error, OperationError};
use ifw_platform::filesystem;
use std::path::Path;
use tokio::fs;

async fn read_text(operation: &str, path: &Path) -> Result<String, Error> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    String::from_utf8(bytes).map_err(|_| {
        OperationError::failed(operation, format!("'{}' is not UTF-8 text", path.display())).into()
    })
}

/// Write `contents` without replacing the inode, so mode bits survive
async fn write_text(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}

async fn edit<F>(
    operation: &str,
    path: &Path,
    ctx: &RunContext,
    create: bool,
    change: F,
) -> Result<UndoState, Error>
where
    F: FnOnce(String) -> Result<String, Error>,
{
    let exists = filesystem::occupied(path).await;
    if !exists && !create {
        return Err(OperationError::failed(
            operation,
            format!("'{}' does not exist", path.display()),
        )
        .into());
    }
    let current = if exists {
        read_text(operation, path).await?
    } else {
        String::new()
    };

    let updated = change(current)?;
    let backup = backup_copy(ctx, path).await?;
    let created_dirs = if exists {
        Vec::new()
    } else {
        create_parent_dirs(path).await?
    };
    if let Err(e) = write_text(path, &updated).await {
        if let Err(undo) = restore_or_remove(backup.as_deref(), path).await {
            tracing::warn!(path = %path.display(), error = %undo, "could not put file back");
        }
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(UndoState::RestoreFile {
        path: path.to_path_buf(),
        backup,
        created_dirs,
    })
}

pub(super) async fn append(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    let text = args[1].clone();
    edit("AppendFile", &path, ctx, true, |current| Ok(current + &text)).await
}

pub(super) async fn prepend(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    let text = args[1].clone();
    edit("PrependFile", &path, ctx, true, |current| Ok(text + &current)).await
}

pub(super) async fn replace(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    let (search, replacement) = (&args[1], &args[2]);
    if search.is_empty() {
        return Err(OperationError::failed("Replace", "search text is empty").into());
    }
    edit("Replace", &path, ctx, false, |current| {
        Ok(current.replace(search.as_str(), replacement))
    })
    .await
}

/// Replace every line starting with `args[1]` by `args[2]`
pub(super) async fn line_replace(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let path = ctx.resolve(&args[0]);
    let (prefix, replacement) = (&args[1], &args[2]);
    if prefix.is_empty() {
        return Err(OperationError::failed("LineReplace", "line prefix is empty").into());
    }
    edit("LineReplace", &path, ctx, false, |current| {
        Ok(replace_lines(&current, prefix, replacement))
    })
    .await
}

fn replace_lines(text: &str, prefix: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        if body.trim_start().starts_with(prefix) {
            out.push_str(replacement);
        } else {
            out.push_str(body);
        }
        out.push_str(ending);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_replace_lines_keeps_endings() {
        let text = "a=1\n  b=2\nc=3";
        assert_eq!(replace_lines(text, "b=", "b=9"), "a=1\nb=9\nc=3");
        assert_eq!(replace_lines(text, "c=", "c=0"), "a=1\n  b=2\nc=0");
        assert_eq!(replace_lines(text, "x", "y"), text);
    }

    #[tokio::test]
    async fn test_failed_write_removes_created_parents() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path(), dir.path().join("backup"));
        // A trailing slash makes the create fail once the parents exist
        let path = PathBuf::from(format!("{}/new/notes/", dir.path().display()));

        let err = edit("AppendFile", &path, &ctx, true, |current| Ok(current + "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
        assert!(!dir.path().join("new").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_write_keeps_original() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path(), dir.path().join("backup"));
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "original").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();
        if std::fs::OpenOptions::new().write(true).open(&path).is_ok() {
            // Privileged users write through read-only modes
            return;
        }

        assert!(edit("AppendFile", &path, &ctx, true, |current| Ok(current + "x"))
            .await
            .is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
        assert_eq!(
            std::fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            0o444
        );
    }
}
