//! Filesystem helpers shared by operations, archive extraction and the
//! container writer

use ifw_errors::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Create the parent directory of `path` if it has one
///
/// # Errors
///
/// Returns an I/O error carrying the directory path.
pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    Ok(())
}

/// Copy a file, creating parents and keeping the source permissions
///
/// # Errors
///
/// Returns an I/O error naming whichever side failed.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    ensure_parent(dst).await?;
    let bytes = fs::copy(src, dst)
        .await
        .map_err(|e| Error::io_with_path(&e, src))?;
    let permissions = fs::metadata(src)
        .await
        .map_err(|e| Error::io_with_path(&e, src))?
        .permissions();
    fs::set_permissions(dst, permissions)
        .await
        .map_err(|e| Error::io_with_path(&e, dst))?;
    Ok(bytes)
}

/// Rename, falling back to copy-and-remove across filesystems
///
/// # Errors
///
/// Returns an I/O error if neither strategy works.
pub async fn move_path(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent(dst).await?;
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            tracing::debug!(src = %src.display(), dst = %dst.display(), "cross-device move");
            let meta = fs::symlink_metadata(src)
                .await
                .map_err(|e| Error::io_with_path(&e, src))?;
            if meta.is_dir() {
                copy_dir_all(src, dst).await?;
            } else {
                copy_file(src, dst).await?;
            }
            remove_path(src).await
        }
        Err(err) => Err(Error::io_with_path(&err, src)),
    }
}

fn is_cross_device(err: &std::io::Error) -> bool {
    // EXDEV on every unix we target
    err.kind() == std::io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}

/// Recursively copy a directory tree, returning the created files
///
/// # Errors
///
/// Returns an I/O error for the first entry that cannot be copied.
pub async fn copy_dir_all(src: &Path, dst: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    let mut stack = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = stack.pop() {
        fs::create_dir_all(&to)
            .await
            .map_err(|e| Error::io_with_path(&e, &to))?;
        let mut entries = fs::read_dir(&from)
            .await
            .map_err(|e| Error::io_with_path(&e, &from))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(&e, &from))?
        {
            let target = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io_with_path(&e, entry.path()))?;
            if file_type.is_dir() {
                stack.push((entry.path(), target));
            } else if file_type.is_symlink() {
                let link = fs::read_link(entry.path())
                    .await
                    .map_err(|e| Error::io_with_path(&e, entry.path()))?;
                symlink(&link, &target).await?;
                created.push(target);
            } else {
                copy_file(&entry.path(), &target).await?;
                created.push(target);
            }
        }
    }
    Ok(created)
}

/// Remove a file, symlink or directory tree; a missing path is fine
///
/// # Errors
///
/// Returns an I/O error for anything but `NotFound`.
pub async fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io_with_path(&e, path)),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    result.map_err(|e| Error::io_with_path(&e, path))
}

/// Whether something (including a dangling symlink) occupies `path`
pub async fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

/// Write `contents` to a temporary file next to `path` and rename it into
/// place
///
/// The new file keeps the mode of the file it replaces, or gets
/// [`NEW_FILE_MODE`] when there was none.
///
/// # Errors
///
/// Returns an I/O error if the temp file cannot be written or persisted.
pub async fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || atomic_write_sync(&path, &contents))
        .await
        .map_err(|e| Error::internal(format!("write task failed: {e}")))?
}

/// Mode given to files that [`atomic_write`] creates
#[cfg(unix)]
pub const NEW_FILE_MODE: u32 = 0o644;

/// Blocking variant of [`atomic_write`]
///
/// # Errors
///
/// Returns an I/O error if the temp file cannot be written or persisted.
pub fn atomic_write_sync(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io_with_path(&e, dir))?;
    // The temp file starts out 0600
    let mode = match std::fs::metadata(path) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions()),
        #[cfg(unix)]
        Err(_) => {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(NEW_FILE_MODE))
        }
        #[cfg(not(unix))]
        Err(_) => Ok(()),
    };
    mode.map_err(|e| Error::io_with_path(&e, tmp.path()))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::io_with_path(&e, tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| Error::io_with_path(&e.error, path))?;
    Ok(())
}

/// Create a symbolic link at `link` pointing to `target`
///
/// # Errors
///
/// Returns an I/O error, or `Internal` on platforms without symlinks.
pub async fn symlink(target: &Path, link: &Path) -> Result<()> {
    ensure_parent(link).await?;
    #[cfg(unix)]
    {
        fs::symlink(target, link)
            .await
            .map_err(|e| Error::io_with_path(&e, link))
    }
    #[cfg(not(unix))]
    {
        let _ = target;
        Err(Error::internal(format!(
            "symbolic links are not supported here: {}",
            link.display()
        )))
    }
}

/// Unique sibling path for a backup of `path` inside `backup_dir`
#[must_use]
pub fn backup_path(backup_dir: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());
    let mut candidate = backup_dir.join(format!("{name}.bak"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = backup_dir.join(format!("{name}.{counter}.bak"));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("state.xml");
        atomic_write(&path, b"one").await.unwrap();
        atomic_write(&path, b"two").await.unwrap();
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_copy_dir_and_remove() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).await.unwrap();
        fs::write(src.join("a.txt"), "a").await.unwrap();
        fs::write(src.join("nested").join("b.txt"), "b").await.unwrap();

        let dst = dir.path().join("dst");
        let created = copy_dir_all(&src, &dst).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(
            fs::read_to_string(dst.join("nested").join("b.txt"))
                .await
                .unwrap(),
            "b"
        );

        remove_path(&dst).await.unwrap();
        assert!(!occupied(&dst).await);
        remove_path(&dst).await.unwrap();
    }

    #[tokio::test]
    async fn test_move_path() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("file");
        fs::write(&src, "payload").await.unwrap();
        let dst = dir.path().join("deeper").join("file");
        move_path(&src, &dst).await.unwrap();
        assert!(!occupied(&src).await);
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "payload");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_atomic_write_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let fresh = dir.path().join("fresh.ini");
        atomic_write(&fresh, b"a=1\n").await.unwrap();
        let mode = fs::metadata(&fresh).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, NEW_FILE_MODE);

        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").await.unwrap();
        fs::set_permissions(&script, std::fs::Permissions::from_mode(0o750))
            .await
            .unwrap();
        atomic_write(&script, b"#!/bin/sh\nexit 0\n").await.unwrap();
        let mode = fs::metadata(&script).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_backup_path_is_unique() {
        let dir = TempDir::new().unwrap();
        let first = backup_path(dir.path(), Path::new("/opt/app/readme.txt"));
        std::fs::write(&first, "x").unwrap();
        let second = backup_path(dir.path(), Path::new("/opt/app/readme.txt"));
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("readme.txt.1.bak"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("tool");
        fs::write(&src, "#!/bin/sh\n").await.unwrap();
        fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755))
            .await
            .unwrap();
        let dst = dir.path().join("copy");
        copy_file(&src, &dst).await.unwrap();
        let mode = fs::metadata(&dst).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
