//! Archive creation

use crate::Compression;
use ifw_errors::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pack `source_dir` into `archive`, returning the archive size
///
/// # Errors
///
/// See [`crate::create_archive`].
pub fn create_archive_sync(source_dir: &Path, archive: &Path, compression: Compression) -> Result<u64> {
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
    }
    let file = File::create(archive).map_err(|e| Error::io_with_path(&e, archive))?;
    let writer = BufWriter::new(file);

    let io = |e: std::io::Error| Error::io_with_path(&e, archive);
    match compression {
        Compression::None => {
            let mut builder = tar_builder(writer);
            add_dir_to_tar(&mut builder, source_dir, Path::new(""))?;
            builder.into_inner().map_err(io)?.flush().map_err(io)?;
        }
        Compression::Zstd => {
            let encoder =
                zstd::stream::write::Encoder::new(writer, Compression::ZSTD_LEVEL).map_err(io)?;
            let mut builder = tar_builder(encoder);
            add_dir_to_tar(&mut builder, source_dir, Path::new(""))?;
            builder
                .into_inner()
                .and_then(zstd::stream::write::Encoder::finish)
                .map_err(io)?
                .flush()
                .map_err(io)?;
        }
    }

    let size = std::fs::metadata(archive).map_err(io)?.len();
    tracing::debug!(archive = %archive.display(), size, "archive created");
    Ok(size)
}

fn tar_builder<W: Write>(writer: W) -> tar::Builder<W> {
    let mut builder = tar::Builder::new(writer);
    // Set options for deterministic output
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);
    builder
}

/// Recursively add directory contents to tar, in name order
fn add_dir_to_tar<W: Write>(builder: &mut tar::Builder<W>, src: &Path, prefix: &Path) -> Result<()> {
    let mut entries = std::fs::read_dir(src)
        .and_then(Iterator::collect::<std::io::Result<Vec<_>>>)
        .map_err(|e| Error::io_with_path(&e, src))?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let tar_path = prefix.join(entry.file_name());
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| Error::io_with_path(&e, &path))?;
        let io = |e: std::io::Error| Error::io_with_path(&e, &path);

        if metadata.file_type().is_symlink() {
            let target = std::fs::read_link(&path).map_err(io)?;
            let mut header = tar::Header::new_gnu();
            header.set_metadata(&metadata);
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            builder
                .append_link(&mut header, &tar_path, &target)
                .map_err(io)?;
        } else if metadata.is_dir() {
            builder.append_dir(&tar_path, &path).map_err(io)?;
            add_dir_to_tar(builder, &path, &tar_path)?;
        } else if metadata.is_file() {
            let mut file = File::open(&path).map_err(io)?;
            builder.append_file(&tar_path, &mut file).map_err(io)?;
        }
    }

    Ok(())
}
