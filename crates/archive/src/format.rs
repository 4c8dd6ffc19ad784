//! Format detection from magic bytes

use ifw_errors::{ArchiveError, Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Zstandard frame magic number
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

const TAR_MAGIC_OFFSET: usize = 257;

/// Supported payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarZstd,
}

impl ArchiveFormat {
    /// Detect from the first bytes of a file
    #[must_use]
    pub fn from_header(header: &[u8]) -> Option<Self> {
        if header.starts_with(&ZSTD_MAGIC) {
            return Some(Self::TarZstd);
        }
        // ustar and GNU tar both carry "ustar" at offset 257
        if header.len() >= TAR_MAGIC_OFFSET + 5
            && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar"
        {
            return Some(Self::Tar);
        }
        // An empty tar is just zeroed blocks
        if header.len() >= 512 && header.iter().all(|b| *b == 0) {
            return Some(Self::Tar);
        }
        None
    }

    /// Wrap a reader with the matching decoder
    pub(crate) fn decoder<'a, R: Read + 'a>(self, reader: R) -> std::io::Result<Box<dyn Read + 'a>> {
        match self {
            Self::Tar => Ok(Box::new(reader)),
            Self::TarZstd => Ok(Box::new(zstd::stream::read::Decoder::new(reader)?)),
        }
    }
}

/// Detect the format of an archive file
///
/// # Errors
///
/// `CouldNotOpen` if the file cannot be read, `Corrupt` if the header
/// matches no known format.
pub fn detect_format_sync(path: &Path) -> Result<ArchiveFormat> {
    let file = File::open(path).map_err(|e| ArchiveError::CouldNotOpen {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut header = Vec::with_capacity(512);
    BufReader::new(file)
        .take(512)
        .read_to_end(&mut header)
        .map_err(|e| Error::io_with_path(&e, path))?;

    ArchiveFormat::from_header(&header).ok_or_else(|| {
        ArchiveError::Corrupt {
            path: path.display().to_string(),
            message: "unrecognized archive format".to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_zstd() {
        let mut header = ZSTD_MAGIC.to_vec();
        header.extend_from_slice(&[0; 16]);
        assert_eq!(ArchiveFormat::from_header(&header), Some(ArchiveFormat::TarZstd));
    }

    #[test]
    fn test_detects_tar_regardless_of_name() {
        let mut header = vec![0u8; 512];
        header[..4].copy_from_slice(b"file");
        header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5].copy_from_slice(b"ustar");
        assert_eq!(ArchiveFormat::from_header(&header), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_header(b"PK\x03\x04"), None);
    }
}
