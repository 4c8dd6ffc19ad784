//! Reading blobs out of an installer file

use crate::layout::{read_layout, BinaryLayout, OperationRecord, Range};
use ifw_errors::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// An opened installer or maintenance tool together with its layout
#[derive(Debug)]
pub struct BinaryContent {
    path: PathBuf,
    reader: BufReader<File>,
    layout: BinaryLayout,
}

impl BinaryContent {
    /// Open a file and read its trailer
    ///
    /// # Errors
    ///
    /// `Io` (with the path) if the file cannot be opened, otherwise any
    /// error of [`read_layout`].
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
        let mut reader = BufReader::new(file);
        let layout = read_layout(&mut reader)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            layout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn layout(&self) -> &BinaryLayout {
        &self.layout
    }

    /// Length of the executable part preceding the data block
    #[must_use]
    pub fn stub_len(&self) -> u64 {
        self.layout.data_block_start
    }

    #[must_use]
    pub fn operations(&self) -> &[OperationRecord] {
        &self.layout.operations
    }

    /// Read one blob of the data block
    ///
    /// # Errors
    ///
    /// `SegmentOutOfBounds` for ranges outside the blob area, `Io` for read
    /// failures.
    pub fn read_segment(&mut self, range: Range) -> Result<Vec<u8>> {
        self.layout.check_range(range)?;
        let start = self.layout.data_block_start + range.offset.unsigned_abs();
        self.reader
            .seek(SeekFrom::Start(start))
            .map_err(|e| Error::io_with_path(&e, &self.path))?;
        let mut buf = vec![0u8; usize::try_from(range.length).unwrap_or(0)];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| Error::io_with_path(&e, &self.path))?;
        Ok(buf)
    }

    /// Named metadata blob, `None` if the index has no such entry
    ///
    /// # Errors
    ///
    /// See [`Self::read_segment`].
    pub fn metadata(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.layout.metadata_range(name) {
            Some(range) => self.read_segment(range).map(Some),
            None => Ok(None),
        }
    }

    /// Payload archive of a component, `None` if not embedded
    ///
    /// # Errors
    ///
    /// See [`Self::read_segment`].
    pub fn archive(&mut self, component: &str, name: &str) -> Result<Option<Vec<u8>>> {
        match self.layout.archive_range(component, name) {
            Some(range) => self.read_segment(range).map(Some),
            None => Ok(None),
        }
    }

    /// The embedded resource archive, if any
    ///
    /// # Errors
    ///
    /// See [`Self::read_segment`].
    pub fn resource_archive(&mut self) -> Result<Option<Vec<u8>>> {
        match self.layout.resource_archive {
            Some(range) => self.read_segment(range).map(Some),
            None => Ok(None),
        }
    }
}
