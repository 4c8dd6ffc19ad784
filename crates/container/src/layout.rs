//! Locating and parsing the trailer

use crate::io::{read_i64, read_len, read_bytes, read_string};
use crate::magic::{Marker, HEADER_SIZE, MAGIC_COOKIE, MAGIC_COOKIE_DATA, MAX_MARKER_SCAN};
use ifw_errors::{Error, FormatError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};

const MAX_ENTRIES: i64 = 1_000_000;

/// A blob inside the data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub offset: i64,
    pub length: i64,
}

impl Range {
    #[must_use]
    pub const fn new(offset: i64, length: i64) -> Self {
        Self { offset, length }
    }

    #[must_use]
    pub const fn end(&self) -> i64 {
        self.offset.saturating_add(self.length)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// One recorded operation: its name and serialized state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndexEntry {
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentIndexEntry {
    pub name: String,
    pub archives: Vec<ArchiveIndexEntry>,
}

/// Everything the trailer describes, with blob ranges still unread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryLayout {
    pub marker: Marker,
    pub cookie: u64,
    /// Absolute offset of the data block, which is also the stub length
    pub data_block_start: u64,
    pub data_block_size: i64,
    /// Absolute offset one past the cookie
    pub end_of_content: u64,
    pub metadata_index_offset: i64,
    pub operation_list_offset: i64,
    pub component_index_offset: i64,
    pub metadata: Vec<(String, Range)>,
    pub operations: Vec<OperationRecord>,
    pub components: Vec<ComponentIndexEntry>,
    pub resource_archive: Option<Range>,
}

impl BinaryLayout {
    /// Offset of the layout header relative to the data block
    #[must_use]
    pub fn header_offset(&self) -> i64 {
        self.data_block_size - crate::io::to_i64(HEADER_SIZE)
    }

    /// Validate a blob range against the data block bounds
    ///
    /// # Errors
    ///
    /// `SegmentOutOfBounds` if any part lies outside the blob area.
    pub fn check_range(&self, range: Range) -> Result<()> {
        check_range(range, self.header_offset(), self.data_block_size)
    }

    #[must_use]
    pub fn metadata_range(&self, name: &str) -> Option<Range> {
        self.metadata
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| *r)
    }

    #[must_use]
    pub fn archive_range(&self, component: &str, archive: &str) -> Option<Range> {
        self.components
            .iter()
            .find(|c| c.name == component)?
            .archives
            .iter()
            .find(|a| a.name == archive)
            .map(|a| a.range)
    }
}

fn check_range(range: Range, limit: i64, block_size: i64) -> Result<()> {
    if range.offset < 0 || range.length < 0 || range.end() > limit {
        return Err(FormatError::SegmentOutOfBounds {
            offset: range.offset,
            length: range.length,
            block_size,
        }
        .into());
    }
    Ok(())
}

/// Find the cookie by scanning backward from the end of the stream
///
/// Returns the absolute position just past the cookie and the cookie.
fn find_cookie<R: Read + Seek>(reader: &mut R) -> Result<(u64, u64)> {
    let size = reader
        .seek(SeekFrom::End(0))
        .map_err(|_| FormatError::LayoutSeekFailed)?;
    let window = MAX_MARKER_SCAN.min(size);
    let start = size - window;
    reader
        .seek(SeekFrom::Start(start))
        .map_err(|_| FormatError::LayoutSeekFailed)?;
    let mut buf = Vec::with_capacity(usize::try_from(window).unwrap_or(0));
    reader.by_ref().take(window).read_to_end(&mut buf)?;

    let installer = MAGIC_COOKIE.to_le_bytes();
    let data = MAGIC_COOKIE_DATA.to_le_bytes();
    for pos in (0..buf.len().saturating_sub(7)).rev() {
        let candidate = &buf[pos..pos + 8];
        if candidate == installer || candidate == data {
            let cookie = if candidate == installer {
                MAGIC_COOKIE
            } else {
                MAGIC_COOKIE_DATA
            };
            return Ok((start + pos as u64 + 8, cookie));
        }
    }
    Err(FormatError::MarkerNotFound { scanned: window }.into())
}

fn seek_to<R: Seek>(reader: &mut R, base: u64, offset: i64, limit: i64, err: FormatError) -> Result<()> {
    if offset < 0 || offset > limit {
        return Err(err.into());
    }
    let target = base + offset.unsigned_abs();
    reader.seek(SeekFrom::Start(target)).map_err(|_| Error::from(err))?;
    Ok(())
}

/// Locate and parse the trailer
///
/// # Errors
///
/// `MarkerNotFound` when no cookie lies within the scan window, a
/// `*SeekFailed` error naming the first section that cannot be reached,
/// `SegmentOutOfBounds` for any blob outside the data block and
/// `Truncated` for sections cut short.
pub fn read_layout<R: Read + Seek>(reader: &mut R) -> Result<BinaryLayout> {
    let (end_of_content, cookie) = find_cookie(reader)?;
    if end_of_content < HEADER_SIZE {
        return Err(FormatError::LayoutSeekFailed.into());
    }
    reader
        .seek(SeekFrom::Start(end_of_content - HEADER_SIZE))
        .map_err(|_| FormatError::LayoutSeekFailed)?;

    let header = "layout header";
    let metadata_index_offset = read_i64(reader, header)?;
    let operation_list_offset = read_i64(reader, header)?;
    let component_index_offset = read_i64(reader, header)?;
    let resource_archive_offset = read_i64(reader, header)?;
    let data_block_size = read_i64(reader, header)?;
    let marker = Marker::try_from(read_i64(reader, header)?)?;

    let header_size = crate::io::to_i64(HEADER_SIZE);
    let end = crate::io::to_i64(end_of_content);
    if data_block_size < header_size || data_block_size > end {
        return Err(FormatError::Truncated {
            section: header.to_string(),
            message: format!("invalid data block size {data_block_size}"),
        }
        .into());
    }
    let data_block_start = end_of_content - data_block_size.unsigned_abs();
    let header_offset = data_block_size - header_size;

    seek_to(
        reader,
        data_block_start,
        metadata_index_offset,
        header_offset,
        FormatError::MetadataIndexSeekFailed {
            offset: metadata_index_offset,
        },
    )?;
    let section = "metadata index";
    let count = read_len(reader, section, MAX_ENTRIES)?;
    let mut metadata = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_string(reader, section)?;
        let range = Range::new(read_i64(reader, section)?, read_i64(reader, section)?);
        check_range(range, header_offset, data_block_size)?;
        metadata.push((name, range));
    }

    seek_to(
        reader,
        data_block_start,
        operation_list_offset,
        header_offset,
        FormatError::OperationListSeekFailed {
            offset: operation_list_offset,
        },
    )?;
    let section = "operation list";
    let count = read_len(reader, section, MAX_ENTRIES)?;
    let mut operations = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_string(reader, section)?;
        let data = read_bytes(reader, section)?;
        operations.push(OperationRecord { name, data });
    }

    seek_to(
        reader,
        data_block_start,
        component_index_offset,
        header_offset,
        FormatError::ComponentIndexSeekFailed {
            offset: component_index_offset,
        },
    )?;
    let section = "component index";
    let count = read_len(reader, section, MAX_ENTRIES)?;
    let mut components = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_string(reader, section)?;
        let archive_count = read_len(reader, section, MAX_ENTRIES)?;
        let mut archives = Vec::with_capacity(archive_count);
        for _ in 0..archive_count {
            let archive_name = read_string(reader, section)?;
            let range = Range::new(read_i64(reader, section)?, read_i64(reader, section)?);
            check_range(range, header_offset, data_block_size)?;
            archives.push(ArchiveIndexEntry {
                name: archive_name,
                range,
            });
        }
        components.push(ComponentIndexEntry { name, archives });
    }
    let trailing = read_len(reader, section, MAX_ENTRIES)?;
    if trailing != count {
        return Err(FormatError::Truncated {
            section: section.to_string(),
            message: format!("count mismatch: {count} entries, trailer says {trailing}"),
        }
        .into());
    }

    let resource = Range::new(
        resource_archive_offset,
        header_offset - resource_archive_offset,
    );
    check_range(resource, header_offset, data_block_size)?;
    let resource_archive = (!resource.is_empty()).then_some(resource);

    tracing::debug!(
        %marker,
        metadata = metadata.len(),
        operations = operations.len(),
        components = components.len(),
        "binary layout read"
    );

    Ok(BinaryLayout {
        marker,
        cookie,
        data_block_start,
        data_block_size,
        end_of_content,
        metadata_index_offset,
        operation_list_offset,
        component_index_offset,
        metadata,
        operations,
        components,
        resource_archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_no_marker() {
        let err = read_layout(&mut Cursor::new(vec![0u8; 4096])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "format error: No marker found, stopped after 4096 bytes."
        );
    }

    #[test]
    fn test_bad_metadata_index_offset() {
        let mut data = b"stub".to_vec();
        for value in [9999i64, 0, 0, 0, 56, Marker::Installer.value()] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&MAGIC_COOKIE.to_le_bytes());
        let err = read_layout(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MetadataIndexSeekFailed { offset: 9999 })
        ));
    }
}
