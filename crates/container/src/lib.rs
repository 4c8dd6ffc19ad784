#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Binary container embedded at the end of installer executables
//!
//! ```text
//! [stub bytes]
//! [metadata blobs][component archive blobs]   <- data block start
//! [metadata index]   count, { name, offset, length }*
//! [operation list]   count, { name, data }*
//! [component index]  count, { name, archive count, { name, offset, length }* }*, count
//! [resource archive] optional blob
//! [layout header]    metadata_index_offset, operation_list_offset,
//!                    component_index_offset, resource_archive_offset,
//!                    data_block_size, magic_marker, magic_cookie
//! ```
//!
//! Integers are little-endian `i64`, strings an `i64` byte length followed by
//! UTF-8. Offsets are relative to the data block start, which is the end of
//! the trailer minus `data_block_size`.

mod content;
mod io;
mod layout;
mod magic;
mod writer;

pub use content::BinaryContent;
pub use layout::{read_layout, ArchiveIndexEntry, BinaryLayout, ComponentIndexEntry, OperationRecord, Range};
pub use magic::{Marker, HEADER_SIZE, MAGIC_COOKIE, MAGIC_COOKIE_DATA, MAX_MARKER_SCAN};
pub use writer::ContainerWriter;
