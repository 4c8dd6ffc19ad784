//! Little-endian primitives

use ifw_errors::{Error, FormatError, Result};
use std::io::{Read, Write};

/// Strings longer than this are treated as corruption
const MAX_STRING_LEN: i64 = 64 * 1024 * 1024;

fn truncated(section: &str, message: impl Into<String>) -> Error {
    FormatError::Truncated {
        section: section.to_string(),
        message: message.into(),
    }
    .into()
}

pub(crate) fn read_i64<R: Read>(reader: &mut R, section: &str) -> Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => truncated(section, "unexpected end of data"),
        _ => Error::from(e),
    })?;
    Ok(i64::from_le_bytes(buf))
}

/// Read a non-negative count or length
pub(crate) fn read_len<R: Read>(reader: &mut R, section: &str, limit: i64) -> Result<usize> {
    let value = read_i64(reader, section)?;
    if !(0..=limit).contains(&value) {
        return Err(truncated(section, format!("invalid length {value}")));
    }
    usize::try_from(value).map_err(|_| truncated(section, format!("invalid length {value}")))
}

pub(crate) fn read_bytes<R: Read>(reader: &mut R, section: &str) -> Result<Vec<u8>> {
    let len = read_len(reader, section, MAX_STRING_LEN)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => truncated(section, "unexpected end of data"),
        _ => Error::from(e),
    })?;
    Ok(buf)
}

pub(crate) fn read_string<R: Read>(reader: &mut R, section: &str) -> Result<String> {
    String::from_utf8(read_bytes(reader, section)?)
        .map_err(|_| truncated(section, "string is not valid UTF-8"))
}

pub(crate) fn write_i64<W: Write>(writer: &mut W, value: i64) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    write_i64(writer, to_i64(bytes.len()))?;
    writer.write_all(bytes)
}

pub(crate) fn write_string<W: Write>(writer: &mut W, value: &str) -> std::io::Result<()> {
    write_bytes(writer, value.as_bytes())
}

/// Sizes in this format never approach `i64::MAX`
pub(crate) fn to_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_string_encoding() {
        let mut buf = Vec::new();
        write_string(&mut buf, "meta.xml").unwrap();
        assert_eq!(&buf[..8], &8i64.to_le_bytes());
        assert_eq!(read_string(&mut Cursor::new(buf), "test").unwrap(), "meta.xml");
    }

    #[test]
    fn test_truncated_and_negative() {
        let err = read_i64(&mut Cursor::new(vec![1, 2, 3]), "metadata index").unwrap_err();
        assert!(err.to_string().contains("truncated metadata index"));

        let buf = (-1i64).to_le_bytes().to_vec();
        assert!(read_string(&mut Cursor::new(buf), "operation list").is_err());
    }
}
