//! Writing a trailer behind a stub executable

use crate::content::BinaryContent;
use crate::io::{to_i64, write_bytes, write_i64, write_string};
use crate::layout::{OperationRecord, Range};
use crate::magic::{Marker, MAGIC_COOKIE, MAGIC_COOKIE_DATA};
use ifw_errors::{Error, Result};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Blob {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Write adapter that tracks the number of bytes written
struct Counting<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Builds a new installer or maintenance tool
///
/// The stub is only ever read. Output goes to a temporary file in the
/// destination directory which is renamed over `output` once complete.
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    stub: Option<PathBuf>,
    stub_len: Option<u64>,
    marker: Marker,
    cookie: u64,
    metadata: Vec<(String, Blob)>,
    components: Vec<(String, Vec<(String, Blob)>)>,
    operations: Vec<OperationRecord>,
    resource: Option<Blob>,
}

impl ContainerWriter {
    /// Start from a stub executable
    pub fn new(stub: impl Into<PathBuf>, marker: Marker) -> Self {
        Self {
            stub: Some(stub.into()),
            stub_len: None,
            marker,
            cookie: MAGIC_COOKIE,
            metadata: Vec::new(),
            components: Vec::new(),
            operations: Vec::new(),
            resource: None,
        }
    }

    /// A standalone data file without executable stub
    #[must_use]
    pub fn data_file(marker: Marker) -> Self {
        Self {
            stub: None,
            cookie: MAGIC_COOKIE_DATA,
            ..Self::new(PathBuf::new(), marker)
        }
    }

    /// Reuse an existing container: its stub (without trailer), metadata
    /// and archives are carried over; operations are left for the caller
    ///
    /// # Errors
    ///
    /// Propagates read failures of the embedded blobs.
    pub fn from_existing(content: &mut BinaryContent, marker: Marker) -> Result<Self> {
        let mut writer = Self::new(content.path().to_path_buf(), marker);
        writer.stub_len = Some(content.stub_len());

        let layout = content.layout().clone();
        for (name, range) in &layout.metadata {
            let bytes = content.read_segment(*range)?;
            writer.metadata.push((name.clone(), Blob::Bytes(bytes)));
        }
        for component in &layout.components {
            let mut archives = Vec::new();
            for archive in &component.archives {
                archives.push((
                    archive.name.clone(),
                    Blob::Bytes(content.read_segment(archive.range)?),
                ));
            }
            writer.components.push((component.name.clone(), archives));
        }
        if let Some(bytes) = content.resource_archive()? {
            writer.resource = Some(Blob::Bytes(bytes));
        }
        Ok(writer)
    }

    /// Copy only the first `len` bytes of the stub
    #[must_use]
    pub fn stub_len(mut self, len: u64) -> Self {
        self.stub_len = Some(len);
        self
    }

    #[must_use]
    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn add_metadata(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.metadata.push((name.into(), Blob::Bytes(data)));
        self
    }

    fn component_mut(&mut self, component: String) -> &mut Vec<(String, Blob)> {
        let index = match self.components.iter().position(|(n, _)| *n == component) {
            Some(index) => index,
            None => {
                self.components.push((component, Vec::new()));
                self.components.len() - 1
            }
        };
        &mut self.components[index].1
    }

    pub fn add_archive(
        &mut self,
        component: impl Into<String>,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> &mut Self {
        self.component_mut(component.into())
            .push((name.into(), Blob::Bytes(data)));
        self
    }

    pub fn add_archive_file(
        &mut self,
        component: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> &mut Self {
        self.component_mut(component.into())
            .push((name.into(), Blob::File(path.into())));
        self
    }

    /// Drop a component and its archives from the index
    pub fn remove_component(&mut self, component: &str) -> &mut Self {
        self.components.retain(|(n, _)| n != component);
        self
    }

    pub fn add_operation(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.operations.push(OperationRecord {
            name: name.into(),
            data,
        });
        self
    }

    pub fn set_operations(&mut self, operations: Vec<OperationRecord>) -> &mut Self {
        self.operations = operations;
        self
    }

    pub fn set_resource_archive(&mut self, data: Vec<u8>) -> &mut Self {
        self.resource = Some(Blob::Bytes(data));
        self
    }

    /// Write the container to `output`, returning the total size
    ///
    /// # Errors
    ///
    /// `Io` with the offending path if the stub or a blob cannot be read or
    /// the output cannot be written.
    pub fn write(&self, output: &Path) -> Result<u64> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io_with_path(&e, dir))?;

        let out_err = |e: io::Error| Error::io_with_path(&e, output);
        let mut writer = Counting {
            inner: BufWriter::new(tmp.as_file()),
            written: 0,
        };

        if let Some(stub) = &self.stub {
            let file = File::open(stub).map_err(|e| Error::io_with_path(&e, stub))?;
            let mut reader: Box<dyn Read> = match self.stub_len {
                Some(len) => Box::new(file.take(len)),
                None => Box::new(file),
            };
            io::copy(&mut reader, &mut writer).map_err(|e| Error::io_with_path(&e, stub))?;
        }
        let data_start = writer.written;
        let rel = |w: &Counting<_>| to_i64(w.written - data_start);

        let mut metadata_index = Vec::with_capacity(self.metadata.len());
        for (name, blob) in &self.metadata {
            let offset = rel(&writer);
            let length = copy_blob(blob, &mut writer, output)?;
            metadata_index.push((name, Range::new(offset, to_i64(length))));
        }

        let mut component_index = Vec::with_capacity(self.components.len());
        for (component, archives) in &self.components {
            let mut entries = Vec::with_capacity(archives.len());
            for (name, blob) in archives {
                let offset = rel(&writer);
                let length = copy_blob(blob, &mut writer, output)?;
                entries.push((name, Range::new(offset, to_i64(length))));
            }
            component_index.push((component, entries));
        }

        let metadata_index_offset = rel(&writer);
        write_i64(&mut writer, to_i64(metadata_index.len())).map_err(out_err)?;
        for (name, range) in &metadata_index {
            write_string(&mut writer, name).map_err(out_err)?;
            write_i64(&mut writer, range.offset).map_err(out_err)?;
            write_i64(&mut writer, range.length).map_err(out_err)?;
        }

        let operation_list_offset = rel(&writer);
        write_i64(&mut writer, to_i64(self.operations.len())).map_err(out_err)?;
        for op in &self.operations {
            write_string(&mut writer, &op.name).map_err(out_err)?;
            write_bytes(&mut writer, &op.data).map_err(out_err)?;
        }

        let component_index_offset = rel(&writer);
        write_i64(&mut writer, to_i64(component_index.len())).map_err(out_err)?;
        for (component, entries) in &component_index {
            write_string(&mut writer, component).map_err(out_err)?;
            write_i64(&mut writer, to_i64(entries.len())).map_err(out_err)?;
            for (name, range) in entries {
                write_string(&mut writer, name).map_err(out_err)?;
                write_i64(&mut writer, range.offset).map_err(out_err)?;
                write_i64(&mut writer, range.length).map_err(out_err)?;
            }
        }
        write_i64(&mut writer, to_i64(component_index.len())).map_err(out_err)?;

        let resource_archive_offset = rel(&writer);
        if let Some(blob) = &self.resource {
            copy_blob(blob, &mut writer, output)?;
        }

        let data_block_size = rel(&writer) + to_i64(crate::magic::HEADER_SIZE);
        for value in [
            metadata_index_offset,
            operation_list_offset,
            component_index_offset,
            resource_archive_offset,
            data_block_size,
            self.marker.value(),
        ] {
            write_i64(&mut writer, value).map_err(out_err)?;
        }
        writer
            .write_all(&self.cookie.to_le_bytes())
            .map_err(out_err)?;
        writer.flush().map_err(out_err)?;
        let total = writer.written;
        drop(writer);

        tmp.as_file().sync_all().map_err(out_err)?;
        if let Some(stub) = &self.stub {
            let meta = std::fs::metadata(stub).map_err(|e| Error::io_with_path(&e, stub))?;
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| Error::io_with_path(&e, tmp.path()))?;
        }
        tmp.persist(output)
            .map_err(|e| Error::io_with_path(&e.error, output))?;

        tracing::debug!(
            output = %output.display(),
            marker = %self.marker,
            operations = self.operations.len(),
            bytes = total,
            "container written"
        );
        Ok(total)
    }
}

fn copy_blob<W: Write>(blob: &Blob, writer: &mut W, output: &Path) -> Result<u64> {
    match blob {
        Blob::Bytes(bytes) => {
            writer
                .write_all(bytes)
                .map_err(|e| Error::io_with_path(&e, output))?;
            Ok(bytes.len() as u64)
        }
        Blob::File(path) => {
            let mut file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
            io::copy(&mut file, writer).map_err(|e| Error::io_with_path(&e, path))
        }
    }
}
