//! Byte-stream collaborators.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::mapping::FileMapping;

/// Random-access byte source behind a file handle.
///
/// A parallel transport (MPI-IO or similar) implements this trait and uses
/// [`barrier`](ByteStream::barrier) to synchronise ranks before the handle
/// releases its resources.
pub trait ByteStream: fmt::Debug {
    /// Fill `buf` with the bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total size of the stream in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Map the first `len` bytes read-only, if the transport supports it.
    fn map(&self, _len: u64) -> io::Result<Option<FileMapping>> {
        Ok(None)
    }

    /// Collective synchronisation point run before the stream is closed.
    fn barrier(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Close the stream.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// A plain file opened read-only.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    path: PathBuf,
}

impl FileStream {
    /// Open `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path the stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStream for FileStream {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn map(&self, len: u64) -> io::Result<Option<FileMapping>> {
        if len == 0 {
            return Ok(None);
        }
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "file too large to map"))?;
        FileMapping::map_file(&self.file, len).map(Some)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        // Dropping the File closes the descriptor.
        Ok(())
    }
}

/// Bytes held in memory.
///
/// Mapping requests are answered with an anonymous read-only copy, so code
/// paths that depend on mapped payloads can run without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    bytes: Vec<u8>,
}

impl MemoryStream {
    /// Wrap a byte buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ByteStream for MemoryStream {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("read of {} bytes at {} past end of stream", buf.len(), offset),
                )
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn map(&self, len: u64) -> io::Result<Option<FileMapping>> {
        let len = (len as usize).min(self.bytes.len());
        if len == 0 {
            return Ok(None);
        }
        FileMapping::from_bytes(&self.bytes[..len]).map(Some)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
