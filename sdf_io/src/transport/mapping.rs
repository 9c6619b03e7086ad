//! Read-only memory mapping of an SDF file.

use std::fmt;
use std::fs::File;
use std::io;
use std::ops::Range;

use memmap2::{Mmap, MmapMut, MmapOptions};

/// A read-only view of the first `len` bytes of a file.
///
/// Payloads that live in the mapping only record a byte range; the view is
/// resolved through the owning handle. The mapping is released when the
/// handle drops it at close, after every block has been cleared.
pub struct FileMapping {
    map: Mmap,
}

impl FileMapping {
    /// Map `len` bytes of `file` read-only.
    pub fn map_file(file: &File, len: usize) -> io::Result<Self> {
        // SAFETY: Mmap::map is unsafe because the file may be modified or
        // truncated by another process while mapped. This is acceptable because:
        // 1. SDF files are opened read-only and are not rewritten while open
        // 2. The mapping is owned by the handle and outlives every payload view
        // 3. All access goes through view(), which bounds-checks the range
        let map = unsafe { MmapOptions::new().len(len).map(file)? };
        Ok(Self { map })
    }

    /// Build an anonymous read-only mapping holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut map = MmapMut::map_anon(bytes.len())?;
        map.copy_from_slice(bytes);
        Ok(Self {
            map: map.make_read_only()?,
        })
    }

    /// Number of mapped bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing is mapped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bytes in `range`, or `None` if the range falls outside the mapping.
    #[inline]
    pub fn view(&self, range: Range<usize>) -> Option<&[u8]> {
        self.map.get(range)
    }
}

impl fmt::Debug for FileMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMapping")
            .field("len", &self.map.len())
            .finish()
    }
}
