//! Payload buffers and their ownership.
//!
//! Every buffer a block exposes is one [`Payload`]. The variant decides what
//! releasing it means:
//!
//! | Variant    | Backing                        | Release  |
//! |------------|--------------------------------|----------|
//! | `Owned`    | heap buffer read by the store  | freed    |
//! | `Mapped`   | range of the file mapping      | detached |
//! | `Borrowed` | caller-supplied slice          | detached |
//!
//! Releasing an `Empty` payload is a no-op that reports
//! [`PayloadRelease::AlreadyReleased`], so cleanup can be repeated safely.

use std::fmt;
use std::mem;
use std::ops::Range;

use crate::error::{Result, SdfIoError};
use crate::transport::FileMapping;

/// Who owns the bytes of a materialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Heap buffer allocated by the store.
    Owned,
    /// View into the file's read-only memory mapping.
    Mapped,
    /// Buffer supplied by the caller.
    Borrowed,
}

/// One payload buffer of a block.
#[derive(Default)]
pub enum Payload<'a> {
    /// Not materialized.
    #[default]
    Empty,
    /// Heap buffer owned by the block.
    Owned(Vec<u8>),
    /// Byte range within the handle's file mapping.
    Mapped(Range<usize>),
    /// Caller buffer, never freed by the store.
    Borrowed(&'a mut [u8]),
}

/// Outcome of releasing one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRelease {
    /// An owned buffer was freed.
    Freed {
        /// Size of the freed buffer.
        bytes: usize,
    },
    /// A mapped or borrowed buffer was detached without being freed.
    Detached,
    /// Nothing was materialized.
    AlreadyReleased,
}

/// Totals over a batch of payload releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Owned buffers freed.
    pub freed_buffers: usize,
    /// Bytes returned to the allocator.
    pub freed_bytes: usize,
    /// Mapped or borrowed buffers detached.
    pub detached: usize,
}

impl ReleaseSummary {
    /// Count one release outcome.
    pub fn record(&mut self, release: PayloadRelease) {
        match release {
            PayloadRelease::Freed { bytes } => {
                self.freed_buffers += 1;
                self.freed_bytes += bytes;
            }
            PayloadRelease::Detached => self.detached += 1,
            PayloadRelease::AlreadyReleased => {}
        }
    }

    /// Add another summary into this one.
    pub fn merge(&mut self, other: ReleaseSummary) {
        self.freed_buffers += other.freed_buffers;
        self.freed_bytes += other.freed_bytes;
        self.detached += other.detached;
    }

    /// True if nothing was freed or detached.
    pub fn is_empty(&self) -> bool {
        self.freed_buffers == 0 && self.detached == 0
    }
}

impl<'a> Payload<'a> {
    /// Ownership of the materialized bytes, or `None` when empty.
    pub fn ownership(&self) -> Option<Ownership> {
        match self {
            Payload::Empty => None,
            Payload::Owned(_) => Some(Ownership::Owned),
            Payload::Mapped(_) => Some(Ownership::Mapped),
            Payload::Borrowed(_) => Some(Ownership::Borrowed),
        }
    }

    /// True once the payload holds data.
    #[inline]
    pub fn is_materialized(&self) -> bool {
        !matches!(self, Payload::Empty)
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Owned(buf) => buf.len(),
            Payload::Mapped(range) => range.len(),
            Payload::Borrowed(buf) => buf.len(),
        }
    }

    /// True if the payload holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only bytes. Mapped payloads resolve through `mapping`.
    pub fn bytes<'m>(&'m self, mapping: Option<&'m FileMapping>) -> Option<&'m [u8]> {
        match self {
            Payload::Empty => None,
            Payload::Owned(buf) => Some(buf),
            Payload::Mapped(range) => mapping.and_then(|m| m.view(range.clone())),
            Payload::Borrowed(buf) => Some(buf),
        }
    }

    /// Writable bytes. Mapped payloads are read-only and return `None`.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Payload::Owned(buf) => Some(buf),
            Payload::Borrowed(buf) => Some(buf),
            Payload::Empty | Payload::Mapped(_) => None,
        }
    }

    /// Release the payload, leaving it empty.
    pub fn release(&mut self) -> PayloadRelease {
        match mem::take(self) {
            Payload::Empty => PayloadRelease::AlreadyReleased,
            Payload::Owned(buf) => PayloadRelease::Freed { bytes: buf.len() },
            Payload::Mapped(_) | Payload::Borrowed(_) => PayloadRelease::Detached,
        }
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Owned(buf) => f.debug_tuple("Owned").field(&buf.len()).finish(),
            Payload::Mapped(range) => f.debug_tuple("Mapped").field(range).finish(),
            Payload::Borrowed(buf) => f.debug_tuple("Borrowed").field(&buf.len()).finish(),
        }
    }
}

/// Allocate a zeroed heap buffer of `bytes` bytes.
///
/// # Errors
/// Returns `AllocationFailure` if the allocator refuses the request.
pub fn allocate(bytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| SdfIoError::AllocationFailure { bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}
