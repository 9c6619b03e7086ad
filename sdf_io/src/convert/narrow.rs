//! Reduced-precision output for 8-byte float payloads.

use crate::error::{Result, SdfIoError};
use crate::handle::FileHandle;
use crate::memory::{allocate, Datatype, Payload, PayloadRelease};

/// Outcome of a narrowing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
    /// The payload was replaced by `elements` 4-byte floats.
    Converted {
        /// Number of converted elements.
        elements: usize,
        /// What happened to the source buffer.
        released: PayloadRelease,
    },
    /// Reduced precision was not requested or the payload is not 8-byte floats.
    Unchanged,
}

impl FileHandle<'_> {
    /// Replace the first `count` elements of block `index`'s data with
    /// 4-byte floats.
    ///
    /// Applies only when the handle was opened with `use_float` and the
    /// payload currently holds 8-byte floats; otherwise nothing changes, so
    /// a second call is a no-op. An owned source is freed. A mapped or
    /// borrowed source is left intact and only detached.
    ///
    /// # Errors
    /// - `NotOpen` once the stream has been closed
    /// - `NotMaterialized` if the data has not been loaded
    /// - `BufferTooSmall` if the payload holds fewer than `count` elements
    /// - `AllocationFailure` if the new buffer cannot be allocated
    pub fn narrow_to_reduced_precision(&mut self, index: usize, count: usize) -> Result<Narrowing> {
        self.ensure_open()?;
        let use_float = self.config.use_float;
        let mapping = self.mapping.as_ref();
        let block_count = self.blocks.len();
        let block = self.blocks.get_mut(index).ok_or(SdfIoError::BlockNotFound {
            index,
            count: block_count,
        })?;

        if !use_float || block.datatype_out != Datatype::Real8 {
            return Ok(Narrowing::Unchanged);
        }

        let narrowed = {
            let source = block
                .data
                .bytes(mapping)
                .ok_or(SdfIoError::NotMaterialized { index })?;
            let required = count.saturating_mul(Datatype::Real8.type_size());
            if source.len() < required {
                return Err(SdfIoError::BufferTooSmall {
                    required,
                    provided: source.len(),
                });
            }

            let mut out = allocate(count * Datatype::Real4.type_size())?;
            for (src, dst) in source.chunks_exact(8).zip(out.chunks_exact_mut(4)) {
                let mut wide = [0u8; 8];
                wide.copy_from_slice(src);
                let value = f64::from_le_bytes(wide) as f32;
                dst.copy_from_slice(&value.to_le_bytes());
            }
            out
        };

        let released = block.data.release();
        block.data = Payload::Owned(narrowed);
        block.datatype_out = Datatype::Real4;

        log::debug!(
            "narrowed {} elements of '{}' to 4-byte floats ({:?})",
            count,
            block.id(),
            released
        );
        Ok(Narrowing::Converted {
            elements: count,
            released,
        })
    }
}
