//! In-place payload shuffles.

use std::sync::{Mutex, OnceLock, PoisonError};

use sdf_core::RandomGenerator;

use crate::error::{Result, SdfIoError};
use crate::handle::FileHandle;
use crate::memory::{allocate, Payload};

static SHARED_GENERATOR: OnceLock<Mutex<RandomGenerator>> = OnceLock::new();

/// Run `f` with the process-wide generator.
///
/// The generator is seeded on first use and never reseeded, so successive
/// callers continue one stream.
pub fn with_shared_generator<R>(f: impl FnOnce(&mut RandomGenerator) -> R) -> R {
    let shared = SHARED_GENERATOR.get_or_init(|| Mutex::new(RandomGenerator::seeded()));
    // A panic mid-draw leaves the state valid, just advanced.
    let mut rng = shared.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut rng)
}

impl FileHandle<'_> {
    /// Shuffle the elements of block `index`'s loaded data.
    ///
    /// Elements are `type_size_out` bytes wide and are moved by the
    /// generator's swap schedule. A mapped payload is first copied to a heap
    /// buffer; the mapping is never written.
    ///
    /// # Errors
    /// - `NotOpen` once the stream has been closed
    /// - `NotMaterialized` if the data has not been loaded
    /// - `InvalidBlock` if the element type has no size
    pub fn randomize_array(&mut self, index: usize, rng: &mut RandomGenerator) -> Result<usize> {
        self.ensure_open()?;
        let mapping = self.mapping.as_ref();
        let block_count = self.blocks.len();
        let block = self.blocks.get_mut(index).ok_or(SdfIoError::BlockNotFound {
            index,
            count: block_count,
        })?;

        let size = block.type_size_out();
        if size == 0 {
            return Err(SdfIoError::InvalidBlock {
                message: format!("block '{}' has no element size", block.id()),
            });
        }

        if let Payload::Mapped(_) = block.data {
            let view = block
                .data
                .bytes(mapping)
                .ok_or(SdfIoError::NotMaterialized { index })?;
            let mut owned = allocate(view.len())?;
            owned.copy_from_slice(view);
            block.data = Payload::Owned(owned);
            log::debug!("copied mapped payload of '{}' before shuffling", block.id());
        }

        let bytes = block
            .data
            .bytes_mut()
            .ok_or(SdfIoError::NotMaterialized { index })?;
        let count = bytes.len() / size;
        rng.shuffle_by(count, |a, b| swap_elements(bytes, size, a, b));

        log::debug!("shuffled {} elements of '{}'", count, block.id());
        Ok(count)
    }
}

/// Swap the `size`-byte elements at `a` and `b`.
fn swap_elements(bytes: &mut [u8], size: usize, a: usize, b: usize) {
    if a == b {
        return;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = bytes.split_at_mut(hi * size);
    head[lo * size..(lo + 1) * size].swap_with_slice(&mut tail[..size]);
}
