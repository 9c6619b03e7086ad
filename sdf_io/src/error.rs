//! Error types for sdf_io operations.

use sdf_core::SdfCoreError;
use thiserror::Error;

use crate::handle::FileHandle;

/// Errors that can occur while managing an open SDF file and its blocks.
#[derive(Error, Debug)]
pub enum SdfIoError {
    /// The handle has no open byte stream.
    #[error("file handle is not open")]
    NotOpen,

    /// A payload buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailure {
        /// Size of the failed allocation.
        bytes: usize,
    },

    /// No block at the given position in the block list.
    #[error("block index {index} out of range for {count} blocks")]
    BlockNotFound {
        /// The requested index.
        index: usize,
        /// Number of blocks attached to the handle.
        count: usize,
    },

    /// Block metadata is inconsistent.
    #[error("invalid block: {message}")]
    InvalidBlock {
        /// Description of the problem.
        message: String,
    },

    /// Invalid open options.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A caller-supplied buffer cannot hold the requested payload.
    #[error("buffer too small: required {required} bytes, provided {provided}")]
    BufferTooSmall {
        /// Bytes needed.
        required: usize,
        /// Bytes available.
        provided: usize,
    },

    /// The block's sub-domain has not been computed yet.
    #[error("block {index} has not been decomposed: call factor() first")]
    NotDecomposed {
        /// Index of the block.
        index: usize,
    },

    /// The block's payload has not been loaded.
    #[error("block {index} has no materialized payload")]
    NotMaterialized {
        /// Index of the block.
        index: usize,
    },

    /// Invalid shape, rank or split passed to the decomposition.
    #[error("decomposition error: {0}")]
    Core(#[from] SdfCoreError),

    /// Error from the byte-stream transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed [`FileHandle::close`].
///
/// The handle comes back with its stream, blocks and mapping untouched, so
/// the close can be retried or the handle kept in use.
#[derive(Error, Debug)]
#[error("failed to close file handle: {error}")]
pub struct CloseError<'a> {
    /// Why the close failed.
    #[source]
    pub error: SdfIoError,
    /// The handle, as it was before the call.
    pub handle: FileHandle<'a>,
}

impl From<CloseError<'_>> for SdfIoError {
    fn from(err: CloseError<'_>) -> Self {
        err.error
    }
}

/// Result type for sdf_io operations.
pub type Result<T> = std::result::Result<T, SdfIoError>;
