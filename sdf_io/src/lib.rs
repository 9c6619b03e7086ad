//! sdf_io - block store, payload ownership and transport seams for SDF files.
//!
//! This crate holds the state of an open SDF (self-describing file) session:
//! the byte stream, the blocks parsed from its header, and the payload
//! buffers loaded for this rank's share of each block. The algorithms that
//! decide that share live in [`sdf_core`].
//!
//! # Ownership
//!
//! Every payload is a [`Payload`] tagged with who owns its bytes:
//! - `Owned`: heap buffer read by the handle, freed on release
//! - `Mapped`: view of the file's read-only mapping, detached on release
//! - `Borrowed`: caller buffer, detached on release and never freed
//!
//! Releasing twice is a no-op, and the mapping outlives every block.
//!
//! # Core Types
//!
//! - [`FileHandle`]: open session; attach, factor, load, release, close
//! - [`Block`] / [`BlockBuilder`]: block metadata and payloads
//! - [`FileConfig`]: rank layout and open options
//! - [`ByteStream`]: transport seam, with [`FileStream`] and [`MemoryStream`]
//!
//! # Example
//!
//! ```
//! use sdf_io::{BlockBuilder, BlockType, Datatype, FileConfig, FileHandle, MemoryStream};
//!
//! let bytes: Vec<u8> = (0..16).flat_map(|i| (i as f64).to_le_bytes()).collect();
//! let config = FileConfig::new(1, 2);
//! let mut handle = FileHandle::from_stream(Box::new(MemoryStream::new(bytes)), config)?;
//!
//! let block = BlockBuilder::new("rho", BlockType::PlainVariable, Datatype::Real8)
//!     .dims(&[4, 4])
//!     .build()?;
//! let idx = handle.attach(block)?;
//!
//! let ext = *handle.factor(idx)?.extents().unwrap();
//! assert_eq!(ext.local(), &[4, 2]);
//!
//! handle.load_data(idx)?;
//! assert_eq!(handle.data(idx)?.len(), 8 * 8);
//!
//! handle.close()?;
//! # Ok::<(), sdf_io::SdfIoError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod convert;
pub mod error;
pub mod handle;
pub mod memory;
pub mod transport;

// Re-export core types from sdf_core
pub use sdf_core::{DomainExtents, RandomGenerator, Shape, SplitFactors, Stagger};

// Re-export main types
pub use config::{FileConfig, DEFAULT_STRING_LENGTH};
pub use convert::{with_shared_generator, Narrowing};
pub use error::{CloseError, Result, SdfIoError};
pub use handle::FileHandle;
pub use memory::{
    Block, BlockBuilder, BlockType, Datatype, Decomposition, Ownership, Payload, PayloadRelease,
    ReleaseSummary,
};
pub use transport::{ByteStream, FileMapping, FileStream, MemoryStream};
