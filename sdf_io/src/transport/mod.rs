//! Transport seams: where bytes come from.
//!
//! The block store never touches files directly. It reads through a
//! [`ByteStream`] and, outside a distributed job, may ask the stream for a
//! read-only [`FileMapping`] of the whole file.
//!
//! - [`FileStream`]: plain file with positioned reads and memmap2 mappings
//! - [`MemoryStream`]: in-memory bytes, used for tests and generated data

pub mod mapping;
pub mod stream;

pub use mapping::FileMapping;
pub use stream::{ByteStream, FileStream, MemoryStream};
