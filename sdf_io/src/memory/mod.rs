//! In-memory block model.
//!
//! This module provides the block types owned by a file handle:
//! - `Block`: shape metadata, decomposition and payload buffers of one block
//! - `BlockBuilder`: validated construction from parsed header fields
//! - `Payload`: one buffer, tagged `Owned`, `Mapped` or `Borrowed`
//! - `ReleaseSummary`: what a release freed and what it only detached

pub mod block;
pub mod builder;
pub mod payload;

pub use block::{Block, BlockType, Datatype, Decomposition};
pub use builder::BlockBuilder;
pub use payload::{allocate, Ownership, Payload, PayloadRelease, ReleaseSummary};
