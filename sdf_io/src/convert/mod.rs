//! Conversions applied to loaded payloads.
//!
//! - [`narrow`]: 8-byte float payloads to 4-byte floats
//! - [`randomize`]: in-place element shuffles driven by the KISS generator

pub mod narrow;
pub mod randomize;

pub use narrow::Narrowing;
pub use randomize::with_shared_generator;
