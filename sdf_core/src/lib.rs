//! # sdf_core
//!
//! Pure algorithms behind the parallel reader of SDF (self-describing file)
//! data: how a global grid is cut into per-rank sub-domains, which rank owns
//! which slab, and the deterministic generator used to shuffle payloads.
//!
//! ## Features
//!
//! - **no_std compatible**: only needs `alloc`
//! - **Side-effect free**: every function depends on its arguments alone, so
//!   each rank can compute every other rank's extents without communicating
//! - **Reproducible**: decomposition tie-breaks and the random stream are
//!   fixed, identical across runs and platforms
//!
//! ## Feature Flags
//!
//! - `std` (default): implements `std::error::Error` for [`SdfCoreError`]
//!
//! ## Modules
//!
//! - [`types`]: `Shape`, `Stagger`, `SplitFactors`, `DomainExtents`
//! - [`decompose`]: per-axis split factors for a rank count
//! - [`extents`]: a rank's start offsets, local lengths and neighbours
//! - [`random`]: KISS generator and swap shuffle
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```
//! use sdf_core::prelude::*;
//!
//! let shape = Shape::new(&[10, 10]).unwrap();
//! let split = decompose(4, &shape).unwrap();
//! let ext = extents(3, &shape, &split, Stagger::CELL_CENTRE).unwrap();
//! assert_eq!(ext.start(), &[5, 5]);
//! assert_eq!(ext.local(), &[5, 5]);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod decompose;
pub mod error;
pub mod extents;
pub mod random;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::decompose::decompose;
    pub use crate::error::SdfCoreError;
    pub use crate::extents::{all_extents, extents};
    pub use crate::random::RandomGenerator;
    pub use crate::types::{DomainExtents, Shape, SplitFactors, Stagger, MAX_DIMS};
}

pub use decompose::{decompose, max_admissible_product};
pub use error::{Result, SdfCoreError};
pub use extents::{all_extents, extents};
pub use random::{RandomGenerator, DRAW_RANGE, TABLE_SIZE};
pub use types::{DomainExtents, Shape, SplitFactors, Stagger, MAX_DIMS};
