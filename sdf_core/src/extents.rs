//! Per-rank sub-domain extents and halo neighbours.
//!
//! A pure function of `(rank, shape, split, stagger)`. Every rank evaluates it
//! independently; identical inputs on every rank are what make the resulting
//! tiling consistent without any communication.

use alloc::vec::Vec;

use crate::error::{Result, SdfCoreError};
use crate::types::{DomainExtents, Shape, SplitFactors, Stagger, MAX_DIMS};

/// Compute the sub-domain owned by `rank`.
///
/// Along each axis the cell count is divided by the split factor. The first
/// `split_big = cells % split` coordinates receive one extra cell and are laid
/// out first; the rest follow with the minimum count. The pieces tile the
/// axis with no gap and no overlap.
///
/// Staggered axes are split on their cell count (one less than the stored
/// length) and each rank then gets one extra sample, so neighbouring ranks
/// share the sample on their common face.
///
/// Neighbours are `rank ± stride(axis)`, or `None` at coordinate 0 (low side)
/// and at coordinate `split - 1` (high side).
///
/// # Errors
/// - `UnsupportedDimensionality` if `shape` and `split` disagree on axes
/// - `InvalidRankConfiguration` if an axis is cut into more pieces than it has cells
/// - `RankOutOfRange` if `rank >= split.product()`
///
/// # Example
/// ```
/// use sdf_core::{extents, Shape, SplitFactors, Stagger};
///
/// let shape = Shape::new(&[7]).unwrap();
/// let split = SplitFactors::new(&[3]).unwrap();
/// let ext = extents(0, &shape, &split, Stagger::CELL_CENTRE).unwrap();
/// assert_eq!(ext.start(), &[0]);
/// assert_eq!(ext.local(), &[3]);
/// ```
pub fn extents(
    rank: usize,
    shape: &Shape,
    split: &SplitFactors,
    stagger: Stagger,
) -> Result<DomainExtents> {
    validate(shape, split)?;
    let cells = shape.cell_centred(stagger);
    for axis in 0..shape.ndims() {
        if split.get(axis) as u64 > cells.dim(axis) {
            return Err(SdfCoreError::InvalidRankConfiguration {
                message: "an axis cannot be split into more pieces than it has cells",
            });
        }
    }

    let active_ranks = split.product();
    if rank >= active_ranks {
        return Err(SdfCoreError::RankOutOfRange { rank, active_ranks });
    }

    Ok(extents_unchecked(rank, shape, &cells, split, stagger))
}

/// Extents of every active rank, in rank order.
pub fn all_extents(
    shape: &Shape,
    split: &SplitFactors,
    stagger: Stagger,
) -> Result<Vec<DomainExtents>> {
    (0..split.product())
        .map(|rank| extents(rank, shape, split, stagger))
        .collect()
}

fn validate(shape: &Shape, split: &SplitFactors) -> Result<()> {
    if shape.ndims() != split.ndims() {
        return Err(SdfCoreError::UnsupportedDimensionality {
            ndims: split.ndims(),
        });
    }
    Ok(())
}

fn extents_unchecked(
    rank: usize,
    shape: &Shape,
    cells: &Shape,
    split: &SplitFactors,
    stagger: Stagger,
) -> DomainExtents {
    let ndims = shape.ndims();
    let mut out = DomainExtents {
        rank,
        ndims,
        start: [0; MAX_DIMS],
        local: [1; MAX_DIMS],
        neighbor_low: [None; MAX_DIMS],
        neighbor_high: [None; MAX_DIMS],
    };

    let mut div = 1usize;
    for axis in 0..ndims {
        let pieces = split.get(axis);
        let coords = (rank / div) % pieces;

        out.neighbor_low[axis] = (coords != 0).then(|| rank - div);
        out.neighbor_high[axis] = (coords != pieces - 1).then(|| rank + div);
        div *= pieces;

        let pieces = pieces as u64;
        let coords = coords as u64;
        let npoint_min = cells.dim(axis) / pieces;
        let split_big = cells.dim(axis) - pieces * npoint_min;

        if coords >= split_big {
            out.start[axis] = split_big * (npoint_min + 1) + (coords - split_big) * npoint_min;
            out.local[axis] = npoint_min;
        } else {
            out.start[axis] = coords * (npoint_min + 1);
            out.local[axis] = npoint_min + 1;
        }

        if shape.is_staggered(axis, stagger) {
            out.local[axis] += 1;
        }
    }

    out
}
