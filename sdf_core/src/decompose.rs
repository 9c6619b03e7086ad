//! Load-balancing split of a global grid across ranks.
//!
//! Chooses how many pieces each axis is cut into so that the per-rank cell
//! count is as close as possible to the ideal average. This is a heuristic:
//! only combinations whose product equals the largest admissible rank usage
//! are considered, and the first best combination in enumeration order wins.

use crate::error::{Result, SdfCoreError};
use crate::types::{Shape, SplitFactors, MAX_DIMS};

/// Compute per-axis split factors for `rank_count` ranks over `shape`.
///
/// `shape` should already be the cell-centred shape (see
/// [`Shape::cell_centred`]); staggered samples are not counted as cells.
///
/// # Algorithm
///
/// 1. Each axis can be cut into at most `min(rank_count, dim)` pieces.
/// 2. The target rank usage is the largest product of admissible factors
///    that does not exceed `rank_count`.
/// 3. Every combination whose product equals the target is scored: for each
///    corner formed by picking the floor or ceiling per-rank length on every
///    axis, the corner's cell count is compared to `total / rank_count`.
///    The combination with the smallest corner deviation wins.
///
/// Enumeration runs from the highest axis to the lowest, factors descending.
/// Ties keep the first combination found, so equally good splits resolve the
/// same way on every rank.
///
/// # Errors
/// `InvalidRankConfiguration` if `rank_count` is zero.
///
/// # Example
/// ```
/// use sdf_core::{decompose, Shape};
///
/// let shape = Shape::new(&[10, 10]).unwrap();
/// let split = decompose(4, &shape).unwrap();
/// assert_eq!(split.as_slice(), &[2, 2]);
/// ```
pub fn decompose(rank_count: usize, shape: &Shape) -> Result<SplitFactors> {
    if rank_count == 0 {
        return Err(SdfCoreError::InvalidRankConfiguration {
            message: "rank count must be positive",
        });
    }

    let ndims = shape.ndims();
    let dims = shape.padded();

    let mut dmin = [1usize; MAX_DIMS];
    for axis in 0..ndims {
        dmin[axis] = axis_limit(dims[axis], rank_count);
    }

    let target = max_admissible_product(rank_count, &dmin);
    let average = shape.total() as f64 / rank_count as f64;

    let mut best: Option<([usize; MAX_DIMS], f64)> = None;

    for s2 in (1..=dmin[2].min(target)).rev() {
        let s1_max = dmin[1].min(target / s2);
        for s1 in (1..=s1_max).rev() {
            let outer = s2 * s1;
            if target % outer != 0 {
                continue;
            }
            let s0 = target / outer;
            if s0 > dmin[0] {
                continue;
            }

            let split = [s0, s1, s2];
            let deviation = best_corner_deviation(&dims, &split, average);
            if best.map_or(true, |(_, min)| deviation < min) {
                best = Some((split, deviation));
            }
        }
    }

    // The target is built from an admissible combination, so one always exists.
    let (split, _) = best.ok_or(SdfCoreError::InvalidRankConfiguration {
        message: "no admissible split for the requested rank count",
    })?;

    SplitFactors::new(&split[..ndims])
}

/// Largest product of per-axis factors, each within its axis limit, that does
/// not exceed `rank_count`.
///
/// When the rank count factors poorly against the axis limits (a prime rank
/// count on a small grid, say) this is smaller than `min(rank_count, ∏ dmin)`
/// and the remaining ranks stay idle.
pub fn max_admissible_product(rank_count: usize, dmin: &[usize; MAX_DIMS]) -> usize {
    let mut best = 1usize;
    for s2 in 1..=dmin[2] {
        if s2 > rank_count {
            break;
        }
        for s1 in 1..=dmin[1] {
            let outer = s2 * s1;
            if outer > rank_count {
                break;
            }
            let s0 = dmin[0].min(rank_count / outer);
            best = best.max(outer * s0);
        }
    }
    best
}

#[inline]
fn axis_limit(dim: u64, rank_count: usize) -> usize {
    if dim >= rank_count as u64 {
        rank_count
    } else {
        dim as usize
    }
}

/// Smallest deviation from `average` over every floor/ceiling corner.
///
/// An axis that divides evenly only has a floor length; the ceiling corner
/// does not exist and is skipped.
fn best_corner_deviation(dims: &[u64; MAX_DIMS], split: &[usize; MAX_DIMS], average: f64) -> f64 {
    let mut lengths = [[None; 2]; MAX_DIMS];
    for axis in 0..MAX_DIMS {
        let pieces = split[axis] as u64;
        let npoint_min = dims[axis] / pieces;
        let split_big = dims[axis] - pieces * npoint_min;
        lengths[axis] = [Some(npoint_min), (split_big > 0).then_some(npoint_min + 1)];
    }

    let mut best = f64::INFINITY;
    for a in lengths[0].iter().flatten() {
        for b in lengths[1].iter().flatten() {
            for c in lengths[2].iter().flatten() {
                let cells = (a * b * c) as f64;
                let deviation = libm::fabs(cells - average);
                if deviation < best {
                    best = deviation;
                }
            }
        }
    }
    best
}
