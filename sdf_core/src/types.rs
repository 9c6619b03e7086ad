//! Core types for sdf_core decomposition.
//!
//! Shapes, stagger flags, split factors and per-rank extents. All per-axis
//! arrays are fixed at [`MAX_DIMS`] entries; axes past `ndims` are padding
//! and hold neutral values (length 1, split 1, start 0).

use crate::error::{Result, SdfCoreError};

/// Maximum number of axes a block can be decomposed along.
pub const MAX_DIMS: usize = 3;

/// Sampling position of a grid quantity within its cell.
///
/// Bit `n` set means the quantity is sampled on the faces normal to axis `n`,
/// so it stores one more sample than there are cells along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Stagger(u8);

impl Stagger {
    /// Sampled at cell centres.
    pub const CELL_CENTRE: Self = Self(0);
    /// Sampled on faces normal to x.
    pub const FACE_X: Self = Self(1);
    /// Sampled on faces normal to y.
    pub const FACE_Y: Self = Self(2);
    /// Sampled on faces normal to z.
    pub const FACE_Z: Self = Self(4);
    /// Sampled on edges parallel to x.
    pub const EDGE_X: Self = Self(6);
    /// Sampled on edges parallel to y.
    pub const EDGE_Y: Self = Self(5);
    /// Sampled on edges parallel to z.
    pub const EDGE_Z: Self = Self(3);
    /// Sampled on cell vertices (nodes).
    pub const VERTEX: Self = Self(7);

    /// Build a stagger from its on-disk code. Bits above the third are ignored.
    #[inline]
    pub const fn from_code(code: u8) -> Self {
        Self(code & 0b111)
    }

    /// The on-disk code.
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// True when no axis is staggered.
    #[inline]
    pub const fn is_cell_centred(self) -> bool {
        self.0 == 0
    }

    /// True when the quantity carries an extra sample along `axis`.
    #[inline]
    pub const fn is_staggered(self, axis: usize) -> bool {
        axis < MAX_DIMS && self.0 & (1 << axis) != 0
    }
}

/// Global shape of a block: 1 to 3 axes, every axis at least one element long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    ndims: usize,
    dims: [u64; MAX_DIMS],
}

impl Shape {
    /// Create a shape from per-axis lengths.
    ///
    /// # Errors
    /// `UnsupportedDimensionality` unless 1 to 3 axes are given,
    /// `InvalidRankConfiguration` if any axis has zero elements or the
    /// element count does not fit in a `u64`.
    pub fn new(dims: &[u64]) -> Result<Self> {
        if dims.is_empty() || dims.len() > MAX_DIMS {
            return Err(SdfCoreError::UnsupportedDimensionality { ndims: dims.len() });
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(SdfCoreError::InvalidRankConfiguration {
                message: "every axis must have at least one element",
            });
        }
        if dims.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d)).is_none() {
            return Err(SdfCoreError::InvalidRankConfiguration {
                message: "total element count overflows u64",
            });
        }

        let mut padded = [1u64; MAX_DIMS];
        padded[..dims.len()].copy_from_slice(dims);
        Ok(Self {
            ndims: dims.len(),
            dims: padded,
        })
    }

    /// Number of axes.
    #[inline]
    pub const fn ndims(&self) -> usize {
        self.ndims
    }

    /// Per-axis lengths (only the first `ndims`).
    #[inline]
    pub fn dims(&self) -> &[u64] {
        &self.dims[..self.ndims]
    }

    /// Length of one axis; padding axes report 1.
    #[inline]
    pub const fn dim(&self, axis: usize) -> u64 {
        self.dims[axis]
    }

    /// Padded per-axis lengths.
    #[inline]
    pub const fn padded(&self) -> [u64; MAX_DIMS] {
        self.dims
    }

    /// Total number of elements. Never overflows; `new` rejects such shapes.
    #[inline]
    pub fn total(&self) -> u64 {
        self.dims().iter().product()
    }

    /// Whether `axis` actually carries a staggered sample.
    ///
    /// An axis with a single sample has no cell to stagger around and is
    /// treated as cell centred.
    #[inline]
    pub fn is_staggered(&self, axis: usize, stagger: Stagger) -> bool {
        axis < self.ndims && stagger.is_staggered(axis) && self.dims[axis] > 1
    }

    /// The cell-centred equivalent shape: staggered axes lose their extra sample.
    pub fn cell_centred(&self, stagger: Stagger) -> Self {
        let mut out = *self;
        for axis in 0..self.ndims {
            if self.is_staggered(axis, stagger) {
                out.dims[axis] -= 1;
            }
        }
        out
    }
}

/// Number of pieces each axis is cut into across ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitFactors {
    ndims: usize,
    split: [usize; MAX_DIMS],
}

impl SplitFactors {
    /// Create split factors for 1 to 3 axes.
    ///
    /// # Errors
    /// `UnsupportedDimensionality` for the wrong axis count,
    /// `InvalidRankConfiguration` if any factor is zero.
    pub fn new(split: &[usize]) -> Result<Self> {
        if split.is_empty() || split.len() > MAX_DIMS {
            return Err(SdfCoreError::UnsupportedDimensionality { ndims: split.len() });
        }
        if split.iter().any(|&s| s == 0) {
            return Err(SdfCoreError::InvalidRankConfiguration {
                message: "split factors must be positive",
            });
        }

        let mut padded = [1usize; MAX_DIMS];
        padded[..split.len()].copy_from_slice(split);
        Ok(Self {
            ndims: split.len(),
            split: padded,
        })
    }

    /// A single piece along every axis.
    #[inline]
    pub const fn unsplit(ndims: usize) -> Self {
        Self {
            ndims,
            split: [1; MAX_DIMS],
        }
    }

    /// Number of axes.
    #[inline]
    pub const fn ndims(&self) -> usize {
        self.ndims
    }

    /// Per-axis factors (only the first `ndims`).
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.split[..self.ndims]
    }

    /// Factor of one axis; padding axes report 1.
    #[inline]
    pub const fn get(&self, axis: usize) -> usize {
        self.split[axis]
    }

    /// Number of ranks that receive a sub-domain.
    #[inline]
    pub fn product(&self) -> usize {
        self.as_slice().iter().product()
    }

    /// Rank distance between neighbours along `axis`: the product of the
    /// factors of all lower axes.
    #[inline]
    pub fn stride(&self, axis: usize) -> usize {
        self.split[..axis].iter().product()
    }

    /// Position of `rank` in the process grid, axis 0 varying fastest.
    pub fn coords(&self, rank: usize) -> [usize; MAX_DIMS] {
        let mut coords = [0usize; MAX_DIMS];
        let mut div = 1usize;
        for (axis, coord) in coords.iter_mut().enumerate().take(self.ndims) {
            *coord = (rank / div) % self.split[axis];
            div *= self.split[axis];
        }
        coords
    }

    /// Inverse of [`coords`](Self::coords).
    pub fn rank_of(&self, coords: [usize; MAX_DIMS]) -> usize {
        (0..self.ndims).map(|axis| coords[axis] * self.stride(axis)).sum()
    }
}

/// The rectangular sub-domain owned by one rank, with its halo neighbours.
///
/// `None` in a neighbour slot means there is no rank on that side (the rank
/// sits on the edge of the process grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainExtents {
    /// The rank these extents belong to.
    pub rank: usize,
    /// Number of meaningful axes.
    pub ndims: usize,
    /// First global index owned along each axis.
    pub start: [u64; MAX_DIMS],
    /// Number of samples owned along each axis (padding axes hold 1).
    pub local: [u64; MAX_DIMS],
    /// Neighbour on the low side of each axis.
    pub neighbor_low: [Option<usize>; MAX_DIMS],
    /// Neighbour on the high side of each axis.
    pub neighbor_high: [Option<usize>; MAX_DIMS],
}

impl DomainExtents {
    /// Extents covering the whole shape, as seen by a lone rank.
    pub fn whole(shape: &Shape) -> Self {
        Self {
            rank: 0,
            ndims: shape.ndims(),
            start: [0; MAX_DIMS],
            local: shape.padded(),
            neighbor_low: [None; MAX_DIMS],
            neighbor_high: [None; MAX_DIMS],
        }
    }

    /// Number of samples owned by this rank.
    #[inline]
    pub fn local_count(&self) -> u64 {
        self.local[..self.ndims].iter().product()
    }

    /// Per-axis start offsets (only the first `ndims`).
    #[inline]
    pub fn start(&self) -> &[u64] {
        &self.start[..self.ndims]
    }

    /// Per-axis local lengths (only the first `ndims`).
    #[inline]
    pub fn local(&self) -> &[u64] {
        &self.local[..self.ndims]
    }

    /// True if `index` along `axis` falls inside this rank's range.
    #[inline]
    pub fn contains(&self, axis: usize, index: u64) -> bool {
        index >= self.start[axis] && index < self.start[axis] + self.local[axis]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stagger_bits() {
        assert!(Stagger::CELL_CENTRE.is_cell_centred());
        assert!(Stagger::FACE_X.is_staggered(0));
        assert!(!Stagger::FACE_X.is_staggered(1));
        assert!(Stagger::EDGE_X.is_staggered(1));
        assert!(Stagger::EDGE_X.is_staggered(2));
        assert!(!Stagger::EDGE_X.is_staggered(0));
        assert!((0..3).all(|a| Stagger::VERTEX.is_staggered(a)));
        assert!(!Stagger::VERTEX.is_staggered(3));
        assert_eq!(Stagger::from_code(0xff), Stagger::VERTEX);
    }

    #[test]
    fn test_shape_validation() {
        assert!(Shape::new(&[]).is_err());
        assert!(Shape::new(&[1, 2, 3, 4]).is_err());
        assert_eq!(
            Shape::new(&[4, 0]),
            Err(SdfCoreError::InvalidRankConfiguration {
                message: "every axis must have at least one element",
            })
        );

        let shape = Shape::new(&[4, 5]).unwrap();
        assert_eq!(shape.ndims(), 2);
        assert_eq!(shape.dims(), &[4, 5]);
        assert_eq!(shape.padded(), [4, 5, 1]);
        assert_eq!(shape.total(), 20);
    }

    #[test]
    fn test_shape_total_must_fit() {
        assert_eq!(
            Shape::new(&[1 << 30, 1 << 30, 1 << 30]),
            Err(SdfCoreError::InvalidRankConfiguration {
                message: "total element count overflows u64",
            })
        );
        assert!(Shape::new(&[u64::MAX, 2]).is_err());

        assert_eq!(Shape::new(&[1 << 21; 3]).unwrap().total(), 1 << 63);
        assert_eq!(Shape::new(&[u64::MAX]).unwrap().total(), u64::MAX);
    }

    #[test]
    fn test_cell_centred_shape() {
        let shape = Shape::new(&[11, 11, 1]).unwrap();
        let cells = shape.cell_centred(Stagger::VERTEX);
        // The single-sample axis cannot lose a sample.
        assert_eq!(cells.dims(), &[10, 10, 1]);
        assert!(!shape.is_staggered(2, Stagger::VERTEX));

        let cells = shape.cell_centred(Stagger::FACE_Y);
        assert_eq!(cells.dims(), &[11, 10, 1]);
    }

    #[test]
    fn test_split_coords_roundtrip() {
        let split = SplitFactors::new(&[3, 2, 4]).unwrap();
        assert_eq!(split.product(), 24);
        assert_eq!(split.stride(0), 1);
        assert_eq!(split.stride(1), 3);
        assert_eq!(split.stride(2), 6);

        for rank in 0..split.product() {
            let coords = split.coords(rank);
            assert!(coords[0] < 3 && coords[1] < 2 && coords[2] < 4);
            assert_eq!(split.rank_of(coords), rank);
        }
        assert_eq!(split.coords(5), [2, 1, 0]);
    }

    #[test]
    fn test_split_rejects_zero() {
        assert!(SplitFactors::new(&[2, 0]).is_err());
        assert!(SplitFactors::new(&[]).is_err());
    }

    #[test]
    fn test_whole_extents() {
        let shape = Shape::new(&[7, 3]).unwrap();
        let ext = DomainExtents::whole(&shape);
        assert_eq!(ext.start(), &[0, 0]);
        assert_eq!(ext.local(), &[7, 3]);
        assert_eq!(ext.local_count(), 21);
        assert!(ext.contains(0, 6));
        assert!(!ext.contains(0, 7));
    }
}
