//! Property-based tests for decomposition and extents.

use proptest::prelude::*;
use sdf_core::{all_extents, decompose, max_admissible_product, Shape, Stagger, MAX_DIMS};

fn dims_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..40, 1..=3)
}

fn stagger_strategy() -> impl Strategy<Value = Stagger> {
    (0u8..8).prop_map(Stagger::from_code)
}

/// Largest rank usage reachable by any factor tuple, found by trying them all.
fn exhaustive_max_product(ranks: usize, dims: &[u64]) -> usize {
    let limit = |axis: usize| dims.get(axis).map_or(1, |&d| (d as usize).min(ranks));
    let mut best = 0;
    for s0 in 1..=limit(0) {
        for s1 in 1..=limit(1) {
            for s2 in 1..=limit(2) {
                let product = s0 * s1 * s2;
                if product <= ranks {
                    best = best.max(product);
                }
            }
        }
    }
    best
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Split factors respect the rank count, the axis lengths, and use the
    /// largest admissible product.
    #[test]
    fn split_is_admissible_and_maximal(
        ranks in 1usize..64,
        dims in dims_strategy(),
    ) {
        let shape = Shape::new(&dims).unwrap();
        let split = decompose(ranks, &shape).unwrap();

        prop_assert!(split.product() <= ranks);
        for (axis, &pieces) in split.as_slice().iter().enumerate() {
            prop_assert!(pieces as u64 <= dims[axis],
                "axis {} split {} exceeds length {}", axis, pieces, dims[axis]);
        }

        prop_assert_eq!(split.product(), exhaustive_max_product(ranks, &dims));
    }

    /// The pruned search for the target product agrees with trying every tuple.
    #[test]
    fn admissible_product_matches_exhaustive_search(
        ranks in 1usize..200,
        dims in dims_strategy(),
    ) {
        let mut dmin = [1usize; MAX_DIMS];
        for (axis, &d) in dims.iter().enumerate() {
            dmin[axis] = (d as usize).min(ranks);
        }
        prop_assert_eq!(
            max_admissible_product(ranks, &dmin),
            exhaustive_max_product(ranks, &dims)
        );
    }

    /// Summing local lengths along an axis reconstructs the global length.
    #[test]
    fn local_lengths_sum_to_global(
        ranks in 1usize..48,
        dims in dims_strategy(),
        stagger in stagger_strategy(),
    ) {
        let shape = Shape::new(&dims).unwrap();
        let cells = shape.cell_centred(stagger);
        let split = decompose(ranks, &cells).unwrap();
        let all = all_extents(&shape, &split, stagger).unwrap();

        for axis in 0..shape.ndims() {
            let extra = u64::from(shape.is_staggered(axis, stagger));
            // Walk the ranks whose other coordinates are all zero.
            let stride = split.stride(axis);
            let sum: u64 = (0..split.get(axis))
                .map(|c| all[c * stride].local[axis] - extra)
                .sum();
            prop_assert_eq!(sum, cells.dim(axis));
        }
    }

    /// Cell-centred extents cover every cell exactly once.
    #[test]
    fn extents_tile_without_overlap(
        ranks in 1usize..32,
        dims in prop::collection::vec(1u64..16, 1..=3),
    ) {
        let shape = Shape::new(&dims).unwrap();
        let split = decompose(ranks, &shape).unwrap();
        let all = all_extents(&shape, &split, Stagger::CELL_CENTRE).unwrap();

        let [nx, ny, nz] = shape.padded();
        let mut owned = vec![0u8; (nx * ny * nz) as usize];
        for ext in &all {
            for k in ext.start[2]..ext.start[2] + ext.local[2] {
                for j in ext.start[1]..ext.start[1] + ext.local[1] {
                    for i in ext.start[0]..ext.start[0] + ext.local[0] {
                        owned[(i + nx * (j + ny * k)) as usize] += 1;
                    }
                }
            }
        }
        prop_assert!(owned.iter().all(|&c| c == 1));

        let total: u64 = all.iter().map(|e| e.local_count()).sum();
        prop_assert_eq!(total, shape.total());
    }

    /// Neighbour slots are empty exactly on the edges of the process grid.
    #[test]
    fn neighbour_sentinels(
        ranks in 1usize..32,
        dims in dims_strategy(),
    ) {
        let shape = Shape::new(&dims).unwrap();
        let split = decompose(ranks, &shape).unwrap();
        let all = all_extents(&shape, &split, Stagger::CELL_CENTRE).unwrap();

        for ext in &all {
            let coords = split.coords(ext.rank);
            for axis in 0..shape.ndims() {
                let edge_low = coords[axis] == 0;
                let edge_high = coords[axis] == split.get(axis) - 1;
                prop_assert_eq!(ext.neighbor_low[axis].is_none(), edge_low);
                prop_assert_eq!(ext.neighbor_high[axis].is_none(), edge_high);
                if let Some(high) = ext.neighbor_high[axis] {
                    prop_assert_eq!(high, ext.rank + split.stride(axis));
                }
            }
        }
    }
}
