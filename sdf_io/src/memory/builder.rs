//! Builder for [`Block`] records.
//!
//! Header parsing happens outside this crate; whatever parses the header
//! describes each block through this builder, which checks that the shape
//! and auxiliary arrays are consistent before the block is attached.

use sdf_core::{Shape, Stagger, MAX_DIMS};

use super::block::{Block, BlockType, Datatype};
use super::payload::Payload;
use crate::error::{Result, SdfIoError};

/// Builder for constructing `Block` instances.
///
/// # Example
///
/// ```
/// use sdf_io::{BlockBuilder, BlockType, Datatype};
/// use sdf_core::Stagger;
///
/// let block = BlockBuilder::new("ex", BlockType::PlainVariable, Datatype::Real8)
///     .name("Electric Field/Ex")
///     .mesh_id("grid")
///     .dims(&[64, 32])
///     .stagger(Stagger::FACE_X)
///     .data_location(4096)
///     .build()
///     .unwrap();
///
/// assert_eq!(block.shape().total(), 2048);
/// ```
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    id: String,
    name: Option<String>,
    mesh_id: Option<String>,
    material_id: Option<String>,
    block_type: BlockType,
    datatype: Datatype,
    dims: Vec<u64>,
    grid_axes: Option<usize>,
    stagger: Stagger,
    data_location: u64,
    n_ids: usize,
    variable_ids: Vec<String>,
    material_names: Vec<String>,
}

impl BlockBuilder {
    /// Start a block with the given identity and element type.
    pub fn new(id: impl Into<String>, block_type: BlockType, datatype: Datatype) -> Self {
        Self {
            id: id.into(),
            name: None,
            mesh_id: None,
            material_id: None,
            block_type,
            datatype,
            dims: Vec::new(),
            grid_axes: None,
            stagger: Stagger::CELL_CENTRE,
            data_location: 0,
            n_ids: 0,
            variable_ids: Vec::new(),
            material_names: Vec::new(),
        }
    }

    /// Display name. Defaults to the id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mesh the block lives on.
    pub fn mesh_id(mut self, mesh_id: impl Into<String>) -> Self {
        self.mesh_id = Some(mesh_id.into());
        self
    }

    /// Associated material.
    pub fn material_id(mut self, material_id: impl Into<String>) -> Self {
        self.material_id = Some(material_id.into());
        self
    }

    /// Global dimension lengths, one per axis.
    pub fn dims(mut self, dims: &[u64]) -> Self {
        self.dims = dims.to_vec();
        self
    }

    /// Spatial dimension of a point mesh, i.e. how many coordinate arrays it
    /// carries. Defaults to 1 for point meshes and to the number of axes for
    /// plain meshes.
    pub fn grid_axes(mut self, axes: usize) -> Self {
        self.grid_axes = Some(axes);
        self
    }

    /// Sample placement. Defaults to cell-centred.
    pub fn stagger(mut self, stagger: Stagger) -> Self {
        self.stagger = stagger;
        self
    }

    /// Byte offset of the payload within the file.
    pub fn data_location(mut self, offset: u64) -> Self {
        self.data_location = offset;
        self
    }

    /// Explicit length of the auxiliary arrays.
    ///
    /// When zero (the default) the auxiliary arrays have one entry per axis.
    pub fn n_ids(mut self, n_ids: usize) -> Self {
        self.n_ids = n_ids;
        self
    }

    /// Component variable identifiers.
    pub fn variable_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variable_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Material names, parallel to the variable ids.
    pub fn material_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.material_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Expected length of each non-empty auxiliary array.
    pub fn aux_len(&self) -> usize {
        if self.n_ids > 0 {
            self.n_ids
        } else {
            self.dims.len()
        }
    }

    /// Build the block.
    ///
    /// # Errors
    /// - `InvalidBlock` if the id is empty, the shape is not 1 to 3 non-zero
    ///   axes, the element type has no size, the coordinate array count does
    ///   not fit the block type, or an auxiliary array has the wrong length
    pub fn build<'a>(self) -> Result<Block<'a>> {
        if self.id.is_empty() {
            return Err(invalid("block id must not be empty".to_string()));
        }

        let shape = Shape::new(&self.dims)
            .map_err(|e| invalid(format!("block '{}': {}", self.id, e)))?;

        if self.block_type != BlockType::Other && self.datatype.type_size() == 0 {
            return Err(invalid(format!(
                "block '{}': datatype {:?} has no element size",
                self.id, self.datatype
            )));
        }

        let grid_axes = match (self.block_type, self.grid_axes) {
            (BlockType::PointMesh, axes) => {
                if shape.ndims() != 1 {
                    return Err(invalid(format!(
                        "point mesh '{}' must be indexed by particle along one axis",
                        self.id
                    )));
                }
                let axes = axes.unwrap_or(1);
                if !(1..=MAX_DIMS).contains(&axes) {
                    return Err(invalid(format!(
                        "point mesh '{}': {} spatial axes, expected 1 to {}",
                        self.id, axes, MAX_DIMS
                    )));
                }
                axes
            }
            (BlockType::PlainMesh, None) => shape.ndims(),
            (BlockType::PlainMesh, Some(axes)) if axes == shape.ndims() => axes,
            (_, None) => 0,
            (_, Some(axes)) => {
                return Err(invalid(format!(
                    "block '{}' cannot carry {} coordinate arrays",
                    self.id, axes
                )));
            }
        };

        let expected = self.aux_len();
        for (what, len) in [
            ("variable_ids", self.variable_ids.len()),
            ("material_names", self.material_names.len()),
        ] {
            if len != 0 && len != expected {
                return Err(invalid(format!(
                    "block '{}': {} has {} entries, expected {}",
                    self.id, what, len, expected
                )));
            }
        }

        Ok(Block {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            mesh_id: self.mesh_id,
            material_id: self.material_id,
            block_type: self.block_type,
            datatype: self.datatype,
            datatype_out: self.datatype,
            shape,
            grid_axes,
            stagger: self.stagger,
            data_location: self.data_location,
            variable_ids: self.variable_ids,
            material_names: self.material_names,
            decomposition: None,
            data: Payload::Empty,
            grids: Vec::new(),
            node_list: None,
            boundary_cells: None,
        })
    }
}

fn invalid(message: String) -> SdfIoError {
    SdfIoError::InvalidBlock { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let block = BlockBuilder::new("rho", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[10, 10])
            .build()
            .unwrap();

        assert_eq!(block.id(), "rho");
        assert_eq!(block.name(), "rho");
        assert_eq!(block.shape().ndims(), 2);
        assert_eq!(block.datatype_out(), Datatype::Real8);
        assert!(block.decomposition().is_none());
        assert!(!block.is_materialized());
    }

    #[test]
    fn test_builder_rejects_bad_shape() {
        let no_dims = BlockBuilder::new("a", BlockType::Array, Datatype::Real4).build();
        assert!(matches!(no_dims, Err(SdfIoError::InvalidBlock { .. })));

        let zero = BlockBuilder::new("a", BlockType::Array, Datatype::Real4)
            .dims(&[4, 0])
            .build();
        assert!(matches!(zero, Err(SdfIoError::InvalidBlock { .. })));

        let four = BlockBuilder::new("a", BlockType::Array, Datatype::Real4)
            .dims(&[2, 2, 2, 2])
            .build();
        assert!(matches!(four, Err(SdfIoError::InvalidBlock { .. })));
    }

    #[test]
    fn test_builder_rejects_sizeless_datatype() {
        let result = BlockBuilder::new("a", BlockType::PlainVariable, Datatype::Null)
            .dims(&[4])
            .build();
        assert!(matches!(result, Err(SdfIoError::InvalidBlock { .. })));

        // Opaque blocks may carry any type.
        assert!(BlockBuilder::new("a", BlockType::Other, Datatype::Other)
            .dims(&[4])
            .build()
            .is_ok());
    }

    #[test]
    fn test_grid_axes_by_block_type() {
        let mesh = BlockBuilder::new("grid", BlockType::PlainMesh, Datatype::Real8)
            .dims(&[4, 5, 6])
            .build()
            .unwrap();
        assert_eq!(mesh.grid_axes(), 3);

        let field = BlockBuilder::new("ex", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[4, 5])
            .build()
            .unwrap();
        assert_eq!(field.grid_axes(), 0);

        let particles = BlockBuilder::new("electrons", BlockType::PointMesh, Datatype::Real8)
            .dims(&[1000])
            .build()
            .unwrap();
        assert_eq!(particles.grid_axes(), 1);

        let particles = BlockBuilder::new("electrons", BlockType::PointMesh, Datatype::Real8)
            .dims(&[1000])
            .grid_axes(3)
            .build()
            .unwrap();
        assert_eq!(particles.grid_axes(), 3);
        assert_eq!(particles.shape().dims(), &[1000]);
    }

    #[test]
    fn test_grid_axes_rejected() {
        let cases = [
            BlockBuilder::new("p", BlockType::PointMesh, Datatype::Real8)
                .dims(&[10])
                .grid_axes(4),
            BlockBuilder::new("p", BlockType::PointMesh, Datatype::Real8)
                .dims(&[10])
                .grid_axes(0),
            BlockBuilder::new("p", BlockType::PointMesh, Datatype::Real8).dims(&[10, 10]),
            BlockBuilder::new("g", BlockType::PlainMesh, Datatype::Real8)
                .dims(&[4, 4])
                .grid_axes(3),
            BlockBuilder::new("ex", BlockType::PlainVariable, Datatype::Real8)
                .dims(&[4, 4])
                .grid_axes(2),
        ];
        for builder in cases {
            assert!(matches!(builder.build(), Err(SdfIoError::InvalidBlock { .. })));
        }
    }

    #[test]
    fn test_aux_arrays_sized_by_ndims() {
        let ok = BlockBuilder::new("mat", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[8, 8])
            .variable_ids(["vfrac/a", "vfrac/b"])
            .material_names(["Air", "Water"])
            .build()
            .unwrap();
        assert_eq!(ok.variable_ids().len(), 2);
        assert_eq!(ok.material_names()[1], "Water");

        let bad = BlockBuilder::new("mat", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[8, 8])
            .variable_ids(["only-one"])
            .build();
        assert!(matches!(bad, Err(SdfIoError::InvalidBlock { .. })));
    }

    #[test]
    fn test_aux_arrays_sized_by_n_ids() {
        let builder = BlockBuilder::new("mat", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[8, 8])
            .n_ids(3)
            .material_names(["A", "B", "C"]);
        assert_eq!(builder.aux_len(), 3);
        assert!(builder.build().is_ok());
    }
}
