//! Block records: one named data unit of an SDF file.

use sdf_core::{DomainExtents, Shape, SplitFactors, Stagger};

use super::payload::{Payload, ReleaseSummary};

/// Numeric type codes used in SDF block headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum Datatype {
    /// No data.
    #[default]
    Null = 0,
    /// 4-byte signed integer.
    Integer4 = 1,
    /// 8-byte signed integer.
    Integer8 = 2,
    /// 4-byte float.
    Real4 = 3,
    /// 8-byte float.
    Real8 = 4,
    /// 16-byte float.
    Real16 = 5,
    /// Single byte character.
    Character = 6,
    /// Single byte boolean.
    Logical = 7,
    /// Opaque data.
    Other = 8,
}

impl Datatype {
    /// Decode a header type code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Null,
            1 => Self::Integer4,
            2 => Self::Integer8,
            3 => Self::Real4,
            4 => Self::Real8,
            5 => Self::Real16,
            6 => Self::Character,
            7 => Self::Logical,
            8 => Self::Other,
            _ => return None,
        })
    }

    /// Header type code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Size of one element in bytes. Zero for types with no fixed size.
    pub const fn type_size(self) -> usize {
        match self {
            Self::Null | Self::Other => 0,
            Self::Character | Self::Logical => 1,
            Self::Integer4 | Self::Real4 => 4,
            Self::Integer8 | Self::Real8 => 8,
            Self::Real16 => 16,
        }
    }
}

/// Kind of block, as far as payload handling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Structured mesh: one coordinate array per axis.
    PlainMesh,
    /// Particle positions: one coordinate array per axis.
    PointMesh,
    /// Field defined on a plain mesh.
    PlainVariable,
    /// Per-particle quantity.
    PointVariable,
    /// Single value.
    Constant,
    /// Free-standing array.
    Array,
    /// Any block without a payload model here.
    Other,
}

impl BlockType {
    /// True for blocks whose payload is per-axis coordinate arrays.
    #[inline]
    pub const fn is_mesh(self) -> bool {
        matches!(self, Self::PlainMesh | Self::PointMesh)
    }
}

/// Result of splitting a block across the ranks of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposition {
    split: SplitFactors,
    extents: Option<DomainExtents>,
}

impl Decomposition {
    /// Decomposition in which this rank owns `extents`.
    pub fn active(split: SplitFactors, extents: DomainExtents) -> Self {
        Self {
            split,
            extents: Some(extents),
        }
    }

    /// Decomposition in which this rank owns nothing.
    pub fn idle(split: SplitFactors) -> Self {
        Self {
            split,
            extents: None,
        }
    }

    /// Per-axis split factors.
    #[inline]
    pub fn split(&self) -> &SplitFactors {
        &self.split
    }

    /// This rank's sub-domain, or `None` for an idle rank.
    #[inline]
    pub fn extents(&self) -> Option<&DomainExtents> {
        self.extents.as_ref()
    }

    /// True if the rank was left without a sub-domain.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.extents.is_none()
    }

    /// Number of local elements.
    pub fn nlocal(&self) -> u64 {
        self.extents.as_ref().map_or(0, DomainExtents::local_count)
    }
}

/// One block attached to a file handle.
///
/// Shape metadata is fixed at construction. Payloads and the decomposition
/// are filled in lazily and can be released and re-materialized.
#[derive(Debug)]
pub struct Block<'a> {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) mesh_id: Option<String>,
    pub(crate) material_id: Option<String>,
    pub(crate) block_type: BlockType,
    pub(crate) datatype: Datatype,
    pub(crate) datatype_out: Datatype,
    pub(crate) shape: Shape,
    pub(crate) grid_axes: usize,
    pub(crate) stagger: Stagger,
    pub(crate) data_location: u64,
    pub(crate) variable_ids: Vec<String>,
    pub(crate) material_names: Vec<String>,
    pub(crate) decomposition: Option<Decomposition>,
    pub(crate) data: Payload<'a>,
    pub(crate) grids: Vec<Payload<'a>>,
    pub(crate) node_list: Option<Vec<i64>>,
    pub(crate) boundary_cells: Option<Vec<i64>>,
}

impl<'a> Block<'a> {
    /// Unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the mesh this block lives on.
    pub fn mesh_id(&self) -> Option<&str> {
        self.mesh_id.as_deref()
    }

    /// Identifier of the associated material.
    pub fn material_id(&self) -> Option<&str> {
        self.material_id.as_deref()
    }

    /// Kind of block.
    #[inline]
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Element type as stored in the file.
    #[inline]
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Element type of the materialized payload.
    #[inline]
    pub fn datatype_out(&self) -> Datatype {
        self.datatype_out
    }

    /// Size of one materialized element in bytes.
    #[inline]
    pub fn type_size_out(&self) -> usize {
        self.datatype_out.type_size()
    }

    /// Global shape.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of coordinate arrays: one per spatial axis for a mesh, zero
    /// for anything else.
    ///
    /// A point mesh's shape counts particles, so its spatial dimension is
    /// carried here rather than in the shape.
    #[inline]
    pub fn grid_axes(&self) -> usize {
        self.grid_axes
    }

    /// Sample placement within cells.
    #[inline]
    pub fn stagger(&self) -> Stagger {
        self.stagger
    }

    /// Byte offset of the payload within the file.
    #[inline]
    pub fn data_location(&self) -> u64 {
        self.data_location
    }

    /// Component variable identifiers.
    pub fn variable_ids(&self) -> &[String] {
        &self.variable_ids
    }

    /// Material names, parallel to `variable_ids`.
    pub fn material_names(&self) -> &[String] {
        &self.material_names
    }

    /// This rank's decomposition, if `factor` has run.
    #[inline]
    pub fn decomposition(&self) -> Option<&Decomposition> {
        self.decomposition.as_ref()
    }

    /// The data payload.
    #[inline]
    pub fn data_payload(&self) -> &Payload<'a> {
        &self.data
    }

    /// The coordinate payload for `axis`, if the block has grids.
    pub fn grid_payload(&self, axis: usize) -> Option<&Payload<'a>> {
        self.grids.get(axis)
    }

    /// True once the data or any grid has been loaded.
    pub fn is_materialized(&self) -> bool {
        self.data.is_materialized() || self.grids.iter().any(Payload::is_materialized)
    }

    /// Node list of an unstructured block.
    pub fn node_list(&self) -> Option<&[i64]> {
        self.node_list.as_deref()
    }

    /// Attach a node list; released together with the payload.
    pub fn set_node_list(&mut self, nodes: Vec<i64>) {
        self.node_list = Some(nodes);
    }

    /// Boundary cell list.
    pub fn boundary_cells(&self) -> Option<&[i64]> {
        self.boundary_cells.as_deref()
    }

    /// Attach a boundary cell list; released together with the payload.
    pub fn set_boundary_cells(&mut self, cells: Vec<i64>) {
        self.boundary_cells = Some(cells);
    }

    /// Release the payload buffers and auxiliary lists.
    ///
    /// Shape metadata and the decomposition are kept, so the block can be
    /// loaded again. Repeated calls are no-ops.
    pub fn release_payload(&mut self) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        summary.record(self.data.release());
        for grid in &mut self.grids {
            summary.record(grid.release());
        }
        self.grids.clear();

        for list in [self.node_list.take(), self.boundary_cells.take()]
            .into_iter()
            .flatten()
        {
            summary.freed_buffers += 1;
            summary.freed_bytes += list.len() * std::mem::size_of::<i64>();
        }

        // Narrowing only describes the released buffer.
        self.datatype_out = self.datatype;
        summary
    }

    /// Release the payload and every metadata buffer, consuming the block.
    pub fn destroy(mut self) -> ReleaseSummary {
        let summary = self.release_payload();
        log::debug!("destroyed block '{}'", self.id);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::builder::BlockBuilder;
    use crate::memory::payload::{Ownership, PayloadRelease};

    fn variable<'a>() -> Block<'a> {
        BlockBuilder::new("ex", BlockType::PlainVariable, Datatype::Real8)
            .dims(&[4, 2])
            .build()
            .unwrap()
    }

    #[test]
    fn test_datatype_sizes() {
        assert_eq!(Datatype::Real8.type_size(), 8);
        assert_eq!(Datatype::Real4.type_size(), 4);
        assert_eq!(Datatype::Integer8.type_size(), 8);
        assert_eq!(Datatype::Real16.type_size(), 16);
        assert_eq!(Datatype::Logical.type_size(), 1);
        assert_eq!(Datatype::Null.type_size(), 0);
    }

    #[test]
    fn test_datatype_codes() {
        for code in 0..9 {
            assert_eq!(Datatype::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Datatype::from_code(9), None);
    }

    #[test]
    fn test_block_type_is_mesh() {
        assert!(BlockType::PlainMesh.is_mesh());
        assert!(BlockType::PointMesh.is_mesh());
        assert!(!BlockType::PlainVariable.is_mesh());
        assert!(!BlockType::Array.is_mesh());
    }

    #[test]
    fn test_idle_decomposition() {
        let split = SplitFactors::new(&[2, 3]).unwrap();
        let dec = Decomposition::idle(split);
        assert!(dec.is_idle());
        assert_eq!(dec.nlocal(), 0);
        assert_eq!(dec.split().product(), 6);
    }

    #[test]
    fn test_release_payload_keeps_metadata() {
        let mut block = variable();
        block.data = Payload::Owned(vec![0; 64]);
        block.set_node_list(vec![1, 2, 3]);
        block.datatype_out = Datatype::Real4;

        let summary = block.release_payload();
        assert_eq!(summary.freed_buffers, 2);
        assert_eq!(summary.freed_bytes, 64 + 24);
        assert!(!block.is_materialized());
        assert!(block.node_list().is_none());
        assert_eq!(block.datatype_out(), Datatype::Real8);
        assert_eq!(block.shape().dims(), &[4, 2]);

        assert!(block.release_payload().is_empty());
    }

    #[test]
    fn test_release_mixed_ownership() {
        let mut caller = vec![0u8; 8];
        let mut block = variable();
        block.data = Payload::Borrowed(&mut caller);
        block.grids = vec![Payload::Owned(vec![0; 16]), Payload::Mapped(0..8)];

        assert_eq!(block.data_payload().ownership(), Some(Ownership::Borrowed));
        let summary = block.release_payload();
        assert_eq!(summary.freed_buffers, 1);
        assert_eq!(summary.freed_bytes, 16);
        assert_eq!(summary.detached, 2);
        assert_eq!(block.data.release(), PayloadRelease::AlreadyReleased);
    }

    #[test]
    fn test_destroy() {
        let mut block = variable();
        block.data = Payload::Owned(vec![0; 32]);
        let summary = block.destroy();
        assert_eq!(summary.freed_bytes, 32);
    }
}
