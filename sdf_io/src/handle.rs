//! File handle: the session that owns a byte stream and its blocks.

use std::mem;
use std::ops::Range;
use std::path::Path;

use sdf_core::{decompose, extents, DomainExtents, SdfCoreError, Shape, SplitFactors};

use crate::config::FileConfig;
use crate::error::{CloseError, Result, SdfIoError};
use crate::memory::{
    allocate, Block, BlockType, Decomposition, Ownership, Payload, ReleaseSummary,
};
use crate::transport::{ByteStream, FileMapping, FileStream};

/// An open SDF file.
///
/// The handle exclusively owns its byte stream, its block list and, outside
/// a distributed job, a read-only mapping of the file. Payloads loaded
/// through the handle may borrow caller buffers for `'a`.
///
/// # Lifecycle
///
/// ```text
/// open ─► attach ─► factor ─► load_* ─► release_payload ─► fclose ─► close
///                     ▲                        │
///                     └────────────────────────┘
/// ```
///
/// Once the stream is closed every destructive operation reports `NotOpen`.
/// Dropping the handle frees whatever it still owns.
#[derive(Debug)]
pub struct FileHandle<'a> {
    pub(crate) config: FileConfig,
    pub(crate) stream: Option<Box<dyn ByteStream>>,
    // Declared before `mapping` so blocks are dropped first.
    pub(crate) blocks: Vec<Block<'a>>,
    pub(crate) mapping: Option<FileMapping>,
}

impl<'a> FileHandle<'a> {
    /// Open the file at `path`.
    ///
    /// # Errors
    /// - `InvalidConfig` if the rank layout is inconsistent
    /// - `Io` if the file cannot be opened or mapped
    pub fn open<P: AsRef<Path>>(path: P, config: FileConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let stream = FileStream::open(path)?;
        log::info!("opening SDF file {}", path.display());
        Self::from_stream(Box::new(stream), config)
    }

    /// Wrap an already open byte stream.
    pub fn from_stream(stream: Box<dyn ByteStream>, config: FileConfig) -> Result<Self> {
        config.validate()?;

        let mapping = if config.mapping_enabled() {
            let len = stream.size()?;
            stream.map(len)?
        } else {
            if config.use_mmap {
                log::warn!(
                    "memory mapping disabled in a distributed job ({} ranks)",
                    config.ncpus
                );
            }
            None
        };

        log::info!(
            "SDF handle ready: rank {}/{}, mapped {}",
            config.rank,
            config.ncpus,
            mapping.is_some()
        );

        Ok(Self {
            config,
            stream: Some(stream),
            blocks: Vec::new(),
            mapping,
        })
    }

    /// Open options in effect.
    #[inline]
    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// This process's rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.config.rank
    }

    /// Number of ranks in the job.
    #[inline]
    pub fn ncpus(&self) -> usize {
        self.config.ncpus
    }

    /// Rank with single-writer duties.
    #[inline]
    pub fn rank_master(&self) -> usize {
        self.config.rank_master
    }

    /// Number of attached blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// True while the byte stream is open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// True if payloads can be served from a file mapping.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// All attached blocks, in attach order.
    pub fn blocks(&self) -> &[Block<'a>] {
        &self.blocks
    }

    /// The block at `index`.
    pub fn block(&self, index: usize) -> Result<&Block<'a>> {
        self.blocks.get(index).ok_or(SdfIoError::BlockNotFound {
            index,
            count: self.blocks.len(),
        })
    }

    /// Mutable access to the block at `index`.
    pub fn block_mut(&mut self, index: usize) -> Result<&mut Block<'a>> {
        let count = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or(SdfIoError::BlockNotFound { index, count })
    }

    /// Change the master rank.
    pub fn set_rank_master(&mut self, rank_master: usize) -> Result<()> {
        let config = self.config.with_rank_master(rank_master);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Change the number of ranks sharing the file.
    ///
    /// Stored decompositions and loaded payloads describe the old job, so
    /// both are discarded; run `factor` again before loading. A master rank
    /// that no longer exists falls back to rank 0. The file mapping is only
    /// held while the job runs on a single rank.
    ///
    /// # Errors
    /// - `InvalidConfig` if this handle's rank is not below `ncpus`
    /// - `Io` if the file cannot be mapped again
    ///
    /// The handle is unchanged on error.
    pub fn set_ncpus(&mut self, ncpus: usize) -> Result<ReleaseSummary> {
        let mut config = FileConfig { ncpus, ..self.config };
        if config.rank_master >= ncpus {
            config.rank_master = 0;
        }
        config.validate()?;

        let remap = match self.stream.as_deref() {
            Some(stream) if config.mapping_enabled() && self.mapping.is_none() => {
                stream.map(stream.size()?)?
            }
            _ => None,
        };

        if config.rank_master != self.config.rank_master {
            log::warn!(
                "master rank {} does not exist with {} ranks, using rank 0",
                self.config.rank_master,
                ncpus
            );
        }

        let mut total = ReleaseSummary::default();
        for block in &mut self.blocks {
            total.merge(block.release_payload());
            block.decomposition = None;
        }
        // Mapped payloads were detached above.
        if !config.mapping_enabled() && self.mapping.take().is_some() {
            log::warn!("memory mapping dropped: job now spans {} ranks", ncpus);
        }
        if remap.is_some() {
            self.mapping = remap;
        }
        self.config = config;

        log::debug!(
            "job resized to {} ranks: {} bytes freed, {} payloads detached",
            ncpus,
            total.freed_bytes,
            total.detached
        );
        Ok(total)
    }

    /// Append a block; the handle takes ownership. Returns its index.
    pub fn attach(&mut self, block: Block<'a>) -> Result<usize> {
        self.ensure_open()?;
        log::debug!("attaching block '{}' at {}", block.id(), self.blocks.len());
        self.blocks.push(block);
        Ok(self.blocks.len() - 1)
    }

    /// Release one block's payload, keeping its metadata.
    pub fn release_payload(&mut self, index: usize) -> Result<ReleaseSummary> {
        self.ensure_open()?;
        let block = self.block_mut(index)?;
        let summary = block.release_payload();
        log::debug!(
            "released payload of '{}': {} freed ({} bytes), {} detached",
            block.id(),
            summary.freed_buffers,
            summary.freed_bytes,
            summary.detached
        );
        Ok(summary)
    }

    /// Release every block's payload while keeping the handle open.
    pub fn release_all_payloads(&mut self) -> Result<ReleaseSummary> {
        self.ensure_open()?;
        let mut total = ReleaseSummary::default();
        for block in &mut self.blocks {
            total.merge(block.release_payload());
        }
        log::debug!(
            "released all payloads: {} bytes freed across {} blocks",
            total.freed_bytes,
            self.blocks.len()
        );
        Ok(total)
    }

    /// Remove a block and free everything it owns.
    ///
    /// Later blocks shift down by one index.
    pub fn destroy_block(&mut self, index: usize) -> Result<ReleaseSummary> {
        self.ensure_open()?;
        if index >= self.blocks.len() {
            return Err(SdfIoError::BlockNotFound {
                index,
                count: self.blocks.len(),
            });
        }
        Ok(self.blocks.remove(index).destroy())
    }

    /// Close the byte stream, running the transport's barrier first.
    ///
    /// Blocks and the mapping stay alive. If the barrier fails the stream
    /// is kept open.
    pub fn fclose(&mut self) -> Result<()> {
        let mut stream = self.stream.take().ok_or(SdfIoError::NotOpen)?;
        if let Err(e) = stream.barrier() {
            self.stream = Some(stream);
            return Err(e.into());
        }
        stream.close()?;
        log::debug!("byte stream closed on rank {}", self.config.rank);
        Ok(())
    }

    /// Close the stream, destroy every block, then drop the mapping.
    ///
    /// # Errors
    /// If the stream cannot be closed the handle is handed back inside the
    /// [`CloseError`] with its blocks and mapping intact. After a failed
    /// barrier the stream is still open and the close can be retried.
    #[allow(clippy::result_large_err)]
    pub fn close(mut self) -> std::result::Result<ReleaseSummary, CloseError<'a>> {
        if let Err(error) = self.fclose() {
            return Err(CloseError {
                error,
                handle: self,
            });
        }

        let mut total = ReleaseSummary::default();
        for block in mem::take(&mut self.blocks) {
            total.merge(block.destroy());
        }
        // Every mapped payload has been detached above.
        drop(self.mapping.take());

        log::info!(
            "SDF handle closed: {} bytes freed, {} payloads detached",
            total.freed_bytes, total.detached
        );
        Ok(total)
    }

    /// Split block `index` across the job and record this rank's share.
    ///
    /// A single-rank job owns the whole block. Otherwise the split is chosen
    /// on the cell-centred shape and this rank's extents are derived from it.
    /// Ranks beyond the product of the split factors are left idle.
    ///
    /// # Errors
    /// - `BlockNotFound` for a bad index
    /// - `Core` if the decomposition inputs are invalid; the block is unchanged
    pub fn factor(&mut self, index: usize) -> Result<&Decomposition> {
        let FileConfig { rank, ncpus, .. } = self.config;
        let block = self.block_mut(index)?;
        let shape = block.shape;
        let stagger = block.stagger;

        let decomposition = if ncpus == 1 {
            Decomposition::active(
                SplitFactors::unsplit(shape.ndims()),
                DomainExtents::whole(&shape),
            )
        } else {
            let split = decompose(ncpus, &shape.cell_centred(stagger))?;
            match extents(rank, &shape, &split, stagger) {
                Ok(ext) => Decomposition::active(split, ext),
                Err(SdfCoreError::RankOutOfRange { active_ranks, .. }) => {
                    log::warn!(
                        "rank {} idle for block '{}': only {} of {} ranks used",
                        rank,
                        block.id(),
                        active_ranks,
                        ncpus
                    );
                    Decomposition::idle(split)
                }
                Err(e) => return Err(e.into()),
            }
        };

        log::debug!(
            "factored '{}' as {:?}: {} local elements",
            block.id(),
            decomposition.split().as_slice(),
            decomposition.nlocal()
        );
        Ok(block.decomposition.insert(decomposition))
    }

    /// Extents of any `rank` for an already factored block.
    ///
    /// Does not modify the block.
    pub fn domain_extents(&self, index: usize, rank: usize) -> Result<DomainExtents> {
        let block = self.block(index)?;
        let decomposition = block
            .decomposition
            .as_ref()
            .ok_or(SdfIoError::NotDecomposed { index })?;
        Ok(extents(rank, &block.shape, decomposition.split(), block.stagger)?)
    }

    /// Materialize this rank's slice of block `index`'s data.
    ///
    /// A mapped handle hands out a view of the mapping when the rank owns
    /// the whole block. Otherwise a heap buffer is filled from the stream.
    /// Does nothing if the data is already loaded.
    pub fn load_data(&mut self, index: usize) -> Result<Ownership> {
        self.ensure_open()?;
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(SdfIoError::BlockNotFound { index, count })?;
        reject_mesh(block)?;
        let region = local_region(block, index)?;
        if let Some(ownership) = block.data.ownership() {
            return Ok(ownership);
        }
        let type_size = block.datatype.type_size();
        let location = block.data_location;

        let mapped = mapped_range(
            self.mapping.as_ref(),
            location,
            &block.shape,
            region.as_ref(),
            type_size,
        )?;
        let payload = match mapped {
            Some(range) => Payload::Mapped(range),
            None => {
                let mut buf = allocate(region_bytes(region.as_ref(), type_size)?)?;
                let stream = self.stream.as_deref_mut().ok_or(SdfIoError::NotOpen)?;
                read_region(stream, location, &block.shape, region.as_ref(), type_size, &mut buf)?;
                Payload::Owned(buf)
            }
        };

        let ownership = payload.ownership().unwrap_or(Ownership::Owned);
        log::debug!(
            "loaded data of '{}': {} bytes, {:?}",
            block.id(),
            payload.len(),
            ownership
        );
        block.data = payload;
        Ok(ownership)
    }

    /// Materialize this rank's slice of block `index`'s data into `buf`.
    ///
    /// The payload is recorded as `Borrowed` and is never freed by the
    /// handle. A previously loaded payload is released first.
    ///
    /// # Errors
    /// - `BufferTooSmall` if `buf` cannot hold the local slice
    pub fn load_data_into(&mut self, index: usize, buf: &'a mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(SdfIoError::BlockNotFound { index, count })?;
        reject_mesh(block)?;
        let region = local_region(block, index)?;
        let type_size = block.datatype.type_size();
        let required = region_bytes(region.as_ref(), type_size)?;
        if buf.len() < required {
            return Err(SdfIoError::BufferTooSmall {
                required,
                provided: buf.len(),
            });
        }

        let buf = &mut buf[..required];
        let stream = self.stream.as_deref_mut().ok_or(SdfIoError::NotOpen)?;
        read_region(
            stream,
            block.data_location,
            &block.shape,
            region.as_ref(),
            type_size,
            buf,
        )?;

        block.data.release();
        block.datatype_out = block.datatype;
        block.data = Payload::Borrowed(buf);
        log::debug!("loaded data of '{}' into caller buffer", block.id());
        Ok(required)
    }

    /// Materialize this rank's slice of each coordinate array of a mesh.
    ///
    /// Axis arrays are stored back to back from the block's data location.
    /// A plain mesh array holds one entry per sample along its axis. Every
    /// array of a point mesh holds one entry per particle.
    pub fn load_grids(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(SdfIoError::BlockNotFound { index, count })?;
        if !block.block_type.is_mesh() {
            return Err(SdfIoError::InvalidBlock {
                message: format!("block '{}' is not a mesh", block.id()),
            });
        }
        let region = local_region(block, index)?;
        if block.grids.iter().any(Payload::is_materialized) {
            return Ok(());
        }
        let type_size = block.datatype.type_size();
        let point_mesh = block.block_type == BlockType::PointMesh;

        let mut grids = Vec::with_capacity(block.grid_axes);
        let mut location = block.data_location;
        for axis in 0..block.grid_axes {
            // Point mesh arrays are all indexed by particle.
            let source = if point_mesh { 0 } else { axis };
            let axis_shape = Shape::new(&[block.shape.dim(source)])?;
            let axis_region = region.as_ref().map(|ext| {
                let mut one = DomainExtents::whole(&axis_shape);
                one.start[0] = ext.start[source];
                one.local[0] = ext.local[source];
                one
            });

            let mapped = mapped_range(
                self.mapping.as_ref(),
                location,
                &axis_shape,
                axis_region.as_ref(),
                type_size,
            )?;
            let payload = match mapped {
                Some(range) => Payload::Mapped(range),
                None => {
                    let mut buf = allocate(region_bytes(axis_region.as_ref(), type_size)?)?;
                    let stream = self.stream.as_deref_mut().ok_or(SdfIoError::NotOpen)?;
                    let region = axis_region.as_ref();
                    read_region(stream, location, &axis_shape, region, type_size, &mut buf)?;
                    Payload::Owned(buf)
                }
            };
            grids.push(payload);
            location += axis_shape.dim(0) * type_size as u64;
        }

        log::debug!("loaded {} grid arrays of '{}'", grids.len(), block.id());
        block.grids = grids;
        Ok(())
    }

    /// Bytes of block `index`'s data, whatever owns them.
    pub fn data(&self, index: usize) -> Result<&[u8]> {
        self.block(index)?
            .data
            .bytes(self.mapping.as_ref())
            .ok_or(SdfIoError::NotMaterialized { index })
    }

    /// Bytes of block `index`'s coordinate array along `axis`.
    pub fn grid(&self, index: usize, axis: usize) -> Result<&[u8]> {
        self.block(index)?
            .grids
            .get(axis)
            .and_then(|grid| grid.bytes(self.mapping.as_ref()))
            .ok_or(SdfIoError::NotMaterialized { index })
    }

    #[inline]
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.stream.is_some() {
            Ok(())
        } else {
            Err(SdfIoError::NotOpen)
        }
    }
}

fn reject_mesh(block: &Block<'_>) -> Result<()> {
    if block.block_type.is_mesh() {
        return Err(SdfIoError::InvalidBlock {
            message: format!("mesh block '{}' stores grids, not data", block.id()),
        });
    }
    Ok(())
}

/// This rank's extents for the block, `None` when the rank is idle.
fn local_region(block: &Block<'_>, index: usize) -> Result<Option<DomainExtents>> {
    let decomposition = block
        .decomposition
        .as_ref()
        .ok_or(SdfIoError::NotDecomposed { index })?;
    Ok(decomposition.extents().copied())
}

fn region_bytes(region: Option<&DomainExtents>, type_size: usize) -> Result<usize> {
    to_bytes(region.map_or(0, DomainExtents::local_count), type_size)
}

fn to_bytes(elements: u64, type_size: usize) -> Result<usize> {
    usize::try_from(elements)
        .ok()
        .and_then(|n| n.checked_mul(type_size))
        .ok_or(SdfIoError::AllocationFailure { bytes: usize::MAX })
}

/// Range of the mapping holding the whole array, if the rank owns all of it
/// and the mapping covers it.
fn mapped_range(
    mapping: Option<&FileMapping>,
    location: u64,
    shape: &Shape,
    region: Option<&DomainExtents>,
    type_size: usize,
) -> Result<Option<Range<usize>>> {
    let (Some(mapping), Some(ext)) = (mapping, region) else {
        return Ok(None);
    };
    if ext.local_count() != shape.total() {
        return Ok(None);
    }
    let Ok(start) = usize::try_from(location) else {
        return Ok(None);
    };
    let len = to_bytes(shape.total(), type_size)?;
    let range = start..start.saturating_add(len);
    Ok(mapping.view(range.clone()).map(|_| range))
}

/// Read the local sub-array into `out`, one contiguous run along axis 0 at a
/// time. Axis 0 varies fastest in the file.
///
/// `out` must hold exactly the region's bytes.
fn read_region(
    stream: &mut dyn ByteStream,
    location: u64,
    shape: &Shape,
    region: Option<&DomainExtents>,
    type_size: usize,
    out: &mut [u8],
) -> Result<()> {
    let Some(ext) = region else {
        return Ok(());
    };
    if out.is_empty() {
        return Ok(());
    }

    let [nx, ny, _] = shape.padded();
    let [sx, sy, sz] = ext.start;
    let [lx, ly, lz] = ext.local;
    let ts = type_size as u64;

    // Whole planes are contiguous in the file.
    if lx == nx && ly == ny {
        stream.read_at(location + sz * nx * ny * ts, out)?;
        return Ok(());
    }

    let row = to_bytes(lx, type_size)?;
    let firsts = (0..lz).flat_map(|k| (0..ly).map(move |j| sx + nx * ((sy + j) + ny * (sz + k))));
    for (dest, first) in out.chunks_exact_mut(row).zip(firsts) {
        stream.read_at(location + first * ts, dest)?;
    }
    Ok(())
}
