//! Open options for an SDF file handle.

use crate::error::{Result, SdfIoError};

/// Default length of fixed-size strings in block metadata.
pub const DEFAULT_STRING_LENGTH: usize = 64;

/// Options fixed when a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileConfig {
    /// This process's rank within the parallel job.
    pub rank: usize,
    /// Number of ranks in the parallel job.
    pub ncpus: usize,
    /// Rank that performs single-writer duties.
    pub rank_master: usize,
    /// Serve payloads from a read-only memory mapping when possible.
    pub use_mmap: bool,
    /// Narrow 8-byte float payloads to 4-byte floats on request.
    pub use_float: bool,
    /// Read block metadata from the summary section.
    pub use_summary: bool,
    /// Length of fixed-size metadata strings.
    pub string_length: usize,
}

impl FileConfig {
    /// Options for `rank` out of `ncpus` ranks.
    #[inline]
    pub const fn new(rank: usize, ncpus: usize) -> Self {
        Self {
            rank,
            ncpus,
            rank_master: 0,
            use_mmap: false,
            use_float: false,
            use_summary: true,
            string_length: DEFAULT_STRING_LENGTH,
        }
    }

    /// Options for a single-process reader.
    #[inline]
    pub const fn serial() -> Self {
        Self::new(0, 1)
    }

    /// Request memory-mapped payloads.
    pub const fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Request reduced-precision output for 8-byte float payloads.
    pub const fn with_float(mut self, use_float: bool) -> Self {
        self.use_float = use_float;
        self
    }

    /// Set the master rank.
    pub const fn with_rank_master(mut self, rank_master: usize) -> Self {
        self.rank_master = rank_master;
        self
    }

    /// Toggle use of the summary section.
    pub const fn with_summary(mut self, use_summary: bool) -> Self {
        self.use_summary = use_summary;
        self
    }

    /// True when more than one rank shares the file.
    #[inline]
    pub const fn is_distributed(&self) -> bool {
        self.ncpus > 1
    }

    /// Mapping is only used outside a distributed job.
    #[inline]
    pub const fn mapping_enabled(&self) -> bool {
        self.use_mmap && !self.is_distributed()
    }

    /// Validate the rank layout.
    pub fn validate(&self) -> Result<()> {
        if self.ncpus == 0 {
            return Err(SdfIoError::InvalidConfig {
                message: "ncpus must be positive".to_string(),
            });
        }
        if self.rank >= self.ncpus {
            return Err(SdfIoError::InvalidConfig {
                message: format!("rank {} out of range for {} ranks", self.rank, self.ncpus),
            });
        }
        if self.rank_master >= self.ncpus {
            return Err(SdfIoError::InvalidConfig {
                message: format!(
                    "master rank {} out of range for {} ranks",
                    self.rank_master, self.ncpus
                ),
            });
        }
        Ok(())
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self::serial()
    }
}
