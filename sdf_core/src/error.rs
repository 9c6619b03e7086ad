//! Error types for sdf_core operations.
//!
//! A plain enum with no external dependencies so the crate stays no_std.

use core::fmt;

/// Errors reported by the decomposition and extent algorithms.
///
/// These describe invalid inputs. They are programming errors on the caller's
/// side and are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdfCoreError {
    /// The rank count, a split factor or an axis length is unusable.
    InvalidRankConfiguration {
        /// What was wrong with the configuration.
        message: &'static str,
    },
    /// Only 1, 2 and 3 axes can be decomposed.
    UnsupportedDimensionality {
        /// The number of axes that was requested.
        ndims: usize,
    },
    /// The rank lies outside the set of ranks that received a sub-domain.
    RankOutOfRange {
        /// The rank that was asked about.
        rank: usize,
        /// Product of the split factors (number of ranks holding data).
        active_ranks: usize,
    },
}

impl fmt::Display for SdfCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdfCoreError::InvalidRankConfiguration { message } => {
                write!(f, "invalid rank configuration: {}", message)
            }
            SdfCoreError::UnsupportedDimensionality { ndims } => {
                write!(f, "unsupported dimensionality: {} axes (expected 1 to 3)", ndims)
            }
            SdfCoreError::RankOutOfRange { rank, active_ranks } => {
                write!(
                    f,
                    "rank {} is outside the {} ranks holding a sub-domain",
                    rank, active_ranks
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SdfCoreError {}

/// Result type alias for sdf_core operations.
pub type Result<T> = core::result::Result<T, SdfCoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "std")]
    #[test]
    fn test_error_display() {
        use std::format;

        let err = SdfCoreError::InvalidRankConfiguration {
            message: "rank count must be positive",
        };
        assert_eq!(
            format!("{}", err),
            "invalid rank configuration: rank count must be positive"
        );

        let err = SdfCoreError::UnsupportedDimensionality { ndims: 4 };
        assert_eq!(
            format!("{}", err),
            "unsupported dimensionality: 4 axes (expected 1 to 3)"
        );

        let err = SdfCoreError::RankOutOfRange {
            rank: 4,
            active_ranks: 4,
        };
        assert_eq!(
            format!("{}", err),
            "rank 4 is outside the 4 ranks holding a sub-domain"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = SdfCoreError::UnsupportedDimensionality { ndims: 4 };
        let err2 = SdfCoreError::UnsupportedDimensionality { ndims: 4 };
        let err3 = SdfCoreError::UnsupportedDimensionality { ndims: 0 };

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
