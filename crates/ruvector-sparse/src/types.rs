//! Shared tags and configuration for the sparse core.

use serde::{Deserialize, Serialize};

/// Magnitudes at or below this value are treated as structurally absent when
/// ingesting dense data.
pub const DEFAULT_ZERO_TOL: f64 = 1e-16;

/// Storage format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Coordinate triplets.
    Coo,
    /// Compressed sparse row.
    Csr,
    /// Compressed sparse column.
    Csc,
    /// Block compressed sparse row.
    Bsr,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Coo => write!(f, "COO"),
            Format::Csr => write!(f, "CSR"),
            Format::Csc => write!(f, "CSC"),
            Format::Bsr => write!(f, "BSR"),
        }
    }
}

/// Strength-of-connection measure used by multigrid coarsening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrengthType {
    /// Row-relative: `|a_ij| >= theta * max_{k != i} |a_ik|`.
    #[default]
    Classical,
    /// Diagonal-scaled: `|a_ij| >= theta * sqrt(|a_ii| * |a_jj|)`.
    Symmetric,
}

impl std::fmt::Display for StrengthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrengthType::Classical => write!(f, "classical"),
            StrengthType::Symmetric => write!(f, "symmetric"),
        }
    }
}

/// Ingestion settings for dense-to-sparse constructors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseConfig {
    /// Entries with `|v| <= zero_tol` are dropped.
    pub zero_tol: f64,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            zero_tol: DEFAULT_ZERO_TOL,
        }
    }
}

impl SparseConfig {
    /// Config with a custom zero tolerance.
    pub fn with_zero_tol(zero_tol: f64) -> Self {
        Self { zero_tol }
    }

    /// Whether `v` survives dense ingestion.
    #[inline]
    pub fn is_nonzero(&self, v: f64) -> bool {
        v.abs() > self.zero_tol
    }
}
