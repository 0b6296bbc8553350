//! Configuration and error types for token-stream fingerprinting.
//!
//! The fingerprinting layer is a pure function of `(token_codes, config)`:
//! no I/O, no clocks, no global state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default k-gram window length in tokens.
pub const DEFAULT_K: usize = 17;

/// Default winnowing window width.
pub const DEFAULT_W: usize = 23;

/// Largest accepted `k` or `w`. Both are stored as 16-bit values.
pub const MAX_WINDOW: usize = u16::MAX as usize;

/// Window parameters shared by every document of one index.
///
/// Both values are fixed for the lifetime of an index; fingerprints computed
/// under different parameters are not comparable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Number of consecutive token codes hashed into one window hash.
    ///
    /// Larger values are less sensitive to coincidental overlap but miss
    /// shorter copied regions.
    pub k: usize,
    /// Number of consecutive window hashes the winnowing filter inspects.
    ///
    /// Any shared run of at least `w + k - 1` tokens is guaranteed to produce
    /// a shared fingerprint.
    pub w: usize,
}

impl FingerprintConfig {
    pub fn new(k: usize, w: usize) -> Self {
        Self { k, w }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_w(mut self, w: usize) -> Self {
        self.w = w;
        self
    }

    /// Shortest shared token run that always yields a shared fingerprint.
    pub fn guarantee_threshold(&self) -> usize {
        (self.w + self.k).saturating_sub(1)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), FingerprintError> {
        if !(1..=MAX_WINDOW).contains(&self.k) {
            return Err(FingerprintError::InvalidConfigK { k: self.k });
        }
        if !(1..=MAX_WINDOW).contains(&self.w) {
            return Err(FingerprintError::InvalidConfigW { w: self.w });
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            w: DEFAULT_W,
        }
    }
}

/// Errors returned by the fingerprinting pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid config: k must be within 1..=65535 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: w must be within 1..=65535 (got {w})")]
    InvalidConfigW { w: usize },
}
