//! # Simdex Fingerprinting
//!
//! Turns a stream of token codes into a sparse, position-stable set of
//! fingerprints. Two documents that share a long enough run of tokens are
//! guaranteed to share at least one fingerprint.
//!
//! ## Contract
//!
//! - Input is an ordered sequence of [`TokenCode`]s produced by an external
//!   tokenizer. This crate never looks at source text.
//! - The API is a pure function of `(tokens, config)`: no I/O, no clocks, no
//!   global state.
//!
//! Invariant: the same token sequence under the same [`FingerprintConfig`]
//! always yields the same fingerprint sequence.
//!
//! ## Pipeline
//!
//! 1.  **Window hashing**: a modular rolling hash over each window of `k`
//!     consecutive token codes, one value per input token
//!     ([`window_hashes`]). The first `k - 1` values cover zero-padded
//!     windows and are kept.
//!
//! 2.  **Winnowing**: the window hashes are filtered with a window of `w`
//!     values, emitting the minimum whenever it changes position
//!     ([`winnow_filter`]). Emissions may repeat; deduplication is left to
//!     the consumer.
//!
//! Both stages are lazy iterator adaptors and can be driven separately.
//!
//! ## Example Usage
//!
//! ```
//! use fingerprint::{fingerprint_tokens, FingerprintConfig};
//!
//! let tokens: Vec<u16> = (1..=10).collect();
//! let config = FingerprintConfig::new(3, 3);
//!
//! let fingerprints = fingerprint_tokens(&tokens, &config).unwrap();
//!
//! assert!(!fingerprints.is_empty());
//! ```

pub mod config;
pub mod rolling;
pub mod winnow;

pub use crate::config::{FingerprintConfig, FingerprintError, DEFAULT_K, DEFAULT_W, MAX_WINDOW};
pub use crate::rolling::{window_hashes, RollingHash, WindowHashes, BASE, MODULUS};
pub use crate::winnow::{winnow_filter, Winnow};

/// Syntactic category of one token, as produced by a tokenizer.
pub type TokenCode = u16;

/// A window hash selected by winnowing.
pub type Fingerprint = u64;

/// Compute the winnowed fingerprints of a token sequence.
///
/// Every emission is returned in order, duplicates included.
pub fn fingerprint_tokens(
    tokens: &[TokenCode],
    cfg: &FingerprintConfig,
) -> Result<Vec<Fingerprint>, FingerprintError> {
    cfg.validate()?;
    let hashes = window_hashes(tokens.iter().copied(), cfg.k)?;
    winnow_filter(hashes, cfg.w, Some(tokens.len() / cfg.w + 1))
}
