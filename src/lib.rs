//! Workspace umbrella crate for simdex.
//!
//! Tokenizers turn source files into token codes, the fingerprint crate
//! winnows those into fingerprints, and the index records which document
//! holds which fingerprint. [`Corpus`] binds a tokenizer to an index so
//! callers can work with raw source bytes through a single entry point.
//!
//! ```no_run
//! use simdex::{Corpus, SimdexConfig};
//!
//! # fn main() -> Result<(), simdex::SimdexError> {
//! let corpus = Corpus::new(&SimdexConfig::default())?;
//! corpus.add_source("a.js", b"function add(a, b) { return a + b; }")?;
//! corpus.add_source("b.js", b"function sum(x, y) { return x + y; }")?;
//! let report = corpus.pair("a.js", "b.js")?;
//! println!("{} shared fingerprints", report.covered);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod corpus;

pub use config::{
    ConfigLoadError, FingerprintYamlConfig, LoggingYamlConfig, SimdexConfig, SnapshotYamlConfig,
    TokenizerYamlConfig,
};
pub use corpus::{Corpus, compare_files};
pub use fingerprint::{
    DEFAULT_K, DEFAULT_W, Fingerprint, FingerprintConfig, FingerprintError, RollingHash,
    TokenCode, Winnow, fingerprint_tokens, window_hashes, winnow_filter,
};
pub use index::{
    CompressionCodec, CompressionConfig, DocumentId, ExternalMatch, IndexError, MAX_DOCUMENTS,
    PairReport, SimilarityIndex,
};
pub use tokenizer::{JavaScriptTokenizer, TokenizeError, Tokenizer, TokenizerKind};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by [`Corpus`] and the file helpers.
#[derive(Debug, Error)]
pub enum SimdexError {
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("tokenization failed for {document}: {source}")]
    Tokenize {
        document: String,
        #[source]
        source: TokenizeError,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
}

impl SimdexError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
