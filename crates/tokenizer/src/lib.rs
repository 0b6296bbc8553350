//! # Simdex Tokenizers
//!
//! The boundary between raw source bytes and the fingerprinting engine. A
//! [`Tokenizer`] maps a byte span to an ordered sequence of
//! [`TokenCode`]s. The only guarantees the engine relies on:
//!
//! - the same bytes always yield the same token codes;
//! - codes are drawn from a small bounded domain (they fit in a `u16`).
//!
//! [`JavaScriptTokenizer`] is the bundled implementation. Any closure of type
//! `Fn(&[u8]) -> Result<Vec<TokenCode>, TokenizeError>` is a tokenizer too.

mod error;
mod javascript;

pub use crate::error::TokenizeError;
pub use crate::javascript::JavaScriptTokenizer;
pub use fingerprint::TokenCode;

use serde::{Deserialize, Serialize};

/// Turns raw document content into token codes.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, source: &[u8]) -> Result<Vec<TokenCode>, TokenizeError>;
}

impl<F> Tokenizer for F
where
    F: Fn(&[u8]) -> Result<Vec<TokenCode>, TokenizeError> + Send + Sync,
{
    fn tokenize(&self, source: &[u8]) -> Result<Vec<TokenCode>, TokenizeError> {
        self(source)
    }
}

/// Bundled tokenizer selection, as named in configuration files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Javascript,
}

impl TokenizerKind {
    pub fn build(self, strict: bool) -> Box<dyn Tokenizer> {
        match self {
            TokenizerKind::Javascript => Box::new(JavaScriptTokenizer::new().with_strict(strict)),
        }
    }
}
