//! # Simdex Index
//!
//! An in-process, bidirectional fingerprint index for near-duplicate
//! detection. For every registered document it keeps the set of winnowed
//! fingerprints (the *forward set*); for every fingerprint it keeps the set
//! of documents containing it (the *inverted map*).
//!
//! ## Core Operations
//!
//! - [`SimilarityIndex::add_document`]: fingerprint a token sequence and record
//!   it under a document name.
//! - [`SimilarityIndex::compare_pair`]: fingerprints shared by two registered
//!   documents, via a sorted-merge intersection.
//! - [`SimilarityIndex::match_tokens`]: overlap of an unregistered token
//!   sequence with every registered document.
//! - [`SimilarityIndex::serialize`] / [`SimilarityIndex::deserialize`]: JSON
//!   snapshots (see the [`snapshot`] module).
//!
//! ## Invariants
//!
//! - Document ids are dense and assigned in insertion order.
//! - A document id is listed under fingerprint `F` in the inverted map if and
//!   only if `F` is in that document's forward set.
//! - Both sides iterate in ascending order.
//!
//! Registering a name twice reuses its id and merges the new fingerprints
//! into the existing forward set; nothing is ever replaced or removed.
//!
//! The index has no interior locking. Embedders that share it between
//! threads wrap the whole value in one reader/writer lock.
//!
//! ## Example Usage
//!
//! ```
//! use index::SimilarityIndex;
//!
//! let mut index = SimilarityIndex::new(3, 3).unwrap();
//! index.add_document("a", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
//! index.add_document("b", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
//!
//! let report = index.compare_pair("a", "b").unwrap();
//! assert_eq!(report.covered, report.left_total);
//!
//! let matches = index.match_tokens(&[1, 2, 3, 4, 5]).unwrap();
//! assert_eq!(matches.len(), 2);
//! ```

mod query;
mod registry;
pub mod snapshot;

use std::collections::BTreeSet;

use fingerprint::{fingerprint_tokens, Fingerprint, FingerprintConfig, FingerprintError, TokenCode};
use hashbrown::HashMap;
use roaring::RoaringBitmap;
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::query::{sorted_intersection_len, ExternalMatch, PairReport};
pub use crate::registry::{DocumentRegistry, MAX_DOCUMENTS};
pub use crate::snapshot::{CompressionCodec, CompressionConfig, MAX_SNAPSHOT_BYTES};

/// Dense per-index document identifier.
pub type DocumentId = u16;

/// Errors returned by index operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("document not found: {name}")]
    NotFound { name: String },
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("index is full: at most {max} documents")]
    TooManyDocuments { max: usize },
    #[error("invalid index parameters: {0}")]
    Config(#[from] FingerprintError),
    #[error("snapshot encode error: {0}")]
    Encode(String),
    #[error("compression error: {0}")]
    Compression(String),
}

impl IndexError {
    fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_owned(),
        }
    }
}

/// Forward sets plus inverted map under fixed `(k, w)`.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    cfg: FingerprintConfig,
    registry: DocumentRegistry,
    /// Forward set per document, indexed by id.
    forward: Vec<BTreeSet<Fingerprint>>,
    /// Fingerprint → ids of the documents containing it.
    inverted: HashMap<Fingerprint, RoaringBitmap>,
}

impl SimilarityIndex {
    /// Create an empty index with window length `k` and winnowing window `w`.
    pub fn new(k: usize, w: usize) -> Result<Self, IndexError> {
        Self::with_config(FingerprintConfig::new(k, w))
    }

    pub fn with_config(cfg: FingerprintConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            registry: DocumentRegistry::new(),
            forward: Vec::new(),
            inverted: HashMap::new(),
        })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.cfg
    }

    pub fn k(&self) -> usize {
        self.cfg.k
    }

    pub fn w(&self) -> usize {
        self.cfg.w
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of distinct fingerprints across all documents.
    pub fn fingerprint_count(&self) -> usize {
        self.inverted.len()
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn document_id(&self, name: &str) -> Option<DocumentId> {
        self.registry.id(name)
    }

    pub fn document_name(&self, id: DocumentId) -> Option<&str> {
        self.registry.name(id)
    }

    /// Registered `(id, name)` pairs in id order.
    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &str)> + '_ {
        self.registry.iter()
    }

    /// Forward set of a document, `None` for an unknown id.
    pub fn forward_set(&self, id: DocumentId) -> Option<&BTreeSet<Fingerprint>> {
        self.forward.get(usize::from(id))
    }

    /// Ids of the documents containing `fp`, ascending.
    pub fn documents_containing(&self, fp: Fingerprint) -> impl Iterator<Item = DocumentId> + '_ {
        self.inverted
            .get(&fp)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .map(|id| id as DocumentId)
    }

    /// Fingerprints of `tokens` under this index's parameters, every
    /// emission in order.
    pub fn fingerprint(&self, tokens: &[TokenCode]) -> Result<Vec<Fingerprint>, IndexError> {
        Ok(fingerprint_tokens(tokens, &self.cfg)?)
    }

    /// Fingerprint `tokens` and record them under `name`.
    ///
    /// An already registered name keeps its id and the new fingerprints are
    /// merged into its forward set.
    pub fn add_document(&mut self, name: &str, tokens: &[TokenCode]) -> Result<DocumentId, IndexError> {
        let fingerprints = self.fingerprint(tokens)?;
        self.insert_fingerprints(name, &fingerprints)
    }

    /// Record precomputed fingerprints under `name`.
    ///
    /// Same merge semantics as [`SimilarityIndex::add_document`]. The
    /// fingerprints must come from this index's `(k, w)`.
    pub fn insert_fingerprints(
        &mut self,
        name: &str,
        fingerprints: &[Fingerprint],
    ) -> Result<DocumentId, IndexError> {
        let (id, created) = self.registry.resolve_or_register(name)?;
        if created {
            self.forward.push(BTreeSet::new());
        }
        if fingerprints.is_empty() {
            warn!(document = name, "document produced no fingerprints");
        }
        for &fp in fingerprints {
            self.link(id, fp);
        }
        debug!(
            document = name,
            id,
            created,
            emitted = fingerprints.len(),
            distinct = self.forward[usize::from(id)].len(),
            "document indexed"
        );
        Ok(id)
    }

    /// Record `fp` on both sides of the index.
    fn link(&mut self, id: DocumentId, fp: Fingerprint) {
        self.inverted.entry(fp).or_default().insert(u32::from(id));
        self.forward[usize::from(id)].insert(fp);
    }

    /// Shared fingerprints of two registered documents.
    pub fn compare_pair(&self, left: &str, right: &str) -> Result<PairReport, IndexError> {
        let a = self.registry.id(left).ok_or_else(|| IndexError::not_found(left))?;
        let b = self.registry.id(right).ok_or_else(|| IndexError::not_found(right))?;
        let fa = &self.forward[usize::from(a)];
        let fb = &self.forward[usize::from(b)];

        Ok(PairReport {
            left: left.to_owned(),
            right: right.to_owned(),
            covered: sorted_intersection_len(fa.iter().copied(), fb.iter().copied()),
            left_total: fa.len(),
            right_total: fb.len(),
        })
    }

    /// Overlap of an unregistered token sequence with every registered
    /// document. Nothing is recorded.
    pub fn match_tokens(&self, tokens: &[TokenCode]) -> Result<Vec<ExternalMatch>, IndexError> {
        let fingerprints = self.fingerprint(tokens)?;
        Ok(self.match_fingerprints(&fingerprints))
    }

    /// One entry per registered document, in id order, including documents
    /// with no overlap. Repeated input fingerprints are counted every time.
    pub fn match_fingerprints(&self, fingerprints: &[Fingerprint]) -> Vec<ExternalMatch> {
        let mut shared = vec![0usize; self.registry.len()];
        for fp in fingerprints {
            if let Some(ids) = self.inverted.get(fp) {
                for id in ids {
                    shared[id as usize] += 1;
                }
            }
        }

        self.registry
            .iter()
            .map(|(id, name)| ExternalMatch {
                document: name.to_owned(),
                covered: shared[usize::from(id)],
                external_total: fingerprints.len(),
                document_total: self.forward[usize::from(id)].len(),
            })
            .collect()
    }

    /// Check that the forward sets and the inverted map mirror each other.
    pub fn is_consistent(&self) -> bool {
        if self.forward.len() != self.registry.len() {
            return false;
        }
        let forward_ok = self.forward.iter().enumerate().all(|(id, fps)| {
            fps.iter().all(|fp| {
                self.inverted
                    .get(fp)
                    .is_some_and(|ids| ids.contains(id as u32))
            })
        });
        let inverted_ok = self.inverted.iter().all(|(fp, ids)| {
            !ids.is_empty()
                && ids.iter().all(|id| {
                    self.forward
                        .get(id as usize)
                        .is_some_and(|fps| fps.contains(fp))
                })
        });
        forward_ok && inverted_ok
    }
}
