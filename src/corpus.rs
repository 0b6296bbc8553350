use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use fingerprint::{Fingerprint, FingerprintConfig, TokenCode, fingerprint_tokens};
use index::{
    CompressionConfig, DocumentId, ExternalMatch, IndexError, MAX_DOCUMENTS, PairReport,
    SimilarityIndex,
};
use rayon::prelude::*;
use tokenizer::Tokenizer;
use tracing::{debug, info};

use crate::SimdexError;
use crate::config::SimdexConfig;

/// Name reported for unregistered sources in tokenizer errors.
const EXTERNAL: &str = "external";

/// A similarity index paired with the tokenizer that feeds it.
///
/// The index sits behind one reader/writer lock: pair comparisons, matching
/// and snapshots share it, additions take it exclusively. Tokenizing and
/// fingerprinting happen before the lock is taken, so a source that fails to
/// tokenize never touches the index.
pub struct Corpus {
    cfg: FingerprintConfig,
    index: RwLock<SimilarityIndex>,
    tokenizer: Box<dyn Tokenizer>,
}

impl Corpus {
    /// Empty corpus using the configured window parameters and tokenizer.
    pub fn new(cfg: &SimdexConfig) -> Result<Self, SimdexError> {
        let index = SimilarityIndex::with_config(cfg.fingerprint_config())?;
        Ok(Self::from_index(index, cfg.build_tokenizer()))
    }

    /// Empty corpus with explicit parameters and any tokenizer.
    pub fn with_tokenizer<T>(cfg: FingerprintConfig, tokenizer: T) -> Result<Self, SimdexError>
    where
        T: Tokenizer + 'static,
    {
        let index = SimilarityIndex::with_config(cfg)?;
        Ok(Self::from_index(index, Box::new(tokenizer)))
    }

    pub fn from_index(index: SimilarityIndex, tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            cfg: *index.config(),
            index: RwLock::new(index),
            tokenizer,
        }
    }

    /// Restore from snapshot bytes, plain or zstd-compressed.
    pub fn from_snapshot(bytes: &[u8], tokenizer: Box<dyn Tokenizer>) -> Result<Self, SimdexError> {
        let index = SimilarityIndex::from_snapshot_bytes(bytes)?;
        Ok(Self::from_index(index, tokenizer))
    }

    /// Restore from a snapshot file.
    pub fn load<P: AsRef<Path>>(path: P, tokenizer: Box<dyn Tokenizer>) -> Result<Self, SimdexError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SimdexError::io(path, source))?;
        let corpus = Self::from_snapshot(&bytes, tokenizer)?;
        info!(
            path = %path.display(),
            documents = corpus.len(),
            "snapshot file loaded"
        );
        Ok(corpus)
    }

    pub fn config(&self) -> FingerprintConfig {
        self.cfg
    }

    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Shared access to the underlying index.
    pub fn read(&self) -> RwLockReadGuard<'_, SimilarityIndex> {
        self.read_index()
    }

    pub fn into_index(self) -> SimilarityIndex {
        self.index
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Token codes of `source` under this corpus's tokenizer.
    pub fn tokenize(&self, source: &[u8]) -> Result<Vec<TokenCode>, SimdexError> {
        self.tokenize_named(EXTERNAL, source)
    }

    /// Tokenize `source` and record it under `name`.
    ///
    /// A name that is already registered keeps its id and accumulates the
    /// new fingerprints.
    pub fn add_source(&self, name: &str, source: &[u8]) -> Result<DocumentId, SimdexError> {
        let fingerprints = self.fingerprint_source(name, source)?;
        let id = self.write_index().insert_fingerprints(name, &fingerprints)?;
        Ok(id)
    }

    /// Add many sources, tokenizing them in parallel.
    ///
    /// Nothing is recorded if any source fails to tokenize or if the batch
    /// would register more than [`MAX_DOCUMENTS`] documents. Documents are
    /// recorded in input order, so ids match a sequential run.
    pub fn add_sources<N, S>(&self, batch: &[(N, S)]) -> Result<Vec<DocumentId>, SimdexError>
    where
        N: AsRef<str> + Sync,
        S: AsRef<[u8]> + Sync,
    {
        let started = Instant::now();
        let prepared = batch
            .par_iter()
            .map(|(name, source)| self.fingerprint_source(name.as_ref(), source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut index = self.write_index();
        let fresh: HashSet<&str> = batch
            .iter()
            .map(|(name, _)| name.as_ref())
            .filter(|name| index.document_id(name).is_none())
            .collect();
        if index.len() + fresh.len() > MAX_DOCUMENTS {
            return Err(IndexError::TooManyDocuments { max: MAX_DOCUMENTS }.into());
        }

        let mut ids = Vec::with_capacity(batch.len());
        for ((name, _), fingerprints) in batch.iter().zip(&prepared) {
            ids.push(index.insert_fingerprints(name.as_ref(), fingerprints)?);
        }

        info!(
            sources = batch.len(),
            documents = index.len(),
            fingerprints = index.fingerprint_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch indexed"
        );
        Ok(ids)
    }

    /// Overlap of an unregistered source with every registered document.
    pub fn match_source(&self, source: &[u8]) -> Result<Vec<ExternalMatch>, SimdexError> {
        let fingerprints = self.fingerprint_source(EXTERNAL, source)?;
        Ok(self.read_index().match_fingerprints(&fingerprints))
    }

    pub fn pair(&self, left: &str, right: &str) -> Result<PairReport, SimdexError> {
        Ok(self.read_index().compare_pair(left, right)?)
    }

    /// Snapshot bytes, compressed as requested.
    pub fn snapshot(&self, compression: &CompressionConfig) -> Result<Vec<u8>, SimdexError> {
        Ok(self.read_index().to_snapshot_bytes(compression)?)
    }

    /// Write a snapshot file.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        compression: &CompressionConfig,
    ) -> Result<(), SimdexError> {
        let path = path.as_ref();
        let bytes = self.snapshot(compression)?;
        fs::write(path, &bytes).map_err(|source| SimdexError::io(path, source))?;
        info!(
            path = %path.display(),
            bytes = bytes.len(),
            codec = ?compression.codec,
            "snapshot written"
        );
        Ok(())
    }

    fn tokenize_named(&self, name: &str, source: &[u8]) -> Result<Vec<TokenCode>, SimdexError> {
        self.tokenizer
            .tokenize(source)
            .map_err(|source| SimdexError::Tokenize {
                document: name.to_owned(),
                source,
            })
    }

    fn fingerprint_source(&self, name: &str, source: &[u8]) -> Result<Vec<Fingerprint>, SimdexError> {
        let tokens = self.tokenize_named(name, source)?;
        let fingerprints = fingerprint_tokens(&tokens, &self.cfg).map_err(IndexError::from)?;
        debug!(
            document = name,
            bytes = source.len(),
            tokens = tokens.len(),
            fingerprints = fingerprints.len(),
            "source fingerprinted"
        );
        Ok(fingerprints)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, SimilarityIndex> {
        self.index
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, SimilarityIndex> {
        self.index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Compare two files in a fresh corpus, named by their paths.
pub fn compare_files<P, Q>(left: P, right: Q, cfg: &SimdexConfig) -> Result<PairReport, SimdexError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (left, right) = (left.as_ref(), right.as_ref());
    let left_src = fs::read(left).map_err(|source| SimdexError::io(left, source))?;
    let right_src = fs::read(right).map_err(|source| SimdexError::io(right, source))?;
    let (left_name, right_name) = (left.display().to_string(), right.display().to_string());

    let corpus = Corpus::new(cfg)?;
    corpus.add_source(&left_name, &left_src)?;
    corpus.add_source(&right_name, &right_src)?;
    corpus.pair(&left_name, &right_name)
}
