//! Snapshot persistence.
//!
//! A snapshot is a JSON object:
//!
//! ```json
//! {"k":17,"w":23,"identifiers":[["a.js",0],["b.js",1]],"index":[[1042,[0,1]],[9977,[1]]]}
//! ```
//!
//! Forward sets are not stored; loading rebuilds them from `index`. Output is
//! stable: identifiers in id order, index entries in fingerprint order, id
//! lists ascending. Snapshot bytes may additionally be wrapped in a zstd
//! frame, which loading detects on its own.

use std::collections::BTreeSet;
use std::io::Read;

use fingerprint::{Fingerprint, FingerprintConfig};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zstd::encode_all;
use zstd::stream::read::Decoder;

use crate::registry::DocumentRegistry;
use crate::{DocumentId, IndexError, SimilarityIndex};

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Largest decompressed snapshot accepted by [`SimilarityIndex::from_snapshot_bytes`].
pub const MAX_SNAPSHOT_BYTES: usize = 1 << 30;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    k: usize,
    w: usize,
    identifiers: Vec<(String, DocumentId)>,
    index: Vec<(Fingerprint, Vec<DocumentId>)>,
}

/// Compression codec options for snapshot files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// Plain JSON.
    #[default]
    None,
    /// JSON wrapped in a zstd frame.
    Zstd,
}

/// Compression behavior for snapshot output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn zstd() -> Self {
        Self::default().with_codec(CompressionCodec::Zstd)
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data),
            CompressionCodec::Zstd => encode_all(data.as_slice(), self.level)
                .map_err(|e| IndexError::Compression(e.to_string())),
        }
    }
}

impl SimilarityIndex {
    /// Encode `k`, `w`, the name/id bijection and the inverted map as JSON.
    pub fn serialize(&self) -> Result<Vec<u8>, IndexError> {
        let identifiers = self
            .registry
            .iter()
            .map(|(id, name)| (name.to_owned(), id))
            .collect();

        let mut fingerprints: Vec<Fingerprint> = self.inverted.keys().copied().collect();
        fingerprints.sort_unstable();
        let mut index = Vec::with_capacity(fingerprints.len());
        for fp in fingerprints {
            let ids = self.documents_containing(fp).collect();
            index.push((fp, ids));
        }

        let snapshot = Snapshot {
            k: self.cfg.k,
            w: self.cfg.w,
            identifiers,
            index,
        };
        serde_json::to_vec(&snapshot).map_err(|e| IndexError::Encode(e.to_string()))
    }

    /// Rebuild an index from [`SimilarityIndex::serialize`] output.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, IndexError> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|e| IndexError::MalformedSnapshot(e.to_string()))?;

        let cfg = FingerprintConfig::new(snapshot.k, snapshot.w);
        cfg.validate()
            .map_err(|e| IndexError::MalformedSnapshot(e.to_string()))?;
        let registry = DocumentRegistry::from_pairs(snapshot.identifiers)
            .map_err(IndexError::MalformedSnapshot)?;

        let mut index = SimilarityIndex {
            cfg,
            forward: vec![BTreeSet::new(); registry.len()],
            registry,
            inverted: HashMap::with_capacity(snapshot.index.len()),
        };

        for (fp, ids) in snapshot.index {
            if ids.is_empty() {
                return Err(IndexError::MalformedSnapshot(format!(
                    "fingerprint {fp} has no documents"
                )));
            }
            if index.inverted.contains_key(&fp) {
                return Err(IndexError::MalformedSnapshot(format!(
                    "fingerprint {fp} is listed more than once"
                )));
            }
            for id in ids {
                if usize::from(id) >= index.registry.len() {
                    return Err(IndexError::MalformedSnapshot(format!(
                        "fingerprint {fp} references unknown document {id}"
                    )));
                }
                index.link(id, fp);
            }
        }

        debug!(
            documents = index.len(),
            fingerprints = index.fingerprint_count(),
            k = index.cfg.k,
            w = index.cfg.w,
            "snapshot loaded"
        );
        Ok(index)
    }

    /// Serialize and optionally compress.
    pub fn to_snapshot_bytes(&self, compression: &CompressionConfig) -> Result<Vec<u8>, IndexError> {
        compression.compress(self.serialize()?)
    }

    /// Load plain or zstd-compressed snapshot bytes.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        Self::from_snapshot_bytes_with_limit(bytes, MAX_SNAPSHOT_BYTES)
    }

    /// Like [`from_snapshot_bytes`](Self::from_snapshot_bytes), but a zstd
    /// frame may expand to at most `limit` bytes.
    pub fn from_snapshot_bytes_with_limit(bytes: &[u8], limit: usize) -> Result<Self, IndexError> {
        if !bytes.starts_with(&ZSTD_MAGIC) {
            return Self::deserialize(bytes);
        }
        let malformed = |e: std::io::Error| IndexError::MalformedSnapshot(e.to_string());
        let decoder = Decoder::new(bytes).map_err(malformed)?;
        let mut json = Vec::new();
        decoder
            .take(limit as u64 + 1)
            .read_to_end(&mut json)
            .map_err(malformed)?;
        if json.len() > limit {
            return Err(IndexError::MalformedSnapshot(format!(
                "decompressed snapshot exceeds {limit} bytes"
            )));
        }
        Self::deserialize(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> SimilarityIndex {
        let mut index = SimilarityIndex::new(3, 3).unwrap();
        index.add_document("first", &(1..=10).collect::<Vec<_>>()).unwrap();
        index.add_document("second", &[1, 2, 3, 4, 5, 6, 20, 21, 22]).unwrap();
        index.add_document("third", &[9; 10]).unwrap();
        index
    }

    fn load(value: Value) -> Result<SimilarityIndex, IndexError> {
        SimilarityIndex::deserialize(value.to_string().as_bytes())
    }

    #[test]
    fn snapshot_has_documented_shape() {
        let mut index = SimilarityIndex::new(1, 1).unwrap();
        index.add_document("a", &[7, 5]).unwrap();
        index.add_document("b", &[5]).unwrap();

        let value: Value = serde_json::from_slice(&index.serialize().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "k": 1,
                "w": 1,
                "identifiers": [["a", 0], ["b", 1]],
                "index": [[5, [0, 1]], [7, [0]]],
            })
        );
    }

    #[test]
    fn roundtrip_preserves_everything() {
        let index = sample();
        let restored = SimilarityIndex::deserialize(&index.serialize().unwrap()).unwrap();

        assert_eq!(restored.config(), index.config());
        assert_eq!(restored.registry, index.registry);
        assert_eq!(restored.forward, index.forward);
        assert_eq!(restored.inverted, index.inverted);
        assert!(restored.is_consistent());
    }

    #[test]
    fn serialization_is_stable() {
        let index = sample();
        let once = index.serialize().unwrap();
        let twice = SimilarityIndex::deserialize(&once).unwrap().serialize().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_index_roundtrips() {
        let index = SimilarityIndex::new(5, 4).unwrap();
        let restored = SimilarityIndex::deserialize(&index.serialize().unwrap()).unwrap();
        assert!(restored.is_empty());
        assert_eq!((restored.k(), restored.w()), (5, 4));
    }

    #[test]
    fn registered_document_without_fingerprints_survives() {
        let mut index = SimilarityIndex::new(3, 3).unwrap();
        index.add_document("empty", &[]).unwrap();
        let restored = SimilarityIndex::deserialize(&index.serialize().unwrap()).unwrap();
        assert_eq!(restored.document_id("empty"), Some(0));
        let report = restored.compare_pair("empty", "empty").unwrap();
        assert_eq!(report.left_total, 0);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let full = json!({"k": 3, "w": 3, "identifiers": [], "index": []});
        assert!(load(full.clone()).is_ok());
        for field in ["k", "w", "identifiers", "index"] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(field);
            assert!(
                matches!(load(partial), Err(IndexError::MalformedSnapshot(_))),
                "missing {field} accepted"
            );
        }
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let cases = [
            json!({"k": "3", "w": 3, "identifiers": [], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [["a"]], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [[0, "a"]], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 0]], "index": [[1, 0]]}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 70000]], "index": []}),
            json!([3, 3]),
        ];
        for case in cases {
            assert!(
                matches!(load(case.clone()), Err(IndexError::MalformedSnapshot(_))),
                "accepted {case}"
            );
        }
        assert!(matches!(
            SimilarityIndex::deserialize(b"not json"),
            Err(IndexError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn inconsistent_contents_are_rejected() {
        let cases = [
            json!({"k": 0, "w": 3, "identifiers": [], "index": []}),
            json!({"k": 3, "w": 0, "identifiers": [], "index": []}),
            json!({"k": u64::MAX, "w": 3, "identifiers": [], "index": []}),
            json!({"k": 3, "w": 65536, "identifiers": [], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 1]], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 0], ["a", 1]], "index": []}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 0]], "index": [[5, [1]]]}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 0]], "index": [[5, []]]}),
            json!({"k": 3, "w": 3, "identifiers": [["a", 0]], "index": [[5, [0]], [5, [0]]]}),
        ];
        for case in cases {
            assert!(
                matches!(load(case.clone()), Err(IndexError::MalformedSnapshot(_))),
                "accepted {case}"
            );
        }
    }

    #[test]
    fn zstd_snapshot_is_detected_on_load() {
        let index = sample();
        let packed = index.to_snapshot_bytes(&CompressionConfig::zstd()).unwrap();
        assert!(packed.starts_with(&ZSTD_MAGIC));

        let restored = SimilarityIndex::from_snapshot_bytes(&packed).unwrap();
        assert_eq!(restored.serialize().unwrap(), index.serialize().unwrap());

        let plain = index.to_snapshot_bytes(&CompressionConfig::default()).unwrap();
        assert_eq!(plain, index.serialize().unwrap());
        assert!(SimilarityIndex::from_snapshot_bytes(&plain).is_ok());
    }

    #[test]
    fn decompressed_size_is_bounded() {
        let index = sample();
        let packed = index.to_snapshot_bytes(&CompressionConfig::zstd()).unwrap();
        let plain_len = index.serialize().unwrap().len();

        let err = SimilarityIndex::from_snapshot_bytes_with_limit(&packed, plain_len - 1)
            .unwrap_err();
        assert!(matches!(err, IndexError::MalformedSnapshot(msg) if msg.contains("exceeds")));

        let restored = SimilarityIndex::from_snapshot_bytes_with_limit(&packed, plain_len).unwrap();
        assert_eq!(restored.len(), index.len());
    }

    #[test]
    fn highly_compressible_frame_is_cut_off() {
        let bomb = encode_all(&vec![b' '; 1 << 20][..], 3).unwrap();
        let err = SimilarityIndex::from_snapshot_bytes_with_limit(&bomb, 4096).unwrap_err();
        assert!(matches!(err, IndexError::MalformedSnapshot(_)));
    }

    #[test]
    fn corrupt_zstd_frame_is_malformed() {
        let mut bytes = ZSTD_MAGIC.to_vec();
        bytes.extend_from_slice(&[0, 1, 2, 3]);
        assert!(matches!(
            SimilarityIndex::from_snapshot_bytes(&bytes),
            Err(IndexError::MalformedSnapshot(_))
        ));
    }
}
