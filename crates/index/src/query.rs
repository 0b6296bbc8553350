use std::cmp::Ordering;

use fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// Overlap between two registered documents.
///
/// Only counts are reported; how they turn into a similarity score is up to
/// the caller. [`PairReport::overlap`] and [`PairReport::jaccard`] cover the
/// two usual choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub left: String,
    pub right: String,
    /// Fingerprints present in both forward sets.
    pub covered: usize,
    /// Size of the left document's forward set.
    pub left_total: usize,
    /// Size of the right document's forward set.
    pub right_total: usize,
}

impl PairReport {
    /// `covered / min(left_total, right_total)`, 0 when either side is empty.
    pub fn overlap(&self) -> f64 {
        let smaller = self.left_total.min(self.right_total);
        if smaller == 0 {
            0.0
        } else {
            self.covered as f64 / smaller as f64
        }
    }

    /// `covered / |left ∪ right|`, 0 when both sides are empty.
    pub fn jaccard(&self) -> f64 {
        let union = self.left_total + self.right_total - self.covered;
        if union == 0 {
            0.0
        } else {
            self.covered as f64 / union as f64
        }
    }
}

/// Overlap between an unregistered source and one registered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMatch {
    /// Name of the registered document.
    pub document: String,
    /// External fingerprint emissions found in this document, repeats counted.
    pub covered: usize,
    /// Number of fingerprints winnowed from the external source, repeats counted.
    pub external_total: usize,
    /// Size of the document's forward set.
    pub document_total: usize,
}

impl ExternalMatch {
    /// `covered / document_total`.
    ///
    /// Can exceed 1.0 when the external source emits the same fingerprint
    /// several times.
    pub fn document_coverage(&self) -> f64 {
        if self.document_total == 0 {
            0.0
        } else {
            self.covered as f64 / self.document_total as f64
        }
    }
}

/// Size of the intersection of two ascending sequences, in O(n + m).
///
/// Both inputs must be sorted ascending without duplicates.
pub fn sorted_intersection_len<A, B>(left: A, right: B) -> usize
where
    A: IntoIterator<Item = Fingerprint>,
    B: IntoIterator<Item = Fingerprint>,
{
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    let mut l = left.next();
    let mut r = right.next();
    let mut count = 0;

    while let (Some(a), Some(b)) = (l, r) {
        match a.cmp(&b) {
            Ordering::Less => l = left.next(),
            Ordering::Greater => r = right.next(),
            Ordering::Equal => {
                count += 1;
                l = left.next();
                r = right.next();
            }
        }
    }
    count
}
