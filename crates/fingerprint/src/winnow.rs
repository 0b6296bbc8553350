//! Winnowing (Schleimer, Wilkerson & Aiken, SIGMOD 2003).
//!
//! A circular buffer of the last `w` window hashes is kept together with the
//! position of its minimum. A value is emitted whenever the minimum changes
//! position: either a strictly smaller hash arrives, or the slot holding the
//! current minimum is overwritten and the buffer is rescanned. On a rescan the
//! leftmost minimal slot wins.
//!
//! Emitted values are not deduplicated.

use crate::config::{FingerprintError, MAX_WINDOW};
use crate::Fingerprint;

/// Lazy winnowing adaptor over a stream of window hashes.
#[derive(Debug, Clone)]
pub struct Winnow<I> {
    hashes: I,
    window: Vec<u64>,
    cursor: usize,
    min: usize,
}

impl<I> Winnow<I>
where
    I: Iterator<Item = u64>,
{
    pub fn new(hashes: I, w: usize) -> Result<Self, FingerprintError> {
        if !(1..=MAX_WINDOW).contains(&w) {
            return Err(FingerprintError::InvalidConfigW { w });
        }
        Ok(Self {
            hashes,
            window: vec![u64::MAX; w],
            cursor: 0,
            min: 0,
        })
    }

    /// Feed one window hash; returns the fingerprint it causes, if any.
    fn step(&mut self, value: u64) -> Option<Fingerprint> {
        // The first write lands on slot 1, not slot 0.
        self.cursor = (self.cursor + 1) % self.window.len();
        self.window[self.cursor] = value;

        if self.cursor == self.min {
            self.min = leftmost_min(&self.window);
            Some(self.window[self.min])
        } else if self.window[self.min] > value {
            self.min = self.cursor;
            Some(value)
        } else {
            None
        }
    }
}

fn leftmost_min(window: &[u64]) -> usize {
    let mut best = 0;
    for (idx, &val) in window.iter().enumerate().skip(1) {
        if val < window[best] {
            best = idx;
        }
    }
    best
}

impl<I> Iterator for Winnow<I>
where
    I: Iterator<Item = u64>,
{
    type Item = Fingerprint;

    fn next(&mut self) -> Option<Fingerprint> {
        while let Some(value) = self.hashes.next() {
            if let Some(fp) = self.step(value) {
                return Some(fp);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.hashes.size_hint().1)
    }
}

/// Winnow `hashes` with window `w` and collect every emission in order.
///
/// `capacity_hint` only pre-sizes the output buffer.
pub fn winnow_filter<I>(
    hashes: I,
    w: usize,
    capacity_hint: Option<usize>,
) -> Result<Vec<Fingerprint>, FingerprintError>
where
    I: IntoIterator<Item = u64>,
{
    let winnow = Winnow::new(hashes.into_iter(), w)?;
    let mut out = Vec::with_capacity(capacity_hint.unwrap_or(0));
    out.extend(winnow);
    Ok(out)
}
