//! Modular rolling hash over a sliding window of `k` token codes.
//!
//! Each window hash is the polynomial `sum(t[i - j] * BASE^j) mod MODULUS`
//! for `j in 0..k`, updated in O(1) per token. Arithmetic never subtracts:
//! the outgoing token is removed by adding `MODULUS - BASE^k mod MODULUS`
//! times its code.

use crate::config::{FingerprintError, MAX_WINDOW};
use crate::TokenCode;

/// Prime modulus. Every window hash is strictly below this value.
pub const MODULUS: u64 = 33_554_393;

/// Multiplicative base of the polynomial hash.
pub const BASE: u64 = 4_194_301;

/// `base^exp mod modulus` by square-and-multiply.
///
/// Operands must stay below 2^32 so that products fit in a `u64`.
pub(crate) fn mod_pow(base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut result = 1 % modulus;
    let mut b = base % modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * b % modulus;
        }
        b = b * b % modulus;
        exp >>= 1;
    }
    result
}

/// Incremental hash of the last `k` token codes pushed.
///
/// The window starts filled with zero codes, so the first `k - 1` values
/// returned by [`RollingHash::push`] hash a zero-padded window. They are
/// returned anyway; callers that want only full windows skip them.
#[derive(Debug, Clone)]
pub struct RollingHash {
    k: usize,
    max_base: u64,
    hash: u64,
    cursor: usize,
    memory: Vec<u64>,
}

impl RollingHash {
    pub fn new(k: usize) -> Result<Self, FingerprintError> {
        if !(1..=MAX_WINDOW).contains(&k) {
            return Err(FingerprintError::InvalidConfigK { k });
        }
        let max_base = (MODULUS - mod_pow(BASE, k as u64, MODULUS)) % MODULUS;
        Ok(Self {
            k,
            max_base,
            hash: 0,
            cursor: 0,
            memory: vec![0; k],
        })
    }

    /// Window length in tokens.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Hash of the current window (0 before the first push).
    pub fn current(&self) -> u64 {
        self.hash
    }

    /// Slide the window by one token and return the new window hash.
    pub fn push(&mut self, token: TokenCode) -> u64 {
        let token = u64::from(token);
        let oldest = self.memory[self.cursor];
        // hash < 2^25, BASE < 2^22, max_base < 2^25 and oldest < 2^16: no overflow.
        self.hash = (BASE * self.hash + token + self.max_base * oldest) % MODULUS;
        self.memory[self.cursor] = token;
        self.cursor = (self.cursor + 1) % self.k;
        self.hash
    }
}

/// Lazy adaptor yielding one window hash per input token.
///
/// Single-pass: it owns a fresh [`RollingHash`] and cannot be restarted.
#[derive(Debug, Clone)]
pub struct WindowHashes<I> {
    tokens: I,
    hasher: RollingHash,
}

impl<I> Iterator for WindowHashes<I>
where
    I: Iterator<Item = TokenCode>,
{
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let token = self.tokens.next()?;
        Some(self.hasher.push(token))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tokens.size_hint()
    }
}

impl<I> ExactSizeIterator for WindowHashes<I> where I: ExactSizeIterator<Item = TokenCode> {}

/// Hash every `k`-token window of `tokens`, one value per input token.
pub fn window_hashes<I>(tokens: I, k: usize) -> Result<WindowHashes<I::IntoIter>, FingerprintError>
where
    I: IntoIterator<Item = TokenCode>,
{
    Ok(WindowHashes {
        tokens: tokens.into_iter(),
        hasher: RollingHash::new(k)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct evaluation of the window polynomial, zero-padded on the left.
    fn naive_hash(tokens: &[TokenCode], end: usize, k: usize) -> u64 {
        let mut h = 0u64;
        let start = (end + 1).saturating_sub(k);
        for &t in &tokens[start..=end] {
            h = (h * BASE + u64::from(t)) % MODULUS;
        }
        h
    }

    fn hashes(tokens: &[TokenCode], k: usize) -> Vec<u64> {
        window_hashes(tokens.iter().copied(), k).unwrap().collect()
    }

    #[test]
    fn mod_pow_matches_repeated_multiplication() {
        let mut expected = 1u64;
        for exp in 0..40u64 {
            assert_eq!(mod_pow(BASE, exp, MODULUS), expected, "exp={exp}");
            expected = expected * BASE % MODULUS;
        }
    }

    #[test]
    fn zero_k_is_rejected() {
        assert_eq!(
            RollingHash::new(0).unwrap_err(),
            FingerprintError::InvalidConfigK { k: 0 }
        );
        assert!(window_hashes(Vec::<TokenCode>::new(), 0).is_err());
    }

    #[test]
    fn oversized_k_is_rejected_without_allocating() {
        assert_eq!(
            RollingHash::new(usize::MAX).unwrap_err(),
            FingerprintError::InvalidConfigK { k: usize::MAX }
        );
        assert!(RollingHash::new(MAX_WINDOW).is_ok());
    }

    #[test]
    fn one_hash_per_token() {
        let tokens: Vec<TokenCode> = (1..=10).collect();
        assert_eq!(hashes(&tokens, 3).len(), tokens.len());
        assert!(hashes(&[], 3).is_empty());
    }

    #[test]
    fn incremental_matches_polynomial() {
        let tokens: Vec<TokenCode> = vec![7, 300, 65_535, 0, 12, 12, 9, 40_000, 1, 2, 3];
        for k in 1..=5 {
            let rolled = hashes(&tokens, k);
            for (i, &h) in rolled.iter().enumerate() {
                assert_eq!(h, naive_hash(&tokens, i, k), "k={k} i={i}");
                assert!(h < MODULUS);
            }
        }
    }

    #[test]
    fn first_values_hash_zero_padded_windows() {
        let mut hasher = RollingHash::new(3).unwrap();
        assert_eq!(hasher.push(5), 5);
        assert_eq!(hasher.push(6), (5 * BASE + 6) % MODULUS);
        assert_eq!(hasher.current(), (5 * BASE + 6) % MODULUS);
    }

    #[test]
    fn identical_sequences_hash_identically() {
        let tokens: Vec<TokenCode> = vec![4, 8, 15, 16, 23, 42, 4, 8];
        assert_eq!(hashes(&tokens, 4), hashes(&tokens, 4));
    }

    #[test]
    fn equal_windows_at_different_offsets_collide() {
        let tokens: Vec<TokenCode> = vec![1, 2, 3, 9, 9, 1, 2, 3];
        let h = hashes(&tokens, 3);
        assert_eq!(h[2], h[7]);
    }

    #[test]
    fn changing_a_token_changes_every_covering_window() {
        let k = 4;
        let original: Vec<TokenCode> = (10..30).collect();
        let base = hashes(&original, k);
        for pos in 0..original.len() {
            let mut changed = original.clone();
            changed[pos] = changed[pos].wrapping_add(1);
            let other = hashes(&changed, k);
            for i in 0..original.len() {
                let covers = i >= pos && i < pos + k;
                assert_eq!(base[i] != other[i], covers, "pos={pos} i={i}");
            }
        }
    }

    #[test]
    fn size_hint_follows_tokens() {
        let tokens: Vec<TokenCode> = vec![1, 2, 3, 4];
        let it = window_hashes(tokens, 2).unwrap();
        assert_eq!(it.len(), 4);
    }
}
