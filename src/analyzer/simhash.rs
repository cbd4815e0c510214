//! 64-bit feature-hashed SimHash over a multiset of stems, and Hamming
//! distance between fingerprints. Any 64-bit feature hash is acceptable per
//! spec.md §9; the Hamming-distance threshold is the only invariant.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn hash64(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Computes a 64-bit SimHash fingerprint over an unweighted multiset of stems
/// (repeated stems contribute their weight multiple times, as a multiset).
pub fn fingerprint<'a>(stems: impl Iterator<Item = &'a str>) -> u64 {
    let mut bit_votes = [0i64; 64];
    let mut any = false;

    for stem in stems {
        any = true;
        let h = hash64(stem);
        for (bit, vote) in bit_votes.iter_mut().enumerate() {
            if (h >> bit) & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    if !any {
        return 0;
    }

    let mut result: u64 = 0;
    for (bit, vote) in bit_votes.iter().enumerate() {
        if *vote > 0 {
            result |= 1 << bit;
        }
    }
    result
}

/// Hamming distance between two fingerprints.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_stem_sets_produce_identical_fingerprints() {
        let stems = vec!["machin", "learn", "cours"];
        let a = fingerprint(stems.iter().copied());
        let b = fingerprint(stems.iter().copied());
        assert_eq!(a, b);
        assert_eq!(hamming_distance(a, b), 0);
    }

    #[test]
    fn near_identical_sets_stay_close() {
        let a = fingerprint(["machin", "learn", "cours", "onlin"].into_iter());
        let b = fingerprint(["machin", "learn", "cours", "video"].into_iter());
        assert!(hamming_distance(a, b) <= 32);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(fingerprint(std::iter::empty()), 0);
    }
}
