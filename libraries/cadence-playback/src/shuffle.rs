//! Shuffle permutations for the queue
//!
//! The queue never reorders its tracks when shuffling. It keeps a
//! permutation of indices into its insertion-ordered items instead, so
//! turning shuffle off restores the original order exactly.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Build a shuffled permutation of `0..len`
///
/// Fisher-Yates over a seeded RNG: the same seed and length always give the
/// same permutation. When `anchor` is given, that index is moved to the
/// front so the current track stays current and everything else is upcoming.
pub fn shuffled_order(len: usize, seed: u64, anchor: Option<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    if let Some(anchor) = anchor {
        if let Some(pos) = order.iter().position(|&i| i == anchor) {
            order.swap(0, pos);
        }
    }

    order
}

/// Check that `order` is a permutation of `0..len`
pub fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }

    let mut seen = vec![false; len];
    for &i in order {
        if i >= len || seen[i] {
            return false;
        }
        seen[i] = true;
    }

    true
}
