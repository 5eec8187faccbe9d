//! Gift-exchange pairing.
//!
//! Participants are shuffled and linked into a single cycle: the giver at
//! position `i` gives to the participant at `(i + 1) % n`. For `n >= 2` every
//! participant gives exactly once, receives exactly once and never draws
//! themselves.

use rand::Rng;
use rand::seq::SliceRandom;

/// One giver -> receiver pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing<T> {
    pub giver: T,
    pub receiver: T,
}

/// Builds a single-cycle derangement over `participants`.
///
/// Returns an empty plan for fewer than two participants; callers reject
/// that case before reaching here.
pub fn plan_cycle<T: Copy, R: Rng + ?Sized>(participants: &[T], rng: &mut R) -> Vec<Pairing<T>> {
    if participants.len() < 2 {
        return Vec::new();
    }

    let mut shuffled = participants.to_vec();
    shuffled.shuffle(rng);

    let n = shuffled.len();
    (0..n)
        .map(|i| Pairing {
            giver: shuffled[i],
            receiver: shuffled[(i + 1) % n],
        })
        .collect()
}
