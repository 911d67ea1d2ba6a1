use rand::{Rng, rng};

/// Exclusive upper bound for freshly seeded sequence values.
///
/// Each new millisecond starts the sequence at a random value below this
/// bound instead of zero, so the low bits stay spread out for downstream
/// systems that shard on `id mod N`.
pub const SEQUENCE_SEED_BOUND: i64 = 100;

/// A source of sequence seeds.
pub trait RandSource {
    /// Returns a fresh sequence seed in `[0, SEQUENCE_SEED_BOUND)`.
    fn sequence_seed(&self) -> i64;
}

/// A `RandSource` backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn sequence_seed(&self) -> i64 {
        rng().random_range(0..SEQUENCE_SEED_BOUND)
    }
}
