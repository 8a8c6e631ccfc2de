//! Process-wide random source
//!
//! One generator, seeded once from OS entropy, shared by shard selection
//! and identifier generation. Cloning shares the same generator.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Thread-safe handle to a seeded generator
#[derive(Debug, Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence, for tests
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    /// Uniform index in `0..bound`
    pub fn index(&self, bound: usize) -> usize {
        self.inner.lock().gen_range(0..bound)
    }

    /// `count` random decimal digits
    pub fn digits(&self, count: u32) -> String {
        let mut rng = self.inner.lock();
        (0..count)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
