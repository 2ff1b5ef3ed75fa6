//! Seeded random source for the evolutionary driver.

use rand::prelude::*;

/// Random number generator wrapper for population operations.
///
/// The driver draws every random decision from one seeded stream. Parallel
/// work gets its own [`StdRng`] derived from [`PaintingRng::worker`], so a
/// fixed seed reproduces a run regardless of thread scheduling.
pub struct PaintingRng {
    rng: StdRng,
}

impl PaintingRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform index in `0..len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }

    /// Next raw seed for deriving independent streams.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Independent generator for one unit of parallel work.
    pub fn worker(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.next_seed())
    }

    /// Borrow the underlying generator.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = PaintingRng::new(9);
        let mut b = PaintingRng::new(9);
        for _ in 0..10 {
            assert_eq!(a.next_seed(), b.next_seed());
        }
        assert_eq!(a.worker().r#gen::<u64>(), b.worker().r#gen::<u64>());
    }

    #[test]
    fn test_index_in_range() {
        let mut rng = PaintingRng::new(3);
        for len in 1..20 {
            assert!(rng.index(len) < len);
        }
        assert_eq!(rng.index(0), 0);
    }
}
