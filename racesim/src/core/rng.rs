//! Deterministic random number generation for a single race.
//!
//! Every stochastic draw of a race (qualifying noise, DNF rolls, punctures, overtakes, incidents,
//! pit decisions and finishing gaps) flows through one `RaceRng`. Seeding it makes a whole race
//! reproducible, which the automated tests rely on.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use rand_pcg::Pcg64Mcg;

#[derive(Debug, Clone)]
pub struct RaceRng {
    inner: Pcg64Mcg,
}

impl RaceRng {
    /// Creates a seeded RNG, or one seeded from system entropy if `seed` is None.
    pub fn new(seed: Option<u64>) -> Self {
        let inner = match seed {
            Some(seed) => Pcg64Mcg::seed_from_u64(seed),
            None => Pcg64Mcg::from_entropy(),
        };
        RaceRng { inner }
    }

    /// Uniform draw in [lo, hi). Returns lo if the range is empty.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        Uniform::new(lo, hi).sample(&mut self.inner)
    }

    /// Uniform draw in [0, 100), the shared convention for all probability checks.
    pub fn percent(&mut self) -> f64 {
        self.uniform(0.0, 100.0)
    }

    /// Returns true with the given probability in percent.
    pub fn chance_pct(&mut self, probability_pct: f64) -> bool {
        self.percent() < probability_pct
    }

    /// Uniform integer in [lo, hi] (inclusive). Returns lo if hi < lo.
    pub fn int_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        Uniform::new_inclusive(lo, hi).sample(&mut self.inner)
    }

    /// Uniform index in [0, n). n must be > 0.
    pub fn index(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        Uniform::new(0, n).sample(&mut self.inner)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RaceRng::new(Some(7));
        let mut b = RaceRng::new(Some(7));
        for _ in 0..100 {
            assert_eq!(a.percent(), b.percent());
        }
        assert_eq!(a.int_inclusive(3, 9), b.int_inclusive(3, 9));
    }

    #[test]
    fn ranges_are_respected() {
        let mut rng = RaceRng::new(Some(1));
        for _ in 0..1000 {
            let v = rng.uniform(-0.2, 0.4);
            assert!((-0.2..0.4).contains(&v));
            let p = rng.percent();
            assert!((0.0..100.0).contains(&p));
            let i = rng.int_inclusive(13, 37);
            assert!((13..=37).contains(&i));
        }
        assert_eq!(rng.uniform(1.0, 1.0), 1.0);
    }
}
