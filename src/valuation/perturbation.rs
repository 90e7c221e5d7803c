//! Sources of the price perturbation term.

use rand::Rng;

/// Draws the integer noise term added to a base price.
///
/// Any `rand::Rng` is a source; seed it (e.g. `StdRng::seed_from_u64`) to make draws
/// reproducible.
pub trait PerturbationSource {
    /// Draw a value in `[-spread, spread]`.
    fn draw(&mut self, spread: i64) -> i64;
}

impl<R: Rng + ?Sized> PerturbationSource for R {
    fn draw(&mut self, spread: i64) -> i64 {
        if spread <= 0 {
            return 0;
        }
        self.gen_range(-spread..=spread)
    }
}

/// Always returns the same offset, clamped into the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPerturbation(pub i64);

impl PerturbationSource for FixedPerturbation {
    fn draw(&mut self, spread: i64) -> i64 {
        let spread = spread.max(0);
        self.0.clamp(-spread, spread)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn rng_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let n = rng.draw(200);
            assert!((-200..=200).contains(&n));
        }
        assert_eq!(rng.draw(0), 0);
    }

    #[test]
    fn fixed_perturbation_is_clamped_to_spread() {
        assert_eq!(FixedPerturbation(-200).draw(200), -200);
        assert_eq!(FixedPerturbation(500).draw(200), 200);
        assert_eq!(FixedPerturbation(50).draw(0), 0);
    }
}
