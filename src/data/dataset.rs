//! Synthetic training dataset generation.
//!
//! Each entry is drawn independently:
//! - sex uniform over `{Male, Female}`
//! - age uniform over the configured buckets
//! - `{healthy}` with `healthy_probability`, else a random subset of the condition
//!   vocabulary sized `min_conditions..=max_conditions`
//!
//! and then priced by the valuation engine. Entry `i` draws from its own RNG seeded
//! from `(seed, i)`, so a batch is identical whether generated sequentially or on the
//! rayon pool.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Bernoulli;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{Age, BatchConfig, ConditionSet, PricedObservation, Sex, ValuationInput};
use crate::error::{AppError, ValuationError};
use crate::valuation::ValuationEngine;

/// Generate a batch of priced entries.
///
/// Entries whose valuation fails are logged and skipped; the rest of the batch is
/// still produced.
pub fn generate_dataset(
    config: &BatchConfig,
    engine: &ValuationEngine,
) -> Result<Vec<PricedObservation>, AppError> {
    config.validate()?;
    engine.config().validate()?;

    let healthy = Bernoulli::new(config.healthy_probability)
        .map_err(|e| AppError::new(2, format!("Healthy probability error: {e}")))?;

    let entry = |index: usize| -> Option<PricedObservation> {
        let mut rng = StdRng::seed_from_u64(entry_seed(config.seed, index));
        match generate_entry(&mut rng, config, &healthy, engine) {
            Ok(priced) => Some(priced),
            Err(err) => {
                warn!(index, %err, "skipping dataset entry");
                None
            }
        }
    };

    let entries: Vec<PricedObservation> = if config.parallel {
        (0..config.count).into_par_iter().filter_map(entry).collect()
    } else {
        (0..config.count).filter_map(entry).collect()
    };

    info!(
        requested = config.count,
        generated = entries.len(),
        seed = config.seed,
        "dataset generated"
    );
    Ok(entries)
}

/// Draw and price one entry.
pub fn generate_entry<R: Rng + ?Sized>(
    rng: &mut R,
    config: &BatchConfig,
    healthy: &Bernoulli,
    engine: &ValuationEngine,
) -> Result<PricedObservation, ValuationError> {
    let input = sample_input(rng, config, healthy)?;
    engine.price_input(input, rng)
}

/// Draw one valuation input according to the batch sampling policy.
pub fn sample_input<R: Rng + ?Sized>(
    rng: &mut R,
    config: &BatchConfig,
    healthy: &Bernoulli,
) -> Result<ValuationInput, ValuationError> {
    let sex = *Sex::ALL.choose(rng).unwrap_or(&Sex::Female);
    let age = config
        .age_buckets
        .choose(rng)
        .copied()
        .map(Age::Bucket)
        .ok_or_else(|| ValuationError::InvalidAge {
            age: "no age buckets configured".to_string(),
        })?;

    let health = if healthy.sample(rng) {
        ConditionSet::healthy()
    } else {
        let size = rng.gen_range(config.min_conditions..=config.max_conditions);
        ConditionSet::from_labels(config.condition_vocabulary.choose_multiple(rng, size))
    };

    Ok(ValuationInput { sex, age, health })
}

/// Stable per-entry seed (splitmix64 finalizer over seed and index).
fn entry_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Summary stats about a generated or loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_entries: usize,
    pub n_healthy: usize,
    pub n_male: usize,
    pub price_min: i64,
    pub price_max: i64,
    pub price_mean: f64,
}

pub fn compute_stats(entries: &[PricedObservation]) -> Option<DatasetStats> {
    if entries.is_empty() {
        return None;
    }

    let mut price_min = i64::MAX;
    let mut price_max = i64::MIN;
    let mut total = 0.0;
    let mut n_healthy = 0;
    let mut n_male = 0;

    for e in entries {
        price_min = price_min.min(e.price);
        price_max = price_max.max(e.price);
        total += e.price as f64;
        if e.input.health.is_healthy() {
            n_healthy += 1;
        }
        if e.input.sex == Sex::Male {
            n_male += 1;
        }
    }

    Some(DatasetStats {
        n_entries: entries.len(),
        n_healthy,
        n_male,
        price_min,
        price_max,
        price_mean: total / entries.len() as f64,
    })
}
