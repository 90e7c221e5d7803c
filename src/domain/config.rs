//! Immutable configuration values passed into each component.
//!
//! Nothing in the core reads module-level state; callers (the CLI, tests) build one of
//! these and hand it over.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{AgeBucket, HEALTHY};
use crate::error::AppError;

/// Constants of the pricing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Price of a newborn female with no detected condition.
    pub base_price: i64,
    /// Deducted once per year of age.
    pub per_year_decrement: i64,
    pub male_bonus: i64,
    /// Deducted when the animal is not `healthy`.
    pub condition_penalty: i64,
    /// Perturbation is drawn uniformly from `[-spread, spread]`.
    pub perturbation_spread: i64,
    /// Hard minimum price.
    pub floor: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: 5000,
            per_year_decrement: 300,
            male_bonus: 200,
            condition_penalty: 500,
            perturbation_spread: 200,
            floor: 1000,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.floor < 0 {
            return Err(AppError::new(2, "Price floor must be >= 0."));
        }
        if self.perturbation_spread < 0 {
            return Err(AppError::new(2, "Perturbation spread must be >= 0."));
        }
        if self.per_year_decrement < 0 {
            return Err(AppError::new(2, "Per-year decrement must be >= 0."));
        }
        Ok(())
    }
}

/// Which age representation a pipeline instance runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgeMode {
    /// Continuous estimate in years.
    Continuous,
    /// One of the fixed `1Y`..`15Y` bins.
    Bucketed,
}

/// What "no male-indicating feature found" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SexPolicy {
    /// Treat the absence of the feature as `Female`.
    AssumeFemale,
    /// Keep the absence of evidence as `Unknown`.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub age_mode: AgeMode,
    pub sex_policy: SexPolicy,
    /// Estimate age from the breed label when the age detector gives nothing.
    ///
    /// Only applies in `Continuous` mode.
    pub breed_age_heuristic: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            age_mode: AgeMode::Bucketed,
            sex_policy: SexPolicy::AssumeFemale,
            breed_age_heuristic: false,
        }
    }
}

/// Sampling policy of the dataset batch generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub count: usize,
    pub seed: u64,
    /// Generate entries on the rayon pool instead of the calling thread.
    pub parallel: bool,
    /// Probability that an entry is `{healthy}`.
    pub healthy_probability: f64,
    pub age_buckets: Vec<AgeBucket>,
    /// Non-healthy conditions an unhealthy entry draws from.
    pub condition_vocabulary: Vec<String>,
    pub min_conditions: usize,
    pub max_conditions: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            seed: 42,
            parallel: true,
            healthy_probability: 0.7,
            // The generator samples 1Y..14Y; 15Y is valid input but never generated.
            age_buckets: (1..=14).filter_map(AgeBucket::new).collect(),
            condition_vocabulary: ["Dermatitis", "Ecthym", "Respiratory", "lumpy", "Skin"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            min_conditions: 1,
            max_conditions: 2,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.count == 0 {
            return Err(AppError::new(2, "Batch size must be > 0."));
        }
        if !(0.0..=1.0).contains(&self.healthy_probability) {
            return Err(AppError::new(2, "Healthy probability must be within [0, 1]."));
        }
        if self.age_buckets.is_empty() {
            return Err(AppError::new(2, "At least one age bucket is required."));
        }
        if self
            .condition_vocabulary
            .iter()
            .any(|label| label.trim().is_empty() || label.eq_ignore_ascii_case(HEALTHY))
        {
            return Err(AppError::new(
                2,
                "Condition vocabulary must not contain blank or 'healthy' labels.",
            ));
        }
        if self.min_conditions == 0
            || self.min_conditions > self.max_conditions
            || self.max_conditions > self.condition_vocabulary.len()
        {
            return Err(AppError::new(
                2,
                "Condition subset bounds must satisfy 1 <= min <= max <= vocabulary size.",
            ));
        }
        Ok(())
    }
}
