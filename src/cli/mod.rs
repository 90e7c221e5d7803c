//! Command-line parsing for the herd valuation tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! normalization/valuation code. Handlers in `app` turn these into config values.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AgeMode, PricingConfig, Sex, SexPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "herdval", version, about = "Cattle observation normalizer and synthetic valuation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic (input, price) training dataset and write it as JSON.
    Generate(GenerateArgs),
    /// Price a single (sex, age, conditions) triple.
    Price(PriceArgs),
    /// Run the detector on an image and emit a metadata record.
    Analyze(AnalyzeArgs),
    /// Load a dataset JSON file and check every entry against the output contract.
    Check(CheckArgs),
}

/// Pricing constants (defaults reproduce the reference model).
#[derive(Debug, Args, Clone)]
pub struct PricingArgs {
    /// Price of a newborn female with no detected condition.
    #[arg(long, default_value_t = 5000)]
    pub base_price: i64,

    /// Deduction per year of age.
    #[arg(long, default_value_t = 300)]
    pub per_year: i64,

    #[arg(long, default_value_t = 200)]
    pub male_bonus: i64,

    /// Deduction when any condition other than `healthy` is present.
    #[arg(long, default_value_t = 500)]
    pub condition_penalty: i64,

    /// Perturbation is drawn uniformly from [-spread, spread].
    #[arg(long, default_value_t = 200)]
    pub spread: i64,

    /// Hard minimum price.
    #[arg(long, default_value_t = 1000)]
    pub floor: i64,
}

impl PricingArgs {
    pub fn to_config(&self) -> PricingConfig {
        PricingConfig {
            base_price: self.base_price,
            per_year_decrement: self.per_year,
            male_bonus: self.male_bonus,
            condition_penalty: self.condition_penalty,
            perturbation_spread: self.spread,
            floor: self.floor,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Number of entries to generate.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: usize,

    /// Random seed; the same seed always produces the same dataset.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output JSON path.
    #[arg(short = 'o', long, default_value = "cattle_training_dataset.json")]
    pub output: PathBuf,

    /// Generate on the calling thread instead of the rayon pool.
    #[arg(long)]
    pub sequential: bool,

    /// Probability that an entry is `healthy`.
    #[arg(long, default_value_t = 0.7)]
    pub healthy_probability: f64,

    /// Print the first N entries after writing.
    #[arg(long, default_value_t = 10)]
    pub preview: usize,

    #[command(flatten)]
    pub pricing: PricingArgs,
}

#[derive(Debug, Args, Clone)]
pub struct PriceArgs {
    #[arg(long, value_enum)]
    pub sex: Sex,

    /// Age bucket such as `7Y` (a bare number of years is accepted).
    #[arg(long)]
    pub age: String,

    /// Detected condition; repeat for several. Omit for `healthy`.
    #[arg(long = "condition")]
    pub conditions: Vec<String>,

    /// Seed for the perturbation draw (random if omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub pricing: PricingArgs,
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Image of the animal.
    #[arg(long, value_name = "IMAGE")]
    pub image: PathBuf,

    /// Caller-assigned identifier of the animal record.
    #[arg(long, default_value = "ZAURO-001")]
    pub animal_id: String,

    /// Write the metadata record here instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = AgeMode::Bucketed)]
    pub age_mode: AgeMode,

    /// How to read "no male-indicating feature found".
    #[arg(long, value_enum, default_value_t = SexPolicy::AssumeFemale)]
    pub sex_policy: SexPolicy,

    /// Estimate age from the breed when the age model gives nothing (continuous mode only).
    #[arg(long)]
    pub breed_age_heuristic: bool,

    /// Also price the animal and include the price in the record.
    #[arg(long)]
    pub price: bool,

    /// Seed for the perturbation draw (random if omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub pricing: PricingArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    /// Dataset JSON produced by `herdval generate`.
    #[arg(long, value_name = "JSON")]
    pub dataset: PathBuf,

    /// Price floor the entries must respect.
    #[arg(long, default_value_t = 1000)]
    pub floor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_defaults_match_reference_model() {
        let cli = Cli::parse_from(["herdval", "price", "--sex", "male", "--age", "10Y"]);
        let Command::Price(args) = cli.command else {
            panic!("expected price command");
        };
        assert_eq!(args.pricing.to_config(), PricingConfig::default());
        assert!(args.conditions.is_empty());
        assert_eq!(args.sex, Sex::Male);
    }

    #[test]
    fn repeated_conditions_are_collected() {
        let cli = Cli::parse_from([
            "herdval", "price", "--sex", "female", "--age", "3Y", "--condition", "lumpy",
            "--condition", "Skin", "--seed", "9",
        ]);
        let Command::Price(args) = cli.command else {
            panic!("expected price command");
        };
        assert_eq!(args.conditions, vec!["lumpy".to_string(), "Skin".to_string()]);
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::parse_from([
            "herdval",
            "analyze",
            "--image",
            "cow.jpg",
            "--age-mode",
            "continuous",
            "--sex-policy",
            "undetermined",
            "--price",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.age_mode, AgeMode::Continuous);
        assert_eq!(args.sex_policy, SexPolicy::Undetermined);
        assert!(args.price);
        assert_eq!(args.animal_id, "ZAURO-001");
    }
}
