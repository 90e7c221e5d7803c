//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initialises logging
//! - parses CLI arguments into config values
//! - runs dataset generation, single pricing, analysis, or dataset checks
//! - prints reports and writes output files

use std::io::{self, Write};

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, CheckArgs, Command, GenerateArgs, PriceArgs};
use crate::data::{DetectorClient, compute_stats, generate_dataset};
use crate::domain::{BatchConfig, ConditionSet, NormalizerConfig, PricingConfig};
use crate::error::AppError;
use crate::normalize::Normalizer;
use crate::valuation::ValuationEngine;

pub mod pipeline;

/// Entry point for the `herdval` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Generate(args) => handle_generate(args),
        Command::Price(args) => handle_price(args),
        Command::Analyze(args) => handle_analyze(args),
        Command::Check(args) => handle_check(args),
    }
}

/// Logs go to stderr so stdout stays usable for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. in tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = batch_config_from_args(&args);
    let engine = ValuationEngine::new(args.pricing.to_config());

    let entries = generate_dataset(&config, &engine)?;
    crate::io::write_dataset_json(&args.output, &entries)?;

    if let Some(stats) = compute_stats(&entries) {
        println!("{}", crate::report::format_dataset_summary(&stats, &config));
    }
    if args.preview > 0 {
        println!("{}", crate::report::format_entries(&entries, args.preview));
    }
    println!("Wrote {} entries to {}", entries.len(), args.output.display());
    Ok(())
}

fn handle_price(args: PriceArgs) -> Result<(), AppError> {
    let pricing = args.pricing.to_config();
    pricing.validate()?;
    let engine = ValuationEngine::new(pricing);

    let conditions = ConditionSet::from_labels(&args.conditions);
    let mut rng = seeded_rng(args.seed);
    let price = engine.price_label(args.sex, &args.age, &conditions, &mut rng)?;

    println!("{price}");
    Ok(())
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let normalizer = Normalizer::new(normalizer_config_from_args(&args));
    let pricing = args.pricing.to_config();
    pricing.validate()?;
    let engine = ValuationEngine::new(pricing);
    let detector = DetectorClient::from_env()?;
    let mut rng = seeded_rng(args.seed);

    let out = pipeline::run_analyze(
        &detector,
        &normalizer,
        args.price.then_some(&engine),
        &mut rng,
        &args.animal_id,
        &args.image,
    )?;

    match &args.output {
        Some(path) => {
            crate::io::write_metadata_json(path, &out.record)?;
            eprintln!("{}", crate::report::format_observation(&out.observation, &out.record));
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            crate::io::write_metadata(&mut lock, &out.record)?;
            writeln!(lock).map_err(|e| AppError::new(4, format!("Failed to write stdout: {e}")))?;
        }
    }

    if let Some(err) = out.valuation_error {
        return Err(err.into());
    }
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let entries = crate::io::read_dataset_json(&args.dataset)?;
    let pricing = PricingConfig {
        floor: args.floor,
        ..PricingConfig::default()
    };
    let errors = crate::io::validate_entries(&entries, &pricing);

    for err in &errors {
        println!("entry {}: {}", err.index, err.message);
    }
    if let Some(stats) = compute_stats(&entries) {
        println!(
            "{} entries | healthy={} | price=[{}, {}]",
            stats.n_entries, stats.n_healthy, stats.price_min, stats.price_max
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::new(
            3,
            format!("{} of {} entries violate the dataset contract.", errors.len(), entries.len()),
        ))
    }
}

pub fn batch_config_from_args(args: &GenerateArgs) -> BatchConfig {
    BatchConfig {
        count: args.count,
        seed: args.seed,
        parallel: !args.sequential,
        healthy_probability: args.healthy_probability,
        ..BatchConfig::default()
    }
}

pub fn normalizer_config_from_args(args: &AnalyzeArgs) -> NormalizerConfig {
    NormalizerConfig {
        age_mode: args.age_mode,
        sex_policy: args.sex_policy,
        breed_age_heuristic: args.breed_age_heuristic,
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
