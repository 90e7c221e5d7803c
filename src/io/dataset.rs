//! Read/write dataset JSON files.
//!
//! A dataset file is a single JSON array:
//!
//! ```json
//! [
//!   { "input": { "sex": "Male", "age": "3Y", "health": ["healthy"] }, "output": 4308 }
//! ]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::{Age, PricedObservation, PricingConfig};
use crate::error::AppError;

pub fn write_dataset_json(path: &Path, entries: &[PricedObservation]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, entries)
        .map_err(|e| AppError::new(4, format!("Failed to write dataset JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write dataset JSON: {e}")))?;

    info!(path = %path.display(), entries = entries.len(), "dataset written");
    Ok(())
}

pub fn read_dataset_json(path: &Path) -> Result<Vec<PricedObservation>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset JSON '{}': {e}", path.display())))?;
    let entries: Vec<PricedObservation> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            if e.is_data() {
                AppError::new(3, format!("Dataset entry violates the dataset contract: {e}"))
            } else {
                AppError::new(2, format!("Invalid dataset JSON: {e}"))
            }
        })?;
    Ok(entries)
}

/// A dataset entry that breaks an output invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryError {
    pub index: usize,
    pub message: String,
}

/// Check loaded entries against the output contract: bucketed ages and prices at or
/// above the floor. Broken condition sets (empty, or `healthy` mixed with a disease)
/// are rejected by [`read_dataset_json`] itself.
pub fn validate_entries(entries: &[PricedObservation], pricing: &PricingConfig) -> Vec<EntryError> {
    let mut errors = Vec::new();
    for (index, e) in entries.iter().enumerate() {
        if !matches!(e.input.age, Age::Bucket(_)) {
            errors.push(EntryError {
                index,
                message: format!("age '{}' is not a bucket label", e.input.age),
            });
        }
        if e.price < pricing.floor {
            errors.push(EntryError {
                index,
                message: format!("price {} is below the floor {}", e.price, pricing.floor),
            });
        }
    }
    errors
}
