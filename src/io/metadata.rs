//! Per-animal metadata record.
//!
//! One JSON document per pipeline run, flattening an [`AnimalObservation`] into the
//! shape downstream consumers expect. `disease` is the highest-confidence finding (or
//! `healthy`); `conditions` lists every label. `degraded` names the detector fields that
//! went unanswered, so a `healthy` record from an unreachable disease model is visible.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    Age, AnimalObservation, Breed, Confidence, ConditionSet, HEALTHY, HealthStatus, SexCall,
};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub animal_id: String,
    pub timestamp: DateTime<Utc>,
    pub breed: Breed,
    pub breed_confidence: Confidence,
    pub age: Age,
    pub sex: SexCall,
    pub disease: String,
    pub disease_confidence: Confidence,
    pub health_status: HealthStatus,
    pub conditions: ConditionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

impl MetadataRecord {
    pub fn from_observation(observation: &AnimalObservation, price: Option<i64>) -> Self {
        let (disease, disease_confidence) = match observation.primary_finding() {
            Some(finding) => (finding.label.clone(), finding.confidence),
            None if observation.conditions.is_healthy() => (HEALTHY.to_string(), Confidence::ZERO),
            // Labels reported without usable scores.
            None => (
                observation.conditions.iter().next().unwrap_or(HEALTHY).to_string(),
                Confidence::ZERO,
            ),
        };

        Self {
            animal_id: observation.animal_id.clone(),
            timestamp: observation.timestamp,
            breed: observation.breed.clone(),
            breed_confidence: observation.breed_confidence,
            age: observation.age,
            sex: observation.sex,
            disease,
            disease_confidence,
            health_status: observation.health_status(),
            conditions: observation.conditions.clone(),
            price,
            degraded: Vec::new(),
        }
    }

    pub fn with_degraded<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.degraded = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Serialize a record as pretty JSON to any writer (a file, stdout).
pub fn write_metadata<W: Write>(writer: W, record: &MetadataRecord) -> Result<(), AppError> {
    serde_json::to_writer_pretty(writer, record)
        .map_err(|e| AppError::new(4, format!("Failed to write metadata JSON: {e}")))
}

pub fn write_metadata_json(path: &Path, record: &MetadataRecord) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create metadata JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    write_metadata(&mut writer, record)?;
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write metadata JSON: {e}")))?;

    info!(path = %path.display(), animal_id = %record.animal_id, "metadata written");
    Ok(())
}

pub fn read_metadata_json(path: &Path) -> Result<MetadataRecord, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open metadata JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid metadata JSON: {e}")))
}
