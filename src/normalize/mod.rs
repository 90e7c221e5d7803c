//! Observation normalizer: raw detector results to an [`AnimalObservation`].
//!
//! The raw types here are the boundary between the loosely structured detector output
//! and the typed domain model. Nothing in this module fails: a field the detector could
//! not supply degrades to its `Unknown` sentinel, and an empty or sentinel-only disease
//! report becomes `{healthy}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{
    Age, AgeBucket, AgeMode, AnimalObservation, Breed, Confidence, ConditionSet, Finding,
    NormalizerConfig, SexCall, SexPolicy, UNKNOWN, is_no_finding,
};

/// A single `(label, confidence)` pair as reported by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Some detectors only return class names.
    pub confidence: Option<f64>,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: Some(confidence),
        }
    }

    pub fn label_only(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
        }
    }
}

/// Age as reported upstream, before it is fitted to the pipeline's [`AgeMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawAge {
    Years(f64),
    Label(String),
    Missing,
}

/// What the sex detector saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexEvidence {
    MaleFeatureFound,
    /// The detector answered and found no male-indicating feature.
    NoMaleFeature,
    /// The detector did not answer usefully.
    Unavailable,
}

/// Raw per-animal detector output.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub animal_id: String,
    /// `None` when the breed detector was unavailable.
    pub breed: Option<Prediction>,
    pub age: RawAge,
    pub sex: SexEvidence,
    pub diseases: Vec<Prediction>,
    /// Detector fields that could not be answered (`breed`, `age`, `sex`, `disease`).
    pub degraded: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Breed-based age estimate, when enabled and the pipeline runs in continuous mode.
    fn heuristic_age(&self, breed: &Breed) -> Option<Age> {
        if !self.config.breed_age_heuristic || self.config.age_mode != AgeMode::Continuous {
            return None;
        }
        match breed {
            Breed::Known(label) => Some(Age::Years(breed_age_estimate(label))),
            Breed::Unknown => None,
        }
    }

    /// Normalize, stamping the record with the current UTC time.
    pub fn normalize(&self, raw: RawObservation) -> AnimalObservation {
        self.normalize_at(raw, Utc::now())
    }

    pub fn normalize_at(&self, raw: RawObservation, timestamp: DateTime<Utc>) -> AnimalObservation {
        let (breed, breed_confidence) = normalize_breed(&raw.animal_id, raw.breed);

        let mut age = normalize_age(&raw.animal_id, &raw.age, self.config.age_mode);
        if age.is_unknown() {
            age = self.heuristic_age(&breed).unwrap_or(age);
        }

        let sex = match (raw.sex, self.config.sex_policy) {
            (SexEvidence::MaleFeatureFound, _) => SexCall::Male,
            (SexEvidence::NoMaleFeature, SexPolicy::AssumeFemale) => SexCall::Female,
            (SexEvidence::NoMaleFeature, SexPolicy::Undetermined) => SexCall::Unknown,
            (SexEvidence::Unavailable, _) => SexCall::Unknown,
        };

        let conditions = ConditionSet::from_labels(raw.diseases.iter().map(|p| p.label.as_str()));
        let findings = if conditions.is_healthy() {
            Vec::new()
        } else {
            collect_findings(&raw.animal_id, &raw.diseases)
        };

        AnimalObservation {
            animal_id: raw.animal_id,
            timestamp,
            breed,
            breed_confidence,
            age,
            sex,
            conditions,
            findings,
        }
    }
}

fn normalize_breed(animal_id: &str, breed: Option<Prediction>) -> (Breed, Confidence) {
    let Some(prediction) = breed else {
        return (Breed::Unknown, Confidence::ZERO);
    };

    let breed = Breed::from(prediction.label);
    if breed == Breed::Unknown {
        return (Breed::Unknown, Confidence::ZERO);
    }

    match prediction.confidence.map(Confidence::new) {
        Some(Some(confidence)) => (breed, confidence),
        Some(None) | None => {
            warn!(
                animal_id,
                confidence = ?prediction.confidence,
                "breed confidence missing or outside [0, 1]; treating breed as unknown"
            );
            (Breed::Unknown, Confidence::ZERO)
        }
    }
}

fn normalize_age(animal_id: &str, raw: &RawAge, mode: AgeMode) -> Age {
    let age = match (raw, mode) {
        (RawAge::Missing, _) => return Age::Unknown,
        (RawAge::Label(label), _) if label.trim().is_empty() || label.trim() == UNKNOWN => {
            return Age::Unknown;
        }
        (RawAge::Label(label), AgeMode::Bucketed) => AgeBucket::parse(label).map(Age::Bucket),
        (RawAge::Label(label), AgeMode::Continuous) => {
            AgeBucket::parse(label).map(|b| Age::Years(f64::from(b.years())))
        }
        (RawAge::Years(years), AgeMode::Bucketed) => whole_years(*years)
            .and_then(AgeBucket::new)
            .map(Age::Bucket),
        (RawAge::Years(years), AgeMode::Continuous) => {
            (years.is_finite() && *years >= 0.0).then_some(Age::Years(*years))
        }
    };

    age.unwrap_or_else(|| {
        warn!(animal_id, raw = ?raw, ?mode, "age does not fit the pipeline's age mode; using Unknown");
        Age::Unknown
    })
}

fn whole_years(years: f64) -> Option<u8> {
    (years.is_finite() && years.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&years))
        .then_some(years as u8)
}

/// Rough age guess from the breed label alone.
pub fn breed_age_estimate(breed: &str) -> f64 {
    if breed.contains("Fulani") { 2.5 } else { 1.5 }
}

fn collect_findings(animal_id: &str, diseases: &[Prediction]) -> Vec<Finding> {
    let mut best: BTreeMap<&str, Confidence> = BTreeMap::new();

    for prediction in diseases {
        let label = prediction.label.trim();
        if label.is_empty() || is_no_finding(label) {
            continue;
        }
        let Some(raw) = prediction.confidence else {
            continue;
        };
        let Some(confidence) = Confidence::new(raw) else {
            warn!(animal_id, label, confidence = raw, "dropping finding with confidence outside [0, 1]");
            continue;
        };
        best.entry(label)
            .and_modify(|current| {
                if confidence > *current {
                    *current = confidence;
                }
            })
            .or_insert(confidence);
    }

    best.into_iter()
        .map(|(label, confidence)| Finding {
            label: label.to_string(),
            confidence,
        })
        .collect()
}
