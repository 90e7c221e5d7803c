//! Shared "analyze" pipeline: detector -> normalizer -> (optional) valuation -> record.
//!
//! Kept free of CLI concerns so it can be driven with any [`Detector`] and any
//! perturbation source.

use std::path::Path;

use tracing::warn;

use crate::data::{Detector, collect_raw_observation};
use crate::domain::{AnimalObservation, PricedObservation};
use crate::error::{AppError, ValuationError};
use crate::io::MetadataRecord;
use crate::normalize::Normalizer;
use crate::valuation::{PerturbationSource, ValuationEngine};

/// All computed outputs of a single `herdval analyze` run.
#[derive(Debug, Clone)]
pub struct AnalyzeOutput {
    pub observation: AnimalObservation,
    pub priced: Option<PricedObservation>,
    /// Set when pricing was requested but the observation could not be priced.
    pub valuation_error: Option<ValuationError>,
    pub record: MetadataRecord,
}

/// Run the detector on one image and build its metadata record.
///
/// A detector failure degrades fields, it never fails the run. A valuation failure
/// leaves the record unpriced and is reported in `valuation_error`.
pub fn run_analyze<P>(
    detector: &dyn Detector,
    normalizer: &Normalizer,
    valuation: Option<&ValuationEngine>,
    noise: &mut P,
    animal_id: &str,
    image: &Path,
) -> Result<AnalyzeOutput, AppError>
where
    P: PerturbationSource + ?Sized,
{
    if animal_id.trim().is_empty() {
        return Err(AppError::new(2, "Animal id must not be empty."));
    }
    if !image.is_file() {
        return Err(AppError::new(2, format!("Image '{}' not found.", image.display())));
    }

    let raw = collect_raw_observation(detector, animal_id, image);
    let degraded = raw.degraded.clone();
    let observation = normalizer.normalize(raw);

    let (priced, valuation_error) = match valuation.map(|engine| engine.price_observation(&observation, noise)) {
        None => (None, None),
        Some(Ok(priced)) => (Some(priced), None),
        Some(Err(err)) => {
            warn!(animal_id, %err, "observation left unpriced");
            (None, Some(err))
        }
    };

    let record = MetadataRecord::from_observation(&observation, priced.as_ref().map(|p| p.price))
        .with_degraded(degraded);

    Ok(AnalyzeOutput {
        observation,
        priced,
        valuation_error,
        record,
    })
}
