//! Hosted image-recognition detector integration.
//!
//! The service is a black box: one model per question (breed, age, sex, disease), each
//! answering a multipart image upload with a JSON body of predictions. This module maps
//! those loosely structured bodies into [`Prediction`]s and assembles a
//! [`RawObservation`] for the normalizer. Any failure stays per-field.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, DetectorError};
use crate::normalize::{Prediction, RawAge, RawObservation, SexEvidence};

const DEFAULT_BASE_URL: &str = "https://detect.roboflow.com";
const DEFAULT_MALE_FEATURE_CLASS: &str = "Scrotum";

/// The four questions asked about each image.
pub trait Detector {
    fn detect_breed(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError>;
    fn detect_age(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError>;
    /// `true` if the male-indicating feature was found.
    fn detect_male_feature(&self, image: &Path) -> Result<bool, DetectorError>;
    fn detect_diseases(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError>;
}

/// Ask every detector question and collect the answers, degrading failures per field.
pub fn collect_raw_observation(
    detector: &dyn Detector,
    animal_id: &str,
    image: &Path,
) -> RawObservation {
    let mut degraded = Vec::new();

    let breed = match detector.detect_breed(image) {
        Ok(predictions) => predictions.into_iter().next(),
        Err(err) => {
            log_degraded(animal_id, "breed", &err);
            degraded.push("breed");
            None
        }
    };

    let age = match detector.detect_age(image) {
        Ok(predictions) => predictions
            .into_iter()
            .next()
            .map(|p| RawAge::Label(p.label))
            .unwrap_or(RawAge::Missing),
        Err(err) => {
            log_degraded(animal_id, "age", &err);
            degraded.push("age");
            RawAge::Missing
        }
    };

    let sex = match detector.detect_male_feature(image) {
        Ok(true) => SexEvidence::MaleFeatureFound,
        Ok(false) => SexEvidence::NoMaleFeature,
        Err(err) => {
            log_degraded(animal_id, "sex", &err);
            degraded.push("sex");
            SexEvidence::Unavailable
        }
    };

    // A failed disease call is treated the same as "no finding".
    let diseases = match detector.detect_diseases(image) {
        Ok(predictions) => predictions,
        Err(err) => {
            log_degraded(animal_id, "disease", &err);
            degraded.push("disease");
            Vec::new()
        }
    };

    RawObservation {
        animal_id: animal_id.to_string(),
        breed,
        age,
        sex,
        diseases,
        degraded,
    }
}

fn log_degraded(animal_id: &str, field: &str, err: &DetectorError) {
    match err {
        DetectorError::NotConfigured(_) => debug!(animal_id, field, %err, "detector field skipped"),
        _ => warn!(animal_id, field, %err, "detector field degraded to Unknown"),
    }
}

/// Connection settings and model ids of the hosted detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub base_url: String,
    pub api_key: String,
    /// Model ids in `project/version` form; `None` disables that question.
    pub breed_model: Option<String>,
    pub age_model: Option<String>,
    pub sex_model: Option<String>,
    pub disease_model: Option<String>,
    /// Class name the sex model reports for the male-indicating feature.
    pub male_feature_class: String,
}

impl DetectorConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("HERDVAL_API_KEY")
            .map_err(|_| AppError::new(2, "Missing HERDVAL_API_KEY in environment (.env)."))?;

        let optional = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            base_url: optional("HERDVAL_DETECTOR_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            breed_model: optional("HERDVAL_BREED_MODEL"),
            age_model: optional("HERDVAL_AGE_MODEL"),
            sex_model: optional("HERDVAL_SEX_MODEL"),
            disease_model: optional("HERDVAL_DISEASE_MODEL"),
            male_feature_class: optional("HERDVAL_MALE_FEATURE_CLASS")
                .unwrap_or_else(|| DEFAULT_MALE_FEATURE_CLASS.to_string()),
        })
    }
}

pub struct DetectorClient {
    client: Client,
    config: DetectorConfig,
}

impl DetectorClient {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(DetectorConfig::from_env()?))
    }

    fn infer(
        &self,
        model: Option<&str>,
        question: &'static str,
        image: &Path,
    ) -> Result<Vec<Prediction>, DetectorError> {
        let model = model.ok_or(DetectorError::NotConfigured(question))?;
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), model);

        let form = Form::new().file("file", image).map_err(|e| {
            DetectorError::Unavailable(format!("cannot read image '{}': {e}", image.display()))
        })?;

        let resp = self
            .client
            .post(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .multipart(form)
            .send()
            .map_err(|e| DetectorError::Unavailable(format!("{question} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(DetectorError::Unavailable(format!(
                "{question} request failed with status {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| DetectorError::Unavailable(format!("{question} response unreadable: {e}")))?;

        parse_predictions(&body)
    }
}

impl Detector for DetectorClient {
    fn detect_breed(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.infer(self.config.breed_model.as_deref(), "breed", image)
    }

    fn detect_age(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.infer(self.config.age_model.as_deref(), "age", image)
    }

    fn detect_male_feature(&self, image: &Path) -> Result<bool, DetectorError> {
        let predictions = self.infer(self.config.sex_model.as_deref(), "sex", image)?;
        Ok(has_class(&predictions, &self.config.male_feature_class))
    }

    fn detect_diseases(&self, image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.infer(self.config.disease_model.as_deref(), "disease", image)
    }
}

/// Canned detector answers, for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticDetector {
    pub breed: Result<Vec<Prediction>, DetectorError>,
    pub age: Result<Vec<Prediction>, DetectorError>,
    pub male_feature: Result<bool, DetectorError>,
    pub diseases: Result<Vec<Prediction>, DetectorError>,
}

impl StaticDetector {
    /// A detector whose every call fails with `err`.
    pub fn failing(err: DetectorError) -> Self {
        Self {
            breed: Err(err.clone()),
            age: Err(err.clone()),
            male_feature: Err(err.clone()),
            diseases: Err(err),
        }
    }
}

impl Detector for StaticDetector {
    fn detect_breed(&self, _image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.breed.clone()
    }

    fn detect_age(&self, _image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.age.clone()
    }

    fn detect_male_feature(&self, _image: &Path) -> Result<bool, DetectorError> {
        self.male_feature.clone()
    }

    fn detect_diseases(&self, _image: &Path) -> Result<Vec<Prediction>, DetectorError> {
        self.diseases.clone()
    }
}

fn has_class(predictions: &[Prediction], class: &str) -> bool {
    predictions
        .iter()
        .any(|p| p.label.trim().eq_ignore_ascii_case(class))
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    predictions: Option<PredictionsField>,
    /// Multi-label classifiers list the classes over their threshold here.
    #[serde(default)]
    predicted_classes: Vec<String>,
}

/// Detection and single-label models answer with a list, multi-label ones with a map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionsField {
    List(Vec<ListedPrediction>),
    Map(BTreeMap<String, ScoreEntry>),
}

#[derive(Debug, Deserialize)]
struct ListedPrediction {
    class: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    #[serde(default)]
    confidence: Option<f64>,
}

/// Map a detector response body to predictions, highest confidence first.
///
/// An empty body or one without predictions yields an empty list ("no finding").
pub fn parse_predictions(body: &str) -> Result<Vec<Prediction>, DetectorError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let response: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| DetectorError::Malformed(format!("failed to parse detector response: {e}")))?;

    let mut predictions: Vec<Prediction> = match response.predictions {
        None => Vec::new(),
        Some(PredictionsField::List(list)) => list
            .into_iter()
            .map(|p| Prediction {
                label: p.class,
                confidence: p.confidence,
            })
            .collect(),
        Some(PredictionsField::Map(map)) => map
            .into_iter()
            .map(|(label, score)| Prediction {
                label,
                confidence: score.confidence,
            })
            .collect(),
    };

    if !response.predicted_classes.is_empty() {
        predictions.retain(|p| response.predicted_classes.contains(&p.label));
        for class in &response.predicted_classes {
            if !predictions.iter().any(|p| &p.label == class) {
                predictions.push(Prediction::label_only(class.clone()));
            }
        }
    }

    // Stable sort keeps the detector's order among equal or missing scores.
    predictions.sort_by(|a, b| {
        b.confidence
            .unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&a.confidence.unwrap_or(f64::NEG_INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection_list_sorted_by_confidence() {
        let body = r#"{
            "time": 0.12,
            "image": {"width": 640, "height": 480},
            "predictions": [
                {"x": 1.0, "y": 2.0, "class": "lumpy", "confidence": 0.41},
                {"x": 3.0, "y": 4.0, "class": "Dermatitis", "confidence": 0.83}
            ]
        }"#;
        let predictions = parse_predictions(body).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0], Prediction::new("Dermatitis", 0.83));
        assert_eq!(predictions[1], Prediction::new("lumpy", 0.41));
    }

    #[test]
    fn parses_multi_label_map_filtered_by_predicted_classes() {
        let body = r#"{
            "predictions": {
                "Skin": {"confidence": 0.91},
                "Respiratory": {"confidence": 0.12},
                "healthy": {"confidence": 0.05}
            },
            "predicted_classes": ["Skin"]
        }"#;
        let predictions = parse_predictions(body).unwrap();
        assert_eq!(predictions, vec![Prediction::new("Skin", 0.91)]);
    }

    #[test]
    fn empty_responses_are_no_finding() {
        assert!(parse_predictions("").unwrap().is_empty());
        assert!(parse_predictions("{}").unwrap().is_empty());
        assert!(parse_predictions(r#"{"predictions": []}"#).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_predictions("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, DetectorError::Malformed(_)));
    }

    #[test]
    fn male_feature_class_match_is_case_insensitive() {
        let predictions = vec![Prediction::new("udder", 0.3), Prediction::new("scrotum", 0.6)];
        assert!(has_class(&predictions, "Scrotum"));
        assert!(!has_class(&predictions[..1], "Scrotum"));
    }

    #[test]
    fn collect_degrades_each_failed_field() {
        let detector = StaticDetector {
            breed: Ok(vec![Prediction::new("White Fulani", 0.89)]),
            age: Err(DetectorError::Unavailable("timeout".to_string())),
            male_feature: Err(DetectorError::Malformed("bad json".to_string())),
            diseases: Ok(vec![Prediction::new("lumpy", 0.7)]),
        };
        let raw = collect_raw_observation(&detector, "A-1", Path::new("cow.jpg"));

        assert_eq!(raw.animal_id, "A-1");
        assert_eq!(raw.breed, Some(Prediction::new("White Fulani", 0.89)));
        assert_eq!(raw.age, RawAge::Missing);
        assert_eq!(raw.sex, SexEvidence::Unavailable);
        assert_eq!(raw.diseases, vec![Prediction::new("lumpy", 0.7)]);
        assert_eq!(raw.degraded, vec!["age", "sex"]);
    }

    #[test]
    fn collect_maps_empty_answers_to_no_evidence() {
        let detector = StaticDetector {
            breed: Ok(Vec::new()),
            age: Ok(vec![Prediction::new("4Y", 0.2), Prediction::new("5Y", 0.1)]),
            male_feature: Ok(false),
            diseases: Err(DetectorError::Unavailable("connection refused".to_string())),
        };
        let raw = collect_raw_observation(&detector, "A-2", Path::new("cow.jpg"));

        assert_eq!(raw.breed, None);
        assert_eq!(raw.age, RawAge::Label("4Y".to_string()));
        assert_eq!(raw.sex, SexEvidence::NoMaleFeature);
        assert!(raw.diseases.is_empty());
        assert_eq!(raw.degraded, vec!["disease"]);
    }

    #[test]
    fn unconfigured_models_report_not_configured() {
        let client = DetectorClient::new(DetectorConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test".to_string(),
            breed_model: None,
            age_model: None,
            sex_model: None,
            disease_model: None,
            male_feature_class: DEFAULT_MALE_FEATURE_CLASS.to_string(),
        });
        let err = client.detect_breed(Path::new("cow.jpg")).unwrap_err();
        assert_eq!(err, DetectorError::NotConfigured("breed"));
    }
}
