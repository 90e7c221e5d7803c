//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - built by the normalizer from detector output
//! - fed to the valuation engine
//! - written to (and reloaded from) dataset and metadata JSON files

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Label of the distinguished "no condition detected" condition.
pub const HEALTHY: &str = "healthy";

/// Wire value used for any field the detector could not supply.
pub const UNKNOWN: &str = "Unknown";

/// Labels a detector may use to say "no finding" instead of returning nothing.
const NO_FINDING_SENTINELS: [&str; 4] = [HEALTHY, "no disease detected", "none", "no finding"];

/// One of the fixed yearly age bins (`1Y`..`15Y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgeBucket(u8);

impl AgeBucket {
    pub const MIN_YEARS: u8 = 1;
    pub const MAX_YEARS: u8 = 15;

    pub fn new(years: u8) -> Option<Self> {
        (Self::MIN_YEARS..=Self::MAX_YEARS)
            .contains(&years)
            .then_some(Self(years))
    }

    /// All 15 bins, youngest first.
    pub fn all() -> impl Iterator<Item = AgeBucket> {
        (Self::MIN_YEARS..=Self::MAX_YEARS).map(AgeBucket)
    }

    pub fn years(self) -> u8 {
        self.0
    }

    /// Parse a bucket label such as `7Y` (the unit suffix is case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        let digits = label.trim().strip_suffix(['Y', 'y'])?;
        let years = digits.trim().parse::<u8>().ok()?;
        Self::new(years)
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Y", self.0)
    }
}

impl TryFrom<String> for AgeBucket {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AgeBucket::parse(&value).ok_or_else(|| format!("'{value}' is not an age bucket (1Y..15Y)"))
    }
}

impl From<AgeBucket> for String {
    fn from(value: AgeBucket) -> Self {
        value.to_string()
    }
}

/// Age of an animal, in whichever representation the pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AgeRepr", into = "AgeRepr")]
pub enum Age {
    /// Continuous estimate in years.
    Years(f64),
    Bucket(AgeBucket),
    Unknown,
}

impl Age {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Age::Unknown)
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Age::Years(years) => write!(f, "{years}"),
            Age::Bucket(bucket) => write!(f, "{bucket}"),
            Age::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// Wire shape of [`Age`]: a bare number for estimates, a string for buckets and `Unknown`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AgeRepr {
    Years(f64),
    Label(String),
}

impl TryFrom<AgeRepr> for Age {
    type Error = String;

    fn try_from(value: AgeRepr) -> Result<Self, Self::Error> {
        match value {
            AgeRepr::Years(years) if years.is_finite() && years >= 0.0 => Ok(Age::Years(years)),
            AgeRepr::Years(years) => Err(format!("invalid age estimate {years}")),
            AgeRepr::Label(label) if label == UNKNOWN => Ok(Age::Unknown),
            AgeRepr::Label(label) => AgeBucket::try_from(label).map(Age::Bucket),
        }
    }
}

impl From<Age> for AgeRepr {
    fn from(value: Age) -> Self {
        match value {
            Age::Years(years) => AgeRepr::Years(years),
            Age::Bucket(bucket) => AgeRepr::Label(bucket.to_string()),
            Age::Unknown => AgeRepr::Label(UNKNOWN.to_string()),
        }
    }
}

/// Sex of an animal as understood by the valuation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];
}

/// Three-way result of sex detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SexCall {
    Male,
    Female,
    Unknown,
}

impl SexCall {
    pub fn known(self) -> Option<Sex> {
        match self {
            SexCall::Male => Some(Sex::Male),
            SexCall::Female => Some(Sex::Female),
            SexCall::Unknown => None,
        }
    }
}

impl From<Sex> for SexCall {
    fn from(value: Sex) -> Self {
        match value {
            Sex::Male => SexCall::Male,
            Sex::Female => SexCall::Female,
        }
    }
}

/// Breed label, or the explicit `Unknown` sentinel when detection failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Breed {
    Known(String),
    Unknown,
}

impl Breed {
    pub fn label(&self) -> &str {
        match self {
            Breed::Known(label) => label,
            Breed::Unknown => UNKNOWN,
        }
    }
}

impl From<String> for Breed {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == UNKNOWN {
            Breed::Unknown
        } else {
            Breed::Known(trimmed.to_string())
        }
    }
}

impl From<Breed> for String {
    fn from(value: Breed) -> Self {
        match value {
            Breed::Known(label) => label,
            Breed::Unknown => UNKNOWN.to_string(),
        }
    }
}

/// A detector confidence score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);

    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| format!("confidence {value} is outside [0, 1]"))
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// Derived health flag of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Critical,
}

/// Non-empty set of condition labels.
///
/// Either exactly `{healthy}` or one or more disease labels; never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ConditionSet(BTreeSet<String>);

impl ConditionSet {
    pub fn healthy() -> Self {
        Self(BTreeSet::from([HEALTHY.to_string()]))
    }

    /// Build a set from raw labels.
    ///
    /// Labels are trimmed and deduplicated. "No finding" sentinels are dropped, and if
    /// nothing remains the set collapses to `{healthy}`.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let diseases: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty() && !is_no_finding(label))
            .collect();

        if diseases.is_empty() {
            Self::healthy()
        } else {
            Self(diseases)
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.0.contains(HEALTHY)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn health_status(&self) -> HealthStatus {
        if self.is_healthy() {
            HealthStatus::Ok
        } else {
            HealthStatus::Critical
        }
    }
}

/// Strict conversion for stored sets: unlike [`ConditionSet::from_labels`], nothing is
/// repaired. Empty lists, blank labels and `healthy` next to a disease are rejected.
impl TryFrom<Vec<String>> for ConditionSet {
    type Error = String;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("condition set must not be empty".to_string());
        }
        if value.iter().any(|label| label.trim().is_empty()) {
            return Err("condition labels must not be blank".to_string());
        }
        let no_finding = value.iter().filter(|label| is_no_finding(label)).count();
        if no_finding > 0 && no_finding < value.len() {
            return Err(format!(
                "'{HEALTHY}' cannot be combined with disease labels: [{}]",
                value.join(", ")
            ));
        }
        Ok(ConditionSet::from_labels(value))
    }
}

impl From<ConditionSet> for Vec<String> {
    fn from(value: ConditionSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// True for labels that mean "nothing detected" rather than naming a condition.
pub fn is_no_finding(label: &str) -> bool {
    let label = label.trim();
    NO_FINDING_SENTINELS
        .iter()
        .any(|sentinel| label.eq_ignore_ascii_case(sentinel))
}

/// One detected condition with the detector's confidence, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub label: String,
    pub confidence: Confidence,
}

/// A normalized per-animal record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalObservation {
    pub animal_id: String,
    pub timestamp: DateTime<Utc>,
    pub breed: Breed,
    pub breed_confidence: Confidence,
    pub age: Age,
    pub sex: SexCall,
    pub conditions: ConditionSet,
    /// Disease findings with confidences; empty when `conditions` is `{healthy}`
    /// or the detector reported labels without usable scores.
    pub findings: Vec<Finding>,
}

impl AnimalObservation {
    /// Recomputed from `conditions` on every call.
    pub fn health_status(&self) -> HealthStatus {
        self.conditions.health_status()
    }

    /// Highest-confidence finding, if any.
    pub fn primary_finding(&self) -> Option<&Finding> {
        self.findings.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// Feature triple the valuation engine prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub sex: Sex,
    pub age: Age,
    pub health: ConditionSet,
}

/// A valuation input together with its computed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedObservation {
    pub input: ValuationInput,
    #[serde(rename = "output")]
    pub price: i64,
}
