//! Data sources: the hosted detector and the synthetic dataset generator.

pub mod dataset;
pub mod detector;

pub use dataset::{DatasetStats, compute_stats, generate_dataset};
pub use detector::{Detector, DetectorClient, DetectorConfig, StaticDetector, collect_raw_observation};
