//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the observation model (`AnimalObservation`, `ConditionSet`, `Age`, `SexCall`)
//! - valuation inputs and outputs (`ValuationInput`, `PricedObservation`)
//! - the immutable configuration values each component takes

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
