//! `herdval` library crate.
//!
//! The binary (`herdval`) is a thin wrapper around this library so that:
//!
//! - the normalizer and valuation engine are testable without spawning processes
//! - the detector boundary can be swapped (hosted service, canned answers)
//! - dataset generation is reusable from other tools

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod normalize;
pub mod report;
pub mod valuation;
