//! Input/output helpers.
//!
//! - dataset JSON read/write + validation (`dataset`)
//! - per-animal metadata records (`metadata`)

pub mod dataset;
pub mod metadata;

pub use dataset::*;
pub use metadata::*;
