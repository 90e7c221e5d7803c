//! Reporting utilities: dataset summaries and observation views.

pub mod format;

pub use format::*;
