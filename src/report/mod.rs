//! Report rendering.
//!
//! Turns an [`InsightDataset`](crate::models::InsightDataset) into one of
//! the three export encodings. Periods holding the missing marker never
//! produce output.

pub mod delimited;
pub mod document;
pub mod generator;
pub mod spreadsheet;

pub use generator::{render, RenderOptions};
