//! Ingestion document schema
//!
//! Typed, optional-field views of the clinical-trial export, one per modality,
//! plus the leaf coercions they share.

mod document;
mod field;

pub use document::*;
pub use field::*;
