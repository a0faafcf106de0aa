//! Processor module for the order sync pipeline.
//!
//! Transforms primary-store records into search documents.

mod normalizer;

pub use normalizer::{DocumentMapping, DocumentNormalizer, FieldMapping, FieldSource};
