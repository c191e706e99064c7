//! Cost document field extraction: normalization, rule-based extractors and
//! reconciliation into the canonical suggestion set.

pub mod normalize;
mod reconciler;
pub mod rules;

pub use normalize::{normalize, transliterate};
pub use reconciler::{FieldReconciler, ReconciledFields};

use crate::models::{ExtractedFields, FieldMappings};

/// Reconcile plain text with default settings and no model guess.
pub fn extract_fields(text: &str, mappings: &FieldMappings) -> ExtractedFields {
    FieldReconciler::new().reconcile(text, mappings, None).fields
}
