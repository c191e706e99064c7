//! Supplier matching and payment-terms due dates.

pub mod due_date;
pub mod matcher;
pub mod similarity;

pub use due_date::{compute_due_date, due_date_from, payment_days};
pub use matcher::{verify_supplier_name, MatchedField, SupplierMatch, SupplierMatcher};
pub use similarity::{best_similarity, levenshtein, similarity};
