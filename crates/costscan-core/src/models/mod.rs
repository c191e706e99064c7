//! Data model: suggestion sets, supplier records, label mappings and configuration.

pub mod config;
pub mod fields;
pub mod mapping;
pub mod supplier;

pub use config::{AiConfig, ExtractionConfig, ModelConfig, OcrConfig, PdfConfig, ScanConfig};
pub use fields::{Currency, DocumentType, ExtractedFields, RecognitionResult, SupplierContact};
pub use mapping::{FieldMappings, MappedField};
pub use supplier::{CompanyInfo, PaymentTerms, SupplierRecord};
