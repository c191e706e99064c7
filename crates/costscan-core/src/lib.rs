//! Core library for cost document understanding.
//!
//! This crate provides:
//! - Recognition backends: a generative vision model (Gemini) and a pure Rust OCR engine
//! - PDF text-layer extraction with OCR fallback for scanned pages
//! - Field extraction and reconciliation (amounts, VAT, dates, document number, supplier)
//! - Supplier matching against a directory and payment-terms due dates

pub mod ai;
pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod suppliers;

pub use ai::{GeminiClient, MockModel, ModelExtractor, VisionModel};
pub use error::{Result, ScanError};
pub use invoice::{FieldReconciler, ReconciledFields, normalize};
pub use models::{
    CompanyInfo, Currency, DocumentType, ExtractedFields, FieldMappings, MappedField, PaymentTerms,
    RecognitionResult, ScanConfig, SupplierRecord,
};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use ocr::{SegmentationMode, TextRecognizer, recognize_best};
pub use pipeline::{DocumentPipeline, ScanContext, ScanOutcome, SupplierResolution};
pub use suppliers::{SupplierMatch, SupplierMatcher, compute_due_date};
