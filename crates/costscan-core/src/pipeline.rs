//! End-to-end document processing.
//!
//! ```text
//! bytes ─┬─ model ──────────────┐
//!        └─ PDF text / OCR ─────┴─> reconcile ─> supplier ─> due date ─> ScanOutcome
//! ```
//!
//! The model runs first when one is configured; an error-state reply falls
//! back to the local PDF/OCR path. Recognition failures never surface as
//! errors: the outcome then carries empty fields and asks for review.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{GeminiClient, ModelExtractor, VisionModel, supported_mime_type};
use crate::error::{Result, ScanError};
use crate::invoice::FieldReconciler;
use crate::models::{CompanyInfo, ExtractedFields, FieldMappings, RecognitionResult, ScanConfig, SupplierRecord};
use crate::ocr::{TextRecognizer, recognize_best};
use crate::pdf::recognize_pdf;
use crate::suppliers::{SupplierMatch, SupplierMatcher, due_date_from, verify_supplier_name};

/// Engine id of plain-text input.
pub const TEXT_ENGINE: &str = "text";

/// Read-only inputs supplied by the host for one document.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub mappings: FieldMappings,
    pub suppliers: Vec<SupplierRecord>,
    pub company: CompanyInfo,
}

impl ScanContext {
    pub fn new(mappings: FieldMappings) -> Self {
        Self {
            mappings,
            suppliers: Vec::new(),
            company: CompanyInfo::default(),
        }
    }

    pub fn with_suppliers(mut self, suppliers: Vec<SupplierRecord>) -> Self {
        self.suppliers = suppliers;
        self
    }

    pub fn with_company(mut self, company: CompanyInfo) -> Self {
        self.company = company;
        self
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new(FieldMappings::standard())
    }
}

/// How the supplier was identified.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SupplierResolution {
    /// The model's supplier name matched a directory entry.
    Verified { supplier: SupplierRecord },
    /// The matcher scored the directory against the text.
    Matched(SupplierMatch),
}

impl SupplierResolution {
    pub fn record(&self) -> &SupplierRecord {
        match self {
            Self::Verified { supplier } => supplier,
            Self::Matched(found) => &found.supplier,
        }
    }
}

/// Final suggestion set for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub recognition: RecognitionResult,
    pub fields: ExtractedFields,
    pub supplier: Option<SupplierResolution>,
    /// Due date is the issue date plus the default offset.
    pub due_synthesized: bool,
    /// Due date comes from the supplier's payment terms.
    pub due_from_terms: bool,
    pub warnings: Vec<String>,
    #[serde(skip)]
    review_confidence: f32,
}

impl ScanOutcome {
    /// Whether the host should present this result for manual review.
    pub fn needs_review(&self) -> bool {
        self.recognition.is_error_state()
            || self.recognition.confidence < self.review_confidence
            || self.fields.total_amount.is_none()
    }
}

/// Document pipeline with injected recognition backends.
pub struct DocumentPipeline {
    config: ScanConfig,
    model: Option<ModelExtractor<Box<dyn VisionModel>>>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    reconciler: FieldReconciler,
    matcher: SupplierMatcher,
}

impl DocumentPipeline {
    /// Create a pipeline without backends.
    pub fn new(config: ScanConfig) -> Self {
        let reconciler = FieldReconciler::from_config(&config.extraction);
        let matcher = SupplierMatcher::new().with_threshold(config.extraction.supplier_score_threshold);
        Self {
            config,
            model: None,
            recognizer: None,
            reconciler,
            matcher,
        }
    }

    /// Create a pipeline with whichever backends the configuration and
    /// environment make available.
    pub fn from_config(config: ScanConfig) -> Self {
        let model = GeminiClient::from_config(&config.ai);
        let recognizer = native_recognizer(&config);

        let mut pipeline = Self::new(config);
        if let Some(model) = model {
            pipeline = pipeline.with_model(model);
        }
        if let Some(recognizer) = recognizer {
            pipeline.recognizer = Some(recognizer);
        }
        pipeline
    }

    pub fn with_model(mut self, model: impl VisionModel + 'static) -> Self {
        self.model = Some(ModelExtractor::new(Box::new(model)));
        self
    }

    pub fn with_recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn without_model(mut self) -> Self {
        self.model = None;
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// A context seeded with the configured label mappings.
    pub fn context(&self) -> ScanContext {
        ScanContext::new(self.config.extraction.field_mappings.clone())
    }

    /// Process a PDF or image document.
    ///
    /// Fails only for an unsupported MIME type, or when no backend can read
    /// the document at all.
    pub async fn process(&self, data: &[u8], mime_type: &str, ctx: &ScanContext) -> Result<ScanOutcome> {
        let mime = supported_mime_type(mime_type).ok_or_else(|| ScanError::UnsupportedInput {
            mime_type: mime_type.to_string(),
        })?;

        info!("Processing {} bytes ({})", data.len(), mime);

        let recognition = match &self.model {
            Some(model) => {
                let result = model.extract_via_model(data, mime).await;
                if result.is_error_state() && self.can_read_locally(mime) {
                    warn!("Model extraction degraded, falling back to local recognition");
                    match self.recognize_locally(data, mime) {
                        Ok(local) => local,
                        Err(e) => {
                            warn!("Local recognition unavailable: {}", e);
                            result
                        }
                    }
                } else {
                    result
                }
            }
            None => self.recognize_locally(data, mime)?,
        };

        Ok(self.finish(recognition, ctx))
    }

    /// Process already-recognized text.
    pub fn process_text(&self, text: &str, ctx: &ScanContext) -> ScanOutcome {
        self.finish(RecognitionResult::new(text, 1.0, TEXT_ENGINE), ctx)
    }

    fn can_read_locally(&self, mime: &str) -> bool {
        mime == "application/pdf" || self.recognizer.is_some()
    }

    fn recognize_locally(&self, data: &[u8], mime: &str) -> Result<RecognitionResult> {
        let recognizer = self.recognizer.as_deref();
        if mime == "application/pdf" {
            return recognize_pdf(data, &self.config.pdf, &self.config.ocr, recognizer);
        }

        let Some(recognizer) = recognizer else {
            return Err(ScanError::BackendUnavailable(
                "no AI model or OCR recognizer configured".to_string(),
            ));
        };
        let image = image::load_from_memory(data)?;
        Ok(recognize_best(
            recognizer,
            &image,
            &self.config.ocr.segmentation_modes,
            self.config.ocr.min_text_length,
        ))
    }

    fn finish(&self, recognition: RecognitionResult, ctx: &ScanContext) -> ScanOutcome {
        let start = Instant::now();
        let failed = recognition.is_error_state();

        // A degraded result's text is a diagnostic, not document content
        let text = if failed { "" } else { recognition.raw_text.as_str() };
        let guess = recognition.structured_guess.as_ref();
        let reconciled = self.reconciler.reconcile(text, &ctx.mappings, guess);

        let mut fields = reconciled.fields;
        let mut due_synthesized = reconciled.due_synthesized;
        let mut due_from_terms = false;
        let mut warnings = reconciled.warnings;
        if failed {
            warnings.insert(0, format!("recognition failed: {}", recognition.raw_text));
        }

        let supplier = self.resolve_supplier(text, guess, ctx);
        if let Some(resolution) = &supplier {
            let record = resolution.record();
            fields.supplier_name = Some(record.name.clone());

            if fields.due_date.is_none() || due_synthesized {
                let terms_due = record
                    .payment_terms
                    .as_ref()
                    .zip(fields.issue_date)
                    .and_then(|(terms, issued)| due_date_from(terms, issued));
                if let Some(due) = terms_due {
                    debug!("Due date {} from payment terms of '{}'", due, record.name);
                    fields.due_date = Some(due);
                    due_synthesized = false;
                    due_from_terms = true;
                }
            }
        }

        info!(
            "Scan finished via {}: supplier={:?}, total={:?}, {} warnings in {}ms",
            recognition.engine_id,
            fields.supplier_name,
            fields.total_amount,
            warnings.len(),
            start.elapsed().as_millis()
        );

        ScanOutcome {
            recognition,
            fields,
            supplier,
            due_synthesized,
            due_from_terms,
            warnings,
            review_confidence: self.config.extraction.review_confidence,
        }
    }

    /// A verified model supplier wins; otherwise the matcher scores the text.
    fn resolve_supplier(
        &self,
        text: &str,
        guess: Option<&ExtractedFields>,
        ctx: &ScanContext,
    ) -> Option<SupplierResolution> {
        if ctx.suppliers.is_empty() {
            return None;
        }

        let reported = guess.and_then(|g| g.supplier_name.as_deref());
        let verified = reported.and_then(|name| verify_supplier_name(name, &ctx.suppliers, &ctx.company));
        if let Some(supplier) = verified {
            debug!("Model supplier verified as '{}'", supplier.name);
            return Some(SupplierResolution::Verified {
                supplier: supplier.clone(),
            });
        }

        if text.trim().is_empty() {
            return None;
        }
        self.matcher
            .find_best(text, &ctx.suppliers, &ctx.company)
            .map(SupplierResolution::Matched)
    }
}

#[cfg(feature = "native")]
fn native_recognizer(config: &ScanConfig) -> Option<Box<dyn TextRecognizer>> {
    match crate::ocr::PureOcrEngine::from_config(&config.models, &config.ocr) {
        Ok(engine) => Some(Box::new(engine)),
        Err(e) => {
            info!("OCR engine unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn native_recognizer(_config: &ScanConfig) -> Option<Box<dyn TextRecognizer>> {
    None
}
