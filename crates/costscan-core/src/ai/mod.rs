//! Generative-model extraction.
//!
//! # Architecture
//!
//! - `VisionModel` trait: one call that sends a document plus an instruction
//!   and returns the model's free-text reply
//! - `ModelExtractor`: drives a `VisionModel` with the extraction prompt and
//!   turns whatever comes back into a `RecognitionResult`
//! - Implementations: `GeminiClient` (REST API), `MockModel` (scripted replies)
//!
//! `ModelExtractor::extract_via_model` never fails. Unsupported input, missing
//! credentials, transport errors and unparseable replies all become a degraded
//! result with a diagnostic message in place of the text.

mod gemini;
mod mock;
pub mod parsing;
pub mod prompt;

pub use gemini::GeminiClient;
pub use mock::MockModel;
pub use parsing::{find_json, parse_model_reply, reply_transcript};
pub use prompt::EXTRACTION_PROMPT;

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AiError;
use crate::models::RecognitionResult;

/// MIME types the model accepts inline.
pub const SUPPORTED_MIME_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// Engine prefix used in `RecognitionResult::engine_id`.
pub const AI_ENGINE: &str = "ai";

/// Confidence of a reply that parsed into a structured guess.
const STRUCTURED_CONFIDENCE: f32 = 0.9;
/// Confidence of a reply that only yielded text.
const TEXT_ONLY_CONFIDENCE: f32 = 0.5;

/// Canonical form of a MIME type, if the model accepts it.
pub fn supported_mime_type(mime_type: &str) -> Option<&'static str> {
    let mime = mime_type.trim().to_lowercase();
    let mime = if mime == "image/jpg" { "image/jpeg".to_string() } else { mime };
    SUPPORTED_MIME_TYPES.iter().copied().find(|m| *m == mime)
}

/// A vision-capable generative model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `data` inline with `prompt` and return the model's reply text.
    async fn generate(&self, prompt: &str, data: &[u8], mime_type: &str) -> Result<String, AiError>;

    /// Identifier of the model that will answer (for logging and engine ids).
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: VisionModel + ?Sized> VisionModel for Box<T> {
    async fn generate(&self, prompt: &str, data: &[u8], mime_type: &str) -> Result<String, AiError> {
        (**self).generate(prompt, data, mime_type).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Runs the extraction prompt against a `VisionModel`.
pub struct ModelExtractor<M> {
    model: M,
}

impl<M: VisionModel> ModelExtractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Extract a recognition result with a structured guess from a document.
    pub async fn extract_via_model(&self, data: &[u8], mime_type: &str) -> RecognitionResult {
        let start = Instant::now();

        let Some(mime) = supported_mime_type(mime_type) else {
            warn!("Model extraction refused unsupported type {}", mime_type);
            return RecognitionResult::degraded(
                AI_ENGINE,
                format!("Unsupported file type for AI extraction: {}", mime_type),
            );
        };

        info!(
            "Extracting {} bytes ({}) with model {}",
            data.len(),
            mime,
            self.model.model_id()
        );

        let reply = match self.model.generate(EXTRACTION_PROMPT, data, mime).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Model extraction failed: {}", e);
                return RecognitionResult::degraded(AI_ENGINE, format!("AI extraction failed: {}", e))
                    .with_processing_time(start.elapsed().as_millis() as u64);
            }
        };

        let guess = parse_model_reply(&reply);
        if guess.is_none() {
            warn!("Model reply had no usable JSON, keeping raw text for review");
        }
        let text = reply_transcript(&reply).unwrap_or_else(|| reply.trim().to_string());
        let confidence = if guess.is_some() {
            STRUCTURED_CONFIDENCE
        } else {
            TEXT_ONLY_CONFIDENCE
        };

        RecognitionResult::new(
            text,
            confidence,
            format!("{}:{}", AI_ENGINE, self.model.model_id()),
        )
        .with_structured_guess(guess)
        .with_processing_time(start.elapsed().as_millis() as u64)
    }
}
