//! Error types for the costscan-core library.

use thiserror::Error;

/// Main error type for the costscan library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Generative model error.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The input's MIME type is not one the pipeline accepts.
    #[error("unsupported file type: {mime_type}")]
    UnsupportedInput { mime_type: String },

    /// No recognition backend is available for this input.
    #[error("recognition backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Recognition ran but found no text.
    #[error("no text recognized")]
    NoText,

    /// Every segmentation mode failed.
    #[error("all {attempts} recognition attempts failed: {last}")]
    AllAttemptsFailed { attempts: usize, last: String },
}

/// Errors raised while talking to the generative model.
#[derive(Error, Debug)]
pub enum AiError {
    /// No API key or client configured.
    #[error("model client not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered but produced no text.
    #[error("model returned an empty reply")]
    EmptyReply,

    /// Every model in the fallback chain was unavailable.
    #[error("no model available (tried {0})")]
    AllModelsFailed(String),
}

impl AiError {
    /// Whether the next model in the fallback chain should be tried.
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            AiError::Api { status, message } => {
                *status == 404 || *status == 503 || (*status == 400 && message.contains("NOT_FOUND"))
            }
            _ => false,
        }
    }
}

/// Result type for the costscan library.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_unavailable_classification() {
        let not_found = AiError::Api {
            status: 404,
            message: "models/x is not found".to_string(),
        };
        assert!(not_found.is_model_unavailable());

        let bad_request = AiError::Api {
            status: 400,
            message: "{\"status\": \"NOT_FOUND\"}".to_string(),
        };
        assert!(bad_request.is_model_unavailable());

        let auth = AiError::Api {
            status: 403,
            message: "API key not valid".to_string(),
        };
        assert!(!auth.is_model_unavailable());
        assert!(!AiError::EmptyReply.is_model_unavailable());
    }
}
