//! Configuration structures for the recognition pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::fields::Currency;
use super::mapping::FieldMappings;
use crate::ocr::SegmentationMode;

/// Main configuration for the costscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Generative model configuration.
    pub ai: AiConfig,

    /// OCR model files.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Segmentation modes to attempt, in order.
    pub segmentation_modes: Vec<SegmentationMode>,

    /// Minimum trimmed text length for an attempt to be considered useful.
    pub min_text_length: usize,

    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Keep `[UNK]` markers for unrecognized glyphs.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            segmentation_modes: SegmentationMode::ALL.to_vec(),
            min_text_length: 10,
            max_image_size: 2048,
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text-layer length before falling back to OCR.
    pub min_text_length: usize,

    /// Pages rasterized for OCR when the text layer is too thin.
    pub max_ocr_pages: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 50,
            max_ocr_pages: 3,
        }
    }
}

/// Field extraction and reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency assumed when none is detected.
    pub default_currency: Currency,

    /// Expected total / subtotal ratio (regional VAT).
    pub vat_ratio: Decimal,

    /// Relative tolerance around `vat_ratio`.
    pub vat_ratio_tolerance: Decimal,

    /// Days added to the issue date when no due date is printed.
    pub default_due_days: i64,

    /// Amounts at or above this value are rejected as implausible.
    pub max_amount: Decimal,

    /// Minimum supplier score for a match.
    pub supplier_score_threshold: f64,

    /// Results below this confidence need manual review.
    pub review_confidence: f32,

    /// Label mappings used for label-anchored extraction.
    pub field_mappings: FieldMappings,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::Bam,
            vat_ratio: Decimal::new(117, 2),
            vat_ratio_tolerance: Decimal::new(5, 2),
            default_due_days: 15,
            max_amount: Decimal::new(1_000_000, 0),
            supplier_score_threshold: 30.0,
            review_confidence: 0.2,
            field_mappings: FieldMappings::standard(),
        }
    }
}

/// Generative model configuration. The API key itself is only read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Use the model when a key is available.
    pub enabled: bool,

    /// API base URL.
    pub base_url: String,

    /// Primary model identifier.
    pub model: String,

    /// Models tried, in order, when the primary is unavailable.
    pub fallback_models: Vec<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            fallback_models: vec![
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-flash-8b".to_string(),
                "gemini-1.5-pro".to_string(),
            ],
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl AiConfig {
    /// Primary model followed by the fallbacks, without duplicates.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain = vec![self.model.clone()];
        for model in &self.fallback_models {
            if !chain.contains(model) {
                chain.push(model.clone());
            }
        }
        chain
    }
}

/// OCR model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Full path to a model file in `model_dir`.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{"extraction": {"default_due_days": 30}}"#).unwrap();
        assert_eq!(config.extraction.default_due_days, 30);
        assert_eq!(config.extraction.default_currency, Currency::Bam);
        assert_eq!(config.pdf.min_text_length, 50);
        assert_eq!(config.ai.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_model_chain_deduplicates() {
        let config = AiConfig {
            model: "gemini-1.5-flash".to_string(),
            ..Default::default()
        };
        let chain = config.model_chain();
        assert_eq!(chain[0], "gemini-1.5-flash");
        assert_eq!(
            chain.iter().filter(|m| *m == "gemini-1.5-flash").count(),
            1
        );
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("costscan-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = ScanConfig::default();
        config.extraction.supplier_score_threshold = 45.0;
        config.save(&path).unwrap();

        let loaded = ScanConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.supplier_score_threshold, 45.0);
        assert_eq!(loaded.extraction.field_mappings, FieldMappings::standard());

        std::fs::remove_dir_all(&dir).ok();
    }
}
