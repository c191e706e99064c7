//! OCR boundary: a text recognizer run under several segmentation
//! assumptions, keeping the most confident attempt.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::RecognitionResult;

/// Engine prefix used in `RecognitionResult::engine_id`.
pub const OCR_ENGINE: &str = "ocr";

/// Page layout assumed by one recognition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Let the engine find text blocks on the page as-is.
    Auto,
    /// A single uniform block of text.
    SingleBlock,
    /// Scattered text on a noisy background.
    SparseText,
}

impl SegmentationMode {
    pub const ALL: [SegmentationMode; 3] = [Self::Auto, Self::SingleBlock, Self::SparseText];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::SingleBlock => "single_block",
            Self::SparseText => "sparse_text",
        }
    }
}

/// Text and confidence from one recognition attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Confidence on a 0-100 scale.
    pub confidence: f32,
}

/// A text recognition backend.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in an image under one segmentation assumption.
    fn recognize(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError>;

    /// Backend identifier.
    fn engine_id(&self) -> &str {
        OCR_ENGINE
    }
}

/// Run every mode in order and keep the most confident attempt whose trimmed
/// text is longer than `min_text_length`.
///
/// Never fails: when every attempt errors the result is degraded. When no
/// attempt clears the length bar the most confident non-empty one is kept.
pub fn recognize_best(
    recognizer: &dyn TextRecognizer,
    image: &DynamicImage,
    modes: &[SegmentationMode],
    min_text_length: usize,
) -> RecognitionResult {
    let start = Instant::now();
    let mut best: Option<(SegmentationMode, Recognition)> = None;
    let mut fallback: Option<(SegmentationMode, Recognition)> = None;
    let mut last_error: Option<OcrError> = None;
    let mut failures = 0;

    info!(
        "Recognizing {}x{} image with {} segmentation modes",
        image.width(),
        image.height(),
        modes.len()
    );

    for &mode in modes {
        let attempt = match recognizer.recognize(image, mode) {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!("OCR attempt with {} failed: {}", mode.as_str(), e);
                failures += 1;
                last_error = Some(e);
                continue;
            }
        };

        let length = attempt.text.trim().chars().count();
        debug!(
            "OCR attempt {}: {} chars at confidence {:.1}",
            mode.as_str(),
            length,
            attempt.confidence
        );

        let slot = if length > min_text_length {
            &mut best
        } else if length > 0 {
            &mut fallback
        } else {
            continue;
        };
        if slot.as_ref().map_or(true, |(_, kept)| attempt.confidence > kept.confidence) {
            *slot = Some((mode, attempt));
        }
    }

    let elapsed = start.elapsed().as_millis() as u64;
    let Some((mode, kept)) = best.or(fallback) else {
        let error = match last_error {
            Some(last) if failures == modes.len() => OcrError::AllAttemptsFailed {
                attempts: failures,
                last: last.to_string(),
            },
            _ => OcrError::NoText,
        };
        warn!("OCR produced no usable text: {}", error);
        return RecognitionResult::degraded(OCR_ENGINE, format!("OCR failed: {}", error))
            .with_processing_time(elapsed);
    };

    info!(
        "Kept {} attempt ({:.1}% confidence) in {}ms",
        mode.as_str(),
        kept.confidence,
        elapsed
    );
    RecognitionResult::new(
        kept.text.trim(),
        kept.confidence / 100.0,
        format!("{}:{}", recognizer.engine_id(), mode.as_str()),
    )
    .with_processing_time(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Recognizer with a scripted outcome per mode.
    struct ScriptedRecognizer {
        outcomes: HashMap<SegmentationMode, Result<(String, f32), String>>,
    }

    impl ScriptedRecognizer {
        fn new(outcomes: &[(SegmentationMode, Result<(&str, f32), &str>)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|&(mode, outcome)| {
                        let outcome = outcome
                            .map(|(text, conf)| (text.to_string(), conf))
                            .map_err(str::to_string);
                        (mode, outcome)
                    })
                    .collect(),
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, _image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError> {
            match self.outcomes.get(&mode) {
                Some(Ok((text, confidence))) => Ok(Recognition {
                    text: text.clone(),
                    confidence: *confidence,
                }),
                Some(Err(message)) => Err(OcrError::Recognition(message.clone())),
                None => Err(OcrError::Recognition("mode not scripted".to_string())),
            }
        }

        fn engine_id(&self) -> &str {
            "scripted"
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::new_luma8(10, 10)
    }

    #[test]
    fn test_keeps_most_confident_long_attempt() {
        let recognizer = ScriptedRecognizer::new(&[
            (SegmentationMode::Auto, Ok(("FAKTURA 12/2024 Ukupno 117,00", 71.0))),
            (SegmentationMode::SingleBlock, Ok(("FAKTURA 12/2024 Ukupno 117,0O", 88.0))),
            (SegmentationMode::SparseText, Ok(("F4KT", 97.0))),
        ]);
        let result = recognize_best(&recognizer, &image(), &SegmentationMode::ALL, 10);

        assert_eq!(result.raw_text, "FAKTURA 12/2024 Ukupno 117,0O");
        assert!((result.confidence - 0.88).abs() < 1e-6);
        assert_eq!(result.engine_id, "scripted:single_block");
    }

    #[test]
    fn test_failed_modes_are_skipped() {
        let recognizer = ScriptedRecognizer::new(&[
            (SegmentationMode::Auto, Err("engine crashed")),
            (SegmentationMode::SparseText, Ok(("Elektro Bosna d.o.o. Sarajevo", 64.0))),
        ]);
        let result = recognize_best(&recognizer, &image(), &SegmentationMode::ALL, 10);

        assert_eq!(result.engine_id, "scripted:sparse_text");
        assert!(!result.is_error_state());
    }

    #[test]
    fn test_short_text_is_a_fallback() {
        let recognizer = ScriptedRecognizer::new(&[
            (SegmentationMode::Auto, Ok(("  ", 90.0))),
            (SegmentationMode::SingleBlock, Ok(("12,00 KM", 40.0))),
        ]);
        let modes = [SegmentationMode::Auto, SegmentationMode::SingleBlock];
        let result = recognize_best(&recognizer, &image(), &modes, 10);

        assert_eq!(result.raw_text, "12,00 KM");
        assert!((result.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_all_attempts_failed_is_degraded() {
        let recognizer = ScriptedRecognizer::new(&[
            (SegmentationMode::Auto, Err("out of memory")),
            (SegmentationMode::SingleBlock, Err("bad image")),
            (SegmentationMode::SparseText, Err("model missing")),
        ]);
        let result = recognize_best(&recognizer, &image(), &SegmentationMode::ALL, 10);

        assert!(result.is_error_state());
        assert_eq!(result.engine_id, "ocr-error");
        assert!((result.confidence - 0.1).abs() < f32::EPSILON);
        assert!(result.raw_text.contains("all 3 recognition attempts failed"));
        assert!(result.raw_text.contains("model missing"));
    }

    #[test]
    fn test_no_text_is_degraded() {
        let recognizer = ScriptedRecognizer::new(&[(SegmentationMode::Auto, Ok(("", 99.0)))]);
        let result = recognize_best(&recognizer, &image(), &[SegmentationMode::Auto], 10);

        assert!(result.is_error_state());
        assert!(result.raw_text.contains("no text"));
    }

    #[test]
    fn test_segmentation_modes_serialize_snake_case() {
        let json = serde_json::to_string(&SegmentationMode::ALL).unwrap();
        assert_eq!(json, r#"["auto","single_block","sparse_text"]"#);
    }
}
