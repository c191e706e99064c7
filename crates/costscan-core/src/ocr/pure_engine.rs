//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{ImagePreprocessor, Recognition, SegmentationMode, TextRecognizer};

/// Vertical distance (pixels) within which regions share a line.
const ROW_HEIGHT: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    preprocessor: ImagePreprocessor,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Create an engine from the model files named in `models`.
    pub fn from_config(models: &ModelConfig, config: &OcrConfig) -> Result<Self, OcrError> {
        Self::from_paths(
            &models.path(&models.detection_model),
            &models.path(&models.recognition_model),
            &models.path(&models.dictionary),
            config,
        )
    }

    /// Create an engine from explicit model paths.
    pub fn from_paths(det_path: &Path, rec_path: &Path, dict_path: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        for path in [det_path, rec_path, dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing model file {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(det_path)
            .rec_model_path(rec_path)
            .dictionary_path(dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine ({})", rec_path.display());

        Ok(Self {
            engine,
            preprocessor: ImagePreprocessor::new().with_max_size(config.max_image_size),
            keep_unk: config.keep_unk,
        })
    }
}

impl TextRecognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError> {
        let start = Instant::now();
        let prepared = self.preprocessor.prepare(image, mode);
        let (width, height) = prepared.dimensions();

        debug!("Running {} pass on {}x{} image", mode.as_str(), width, height);

        let results = self
            .engine
            .run_from_image(&prepared)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut regions: Vec<(f64, f64, String, f32)> = results
            .iter()
            .filter_map(|r| {
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                let text = text.trim().to_string();
                if text.is_empty() {
                    return None;
                }
                let (x, y) = top_left(&r.bounding_box);
                Some((x, y, text, r.confidence))
            })
            .collect();

        // Reading order: rows top to bottom, left to right within a row
        regions.sort_by(|a, b| {
            let row_a = (a.1 / ROW_HEIGHT) as i64;
            let row_b = (b.1 / ROW_HEIGHT) as i64;
            row_a.cmp(&row_b).then(a.0.total_cmp(&b.0))
        });

        let mut lines: Vec<(i64, Vec<&str>)> = Vec::new();
        for (_, y, text, _) in &regions {
            let row = (*y / ROW_HEIGHT) as i64;
            match lines.last_mut() {
                Some((last_row, words)) if *last_row == row => words.push(text),
                _ => lines.push((row, vec![text])),
            }
        }
        let text = lines
            .iter()
            .map(|(_, words)| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n");

        let confidence = if regions.is_empty() {
            0.0
        } else {
            regions.iter().map(|r| r.3).sum::<f32>() / regions.len() as f32 * 100.0
        };

        debug!(
            "{} pass: {} regions in {}ms",
            mode.as_str(),
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(Recognition { text, confidence })
    }

    fn engine_id(&self) -> &str {
        "pure-onnx-ocr"
    }
}

/// Smallest x and y of a region's outline.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
