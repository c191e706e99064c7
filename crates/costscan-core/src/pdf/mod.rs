//! PDF boundary: the text layer when there is one, otherwise OCR over the
//! images of the first few pages.

mod extractor;

pub use extractor::PdfExtractor;

use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{PdfError, Result, ScanError};
use crate::models::{OcrConfig, PdfConfig, RecognitionResult};
use crate::ocr::{TextRecognizer, recognize_best};

/// Engine id of results read straight from the text layer.
pub const PDF_TEXT_ENGINE: &str = "pdf-text";

/// What a PDF offers for recognition.
#[derive(Debug, Clone)]
pub enum PdfContent {
    /// Text layer long enough to use as-is.
    Text(String),
    /// Too little text; page images for OCR and whatever text there was.
    Scanned {
        text: String,
        images: Vec<DynamicImage>,
    },
}

/// Read a PDF's text layer, falling back to the images of the first
/// `max_ocr_pages` pages when the text is shorter than `min_text_length`.
///
/// When those pages reference no images, every image object in the document
/// is taken instead, capped at `max_ocr_pages` images rather than pages.
pub fn read_pdf(data: &[u8], config: &PdfConfig) -> std::result::Result<PdfContent, PdfError> {
    let pdf = PdfExtractor::load(data)?;
    let text = pdf
        .page_texts()
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let length = text.chars().count();
    if length >= config.min_text_length {
        debug!("Using PDF text layer ({} chars)", length);
        return Ok(PdfContent::Text(text));
    }

    let pages = pdf.page_count().min(config.max_ocr_pages);
    let mut images = Vec::new();
    for page in 1..=pages {
        images.extend(pdf.page_images(page)?);
    }
    if images.is_empty() {
        debug!("No page images on the first {} pages, scanning all objects", pages);
        images = pdf.all_images();
        images.truncate(config.max_ocr_pages as usize);
    }

    info!(
        "PDF text layer has {} chars, {} page images for OCR",
        length,
        images.len()
    );
    Ok(PdfContent::Scanned { text, images })
}

/// Recognize a PDF: the text layer, or OCR of its page images.
///
/// Fails with `BackendUnavailable` only when OCR is needed, no recognizer is
/// given, and the text layer is empty.
pub fn recognize_pdf(
    data: &[u8],
    pdf_config: &PdfConfig,
    ocr_config: &OcrConfig,
    recognizer: Option<&dyn TextRecognizer>,
) -> Result<RecognitionResult> {
    let start = Instant::now();
    let (text, images) = match read_pdf(data, pdf_config)? {
        PdfContent::Text(text) => {
            return Ok(RecognitionResult::new(text, 1.0, PDF_TEXT_ENGINE)
                .with_processing_time(start.elapsed().as_millis() as u64));
        }
        PdfContent::Scanned { text, images } => (text, images),
    };

    let Some(recognizer) = recognizer else {
        if text.trim().is_empty() {
            return Err(ScanError::BackendUnavailable(
                "scanned PDF needs an OCR recognizer".to_string(),
            ));
        }
        warn!("No OCR recognizer, using short PDF text layer");
        return Ok(short_text_layer(text, start));
    };

    if images.is_empty() {
        if text.trim().is_empty() {
            return Err(PdfError::ImageExtraction("no page images found".to_string()).into());
        }
        return Ok(short_text_layer(text, start));
    }

    let pages: Vec<RecognitionResult> = images
        .iter()
        .map(|image| {
            recognize_best(
                recognizer,
                image,
                &ocr_config.segmentation_modes,
                ocr_config.min_text_length,
            )
        })
        .collect();

    let recognized: Vec<&RecognitionResult> = pages.iter().filter(|p| !p.is_error_state()).collect();
    let elapsed = start.elapsed().as_millis() as u64;
    if recognized.is_empty() {
        // Every page failed; the first page's diagnostic explains why
        return Ok(pages
            .into_iter()
            .next()
            .map(|p| p.with_processing_time(elapsed))
            .unwrap_or_else(|| RecognitionResult::degraded("ocr", "no pages recognized")));
    }

    let text = recognized
        .iter()
        .map(|p| p.raw_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let confidence = recognized.iter().map(|p| p.confidence).sum::<f32>() / recognized.len() as f32;
    info!(
        "Recognized {} of {} PDF pages in {}ms",
        recognized.len(),
        pages.len(),
        elapsed
    );

    Ok(RecognitionResult::new(text, confidence, recognized[0].engine_id.clone())
        .with_processing_time(elapsed))
}

/// A text layer too short to trust, kept at low confidence.
fn short_text_layer(text: String, start: Instant) -> RecognitionResult {
    RecognitionResult::new(text, 0.3, PDF_TEXT_ENGINE).with_processing_time(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::{Recognition, SegmentationMode};
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// Single-page PDF with optional text lines and an optional gray image.
    fn build_pdf(lines: &[&str], with_image: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 750.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if with_image {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 4,
                    "Height" => 4,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![200; 16],
            ));
            resources.set("XObject", dictionary! { "Im0" => image_id });
        }
        let resources_id = doc.add_object(resources);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _image: &DynamicImage, _mode: SegmentationMode) -> std::result::Result<Recognition, OcrError> {
            Ok(Recognition {
                text: self.0.to_string(),
                confidence: 80.0,
            })
        }
    }

    #[test]
    fn test_text_layer_is_used() {
        let pdf = build_pdf(
            &[
                "Elektro Bosna d.o.o. Sarajevo",
                "Faktura broj 2024-0117",
                "Ukupno za platiti 117,00 KM",
            ],
            false,
        );
        let result = recognize_pdf(&pdf, &PdfConfig::default(), &OcrConfig::default(), None).unwrap();

        assert_eq!(result.engine_id, PDF_TEXT_ENGINE);
        assert!(result.raw_text.contains("Ukupno"));
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scanned_pdf_goes_through_ocr() {
        let pdf = build_pdf(&[], true);
        let recognizer = FixedRecognizer("Racun 15/2024 Ukupno 50,00 KM");
        let result = recognize_pdf(
            &pdf,
            &PdfConfig::default(),
            &OcrConfig::default(),
            Some(&recognizer),
        )
        .unwrap();

        assert_eq!(result.raw_text, "Racun 15/2024 Ukupno 50,00 KM");
        assert_eq!(result.engine_id, "ocr:auto");
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_scanned_pdf_without_recognizer() {
        let pdf = build_pdf(&[], true);
        let result = recognize_pdf(&pdf, &PdfConfig::default(), &OcrConfig::default(), None);
        assert!(matches!(result, Err(ScanError::BackendUnavailable(_))));
    }

    #[test]
    fn test_read_pdf_collects_page_images() {
        let pdf = build_pdf(&["kratko"], true);
        match read_pdf(&pdf, &PdfConfig::default()).unwrap() {
            PdfContent::Scanned { images, .. } => assert_eq!(images.len(), 1),
            PdfContent::Text(text) => panic!("expected scanned content, got {:?}", text),
        }
    }

    #[test]
    fn test_unreferenced_images_are_capped_by_count() {
        let mut doc = Document::load_mem(&build_pdf(&["kratko"], false)).unwrap();
        for _ in 0..3 {
            doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 2,
                    "Height" => 2,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![0; 4],
            ));
        }
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let config = PdfConfig {
            max_ocr_pages: 2,
            ..Default::default()
        };
        match read_pdf(&pdf, &config).unwrap() {
            PdfContent::Scanned { images, .. } => assert_eq!(images.len(), 2),
            PdfContent::Text(text) => panic!("expected scanned content, got {:?}", text),
        }
    }
}
