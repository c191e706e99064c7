//! PDF text-layer and page-image extraction using lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::error::PdfError;

/// A loaded PDF document.
pub struct PdfExtractor {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Parse a PDF from bytes, decrypting documents that use an empty password.
    pub fn load(data: &[u8]) -> Result<Self, PdfError> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Text layer of each page, in page order.
    ///
    /// Pages are read individually. When a page's text cannot be decoded the
    /// whole document goes through pdf-extract instead, which copes with more
    /// font encodings, and is returned as a single page.
    pub fn page_texts(&self) -> Vec<String> {
        let mut undecodable = 0;
        let pages: Vec<String> = (1..=self.page_count())
            .map(|page| match self.document.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    trace!("Could not decode text on page {}: {}", page, e);
                    undecodable += 1;
                    String::new()
                }
            })
            .collect();

        if undecodable == 0 {
            return pages;
        }

        match pdf_extract::extract_text_from_mem(&self.raw_data) {
            Ok(text) if !text.trim().is_empty() => {
                debug!("{} pages needed pdf-extract", undecodable);
                vec![text]
            }
            Ok(_) => pages,
            Err(e) => {
                debug!("pdf-extract found no text: {}", e);
                pages
            }
        }
    }

    /// Images drawn on a page (its XObject resources).
    pub fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>, PdfError> {
        let pages = self.document.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();
        if let Some(resources) = self.page_resources(*page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) {
                    for (_, reference) in xobjects.iter() {
                        if let Ok((_, object)) = self.document.dereference(reference) {
                            images.extend(self.decode_image(object));
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }

    /// Every decodable image object in the document, in object order.
    pub fn all_images(&self) -> Vec<DynamicImage> {
        let images: Vec<DynamicImage> = self
            .document
            .objects
            .values()
            .filter_map(|object| self.decode_image(object))
            .collect();
        debug!("Found {} images in document", images.len());
        images
    }

    fn decode_image(&self, object: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = object else {
            return None;
        };
        let dict = &stream.dict;
        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        let filter = dict.get(b"Filter").ok().and_then(|filter| match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(filters) => filters.first().and_then(|o| o.as_name().ok()),
            _ => None,
        });
        match filter {
            Some(b"DCTDecode") => {
                trace!("Decoding JPEG image");
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(items) => items.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => self.document.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");
        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        raw_image(&data, width, height, color_space, bits)
    }

    /// Page resources, inherited from the page tree when not set on the page.
    fn page_resources(&self, node_id: ObjectId) -> Option<Dictionary> {
        let Ok(Object::Dictionary(node)) = self.document.get_object(node_id) else {
            return None;
        };
        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(resources))) = self.document.dereference(resources) {
                return Some(resources.clone());
            }
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(*parent_id),
            _ => None,
        }
    }
}

/// Build an image from uncompressed 8-bit samples.
fn raw_image(data: &[u8], width: u32, height: u32, color_space: &[u8], bits: i64) -> Option<DynamicImage> {
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode {} image: {} bytes for {}x{}",
                String::from_utf8_lossy(color_space),
                data.len(),
                width,
                height
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(PdfExtractor::load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_raw_gray_image() {
        let image = raw_image(&[0, 64, 128, 255], 2, 2, b"DeviceGray", 8).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.to_luma8().get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn test_raw_image_too_short() {
        assert!(raw_image(&[0, 0, 0], 2, 2, b"DeviceRGB", 8).is_none());
        assert!(raw_image(&[0; 16], 2, 2, b"DeviceGray", 1).is_none());
    }
}
