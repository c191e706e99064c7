//! Image preparation for each segmentation mode.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

use super::SegmentationMode;

/// Image preprocessor for the recognition attempts.
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
    /// Window size for adaptive thresholding.
    block_size: u32,
    /// Offset subtracted from the local mean.
    threshold_offset: i32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            max_size: 2048,
            block_size: 15,
            threshold_offset: 5,
        }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size.max(1);
        self
    }

    /// Prepare an image for one recognition attempt.
    ///
    /// - `Auto`: resized original
    /// - `SingleBlock`: grayscale with stretched contrast
    /// - `SparseText`: binarized with an adaptive threshold
    pub fn prepare(&self, image: &DynamicImage, mode: SegmentationMode) -> DynamicImage {
        let resized = self.fit(image);
        match mode {
            SegmentationMode::Auto => resized,
            SegmentationMode::SingleBlock => {
                DynamicImage::ImageLuma8(stretch_contrast(&resized.to_luma8()))
            }
            SegmentationMode::SparseText => DynamicImage::ImageLuma8(self.adaptive_threshold(
                &resized.to_luma8(),
                self.block_size,
                self.threshold_offset,
            )),
        }
    }

    /// Downscale so the longer side is at most `max_size`.
    fn fit(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height, self.max_size);
        if (new_width, new_height) == (width, height) {
            return image.clone();
        }

        debug!("Resizing {}x{} to {}x{}", width, height, new_width, new_height);
        image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32, target_size: u32) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= target_size {
            return (width, height);
        }

        let scale = target_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }

    /// Local-mean thresholding over a summed-area table.
    fn adaptive_threshold(&self, image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
        let (width, height) = image.dimensions();
        let mut result = GrayImage::new(width, height);
        if width == 0 || height == 0 {
            return result;
        }

        let stride = width as usize + 1;
        let mut integral = vec![0u64; stride * (height as usize + 1)];
        for y in 0..height as usize {
            let mut row_sum = 0u64;
            for x in 0..width as usize {
                row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
            }
        }

        let half_block = block_size / 2;
        for y in 0..height {
            let y0 = y.saturating_sub(half_block) as usize;
            let y1 = (y + half_block + 1).min(height) as usize;
            for x in 0..width {
                let x0 = x.saturating_sub(half_block) as usize;
                let x1 = (x + half_block + 1).min(width) as usize;

                let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                    - integral[y0 * stride + x1]
                    - integral[y1 * stride + x0];
                let count = ((y1 - y0) * (x1 - x0)) as u64;

                let threshold = (sum / count) as i32 - c;
                let pixel_value = image.get_pixel(x, y)[0] as i32;
                let output = if pixel_value > threshold { 255 } else { 0 };
                result.put_pixel(x, y, Luma([output]));
            }
        }

        result
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the darkest pixel to black and the brightest to white.
fn stretch_contrast(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return image.clone();
    }

    let range = (max - min) as f32;
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        pixel[0] = (((pixel[0] - min) as f32 / range) * 255.0).round() as u8;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_dimensions() {
        let preprocessor = ImagePreprocessor::new();

        let (w, h) = preprocessor.calculate_resize_dimensions(500, 300, 960);
        assert_eq!((w, h), (500, 300));

        let (w, h) = preprocessor.calculate_resize_dimensions(1920, 1080, 960);
        assert_eq!(w, 960);
        assert!(h < 960);
    }

    #[test]
    fn test_prepare_respects_max_size() {
        let image = DynamicImage::new_rgb8(400, 100);
        let prepared = ImagePreprocessor::new()
            .with_max_size(200)
            .prepare(&image, SegmentationMode::Auto);
        assert_eq!(prepared.dimensions(), (200, 50));
    }

    #[test]
    fn test_sparse_text_is_binary() {
        let mut gray = GrayImage::from_pixel(20, 20, Luma([200]));
        for x in 5..15 {
            gray.put_pixel(x, 10, Luma([30]));
        }
        let prepared = ImagePreprocessor::new()
            .prepare(&DynamicImage::ImageLuma8(gray), SegmentationMode::SparseText)
            .to_luma8();

        assert!(prepared.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(prepared.get_pixel(10, 10)[0], 0);
        assert_eq!(prepared.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_stretch_contrast() {
        let mut gray = GrayImage::from_pixel(2, 1, Luma([100]));
        gray.put_pixel(1, 0, Luma([150]));
        let stretched = stretch_contrast(&gray);

        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(1, 0)[0], 255);
    }
}
