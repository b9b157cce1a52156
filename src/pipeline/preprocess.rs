// OCR preprocessing: grayscale -> median denoise -> local adaptive binarization
//
// Output only ever feeds the recognizer. Forensics reads the untouched color page.
use crate::config::PreprocessConfig;
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::median_filter;
use imageproc::integral_image::{integral_image, sum_image_pixels};

pub struct Preprocessor {
    denoise_radius: u32,
    window: u32,
    constant: i32,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            denoise_radius: config.denoise_radius,
            window: config.threshold_window,
            constant: config.threshold_constant,
        }
    }

    pub fn prepare(&self, page: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(page);
        let denoised = if self.denoise_radius > 0 {
            median_filter(&gray, self.denoise_radius, self.denoise_radius)
        } else {
            gray
        };
        adaptive_binarize(&denoised, self.window / 2, self.constant)
    }
}

/// Mean-C thresholding: a pixel is white when it exceeds its neighbourhood mean minus `constant`.
pub fn adaptive_binarize(image: &GrayImage, radius: u32, constant: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let integral = integral_image::<_, u64>(image);
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as i64;
            let mean = sum_image_pixels(&integral, x0, y0, x1, y1)[0] as i64 / area;
            let value = image.get_pixel(x, y)[0] as i64;
            let white = value > mean - constant as i64;
            out.put_pixel(x, y, Luma([if white { 255 } else { 0 }]));
        }
    }
    out
}
