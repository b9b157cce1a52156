// Page normalization: decode an image or rasterize every PDF page with pdftoppm
use crate::config::NormalizerConfig;
use crate::types::{Page, Result, VerifyError};
use image::{DynamicImage, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

pub struct PageNormalizer {
    dpi: u32,
    pdftoppm: PathBuf,
}

impl PageNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            dpi: config.pdf_dpi,
            pdftoppm: config.pdftoppm_path.clone(),
        }
    }

    /// Ordered 3-channel pages for the document.
    pub fn normalize(&self, bytes: &[u8], filename: &str) -> Result<Vec<Page>> {
        let images = if is_paginated(bytes, filename) {
            self.rasterize_pdf(bytes)?
        } else {
            vec![decode_image(bytes)?]
        };

        let pages: Vec<Page> = images
            .into_iter()
            .filter(|img| img.width() > 0 && img.height() > 0)
            .enumerate()
            .map(|(index, image)| Page { index, image })
            .collect();

        if pages.is_empty() {
            return Err(VerifyError::UnsupportedFormat(format!(
                "{} produced no valid raster",
                filename
            )));
        }
        debug!(filename, pages = pages.len(), "normalized document");
        Ok(pages)
    }

    fn rasterize_pdf(&self, bytes: &[u8]) -> Result<Vec<RgbImage>> {
        let expected = pdf_page_count(bytes)?;

        let temp_dir = TempDir::new()
            .map_err(|e| VerifyError::UnsupportedFormat(format!("temp dir: {}", e)))?;
        let input = temp_dir.path().join("input.pdf");
        fs::write(&input, bytes)
            .map_err(|e| VerifyError::UnsupportedFormat(format!("staging PDF: {}", e)))?;
        let prefix = temp_dir.path().join("page");

        let output = Command::new(&self.pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                VerifyError::UnsupportedFormat(format!("cannot run {}: {}", self.pdftoppm.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::UnsupportedFormat(format!("pdftoppm failed: {}", stderr.trim())));
        }

        let rendered = collect_rendered_pages(temp_dir.path())?;
        if rendered.len() != expected {
            debug!(expected, rendered = rendered.len(), "pdftoppm page count differs from PDF tree");
        }

        rendered
            .iter()
            .map(|path| {
                image::open(path)
                    .map(to_color)
                    .map_err(|e| VerifyError::UnsupportedFormat(format!("{}: {}", path.display(), e)))
            })
            .collect()
    }
}

/// True when the filename or the leading bytes indicate a PDF.
pub fn is_paginated(bytes: &[u8], filename: &str) -> bool {
    let by_name = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    by_name || bytes.starts_with(b"%PDF-")
}

pub fn pdf_page_count(bytes: &[u8]) -> Result<usize> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| VerifyError::UnsupportedFormat(format!("invalid PDF: {}", e)))?;
    let count = document.get_pages().len();
    if count == 0 {
        return Err(VerifyError::UnsupportedFormat("PDF has no pages".to_string()));
    }
    Ok(count)
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    image::load_from_memory(bytes)
        .map(to_color)
        .map_err(|e| VerifyError::UnsupportedFormat(e.to_string()))
}

// Grayscale and alpha sources all end up as plain RGB
fn to_color(image: DynamicImage) -> RgbImage {
    image.to_rgb8()
}

// pdftoppm zero-pads page numbers to the width of the page count: page-01.png ... page-12.png
fn collect_rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| VerifyError::UnsupportedFormat(format!("reading rendered pages: {}", e)))?;

    let mut numbered: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let is_png = path.extension().and_then(|e| e.to_str()) == Some("png");
            let number = stem.strip_prefix("page-")?.parse::<usize>().ok()?;
            is_png.then_some((number, path))
        })
        .collect();

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}
