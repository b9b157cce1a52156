// Forensic analysis: independent weak tamper signals fused into one authenticity score
use crate::config::ForensicThresholds;
use crate::types::{ForensicMetrics, ForensicReport, Result, VerifyError};
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageFormat, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::laplacian_filter;
use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;

pub const ISSUE_COMPRESSION: &str = "significant compression inconsistency";
pub const WARN_COMPRESSION: &str = "moderate compression artifacts";
pub const WARN_DETAILED: &str = "high edge density (detailed document)";
pub const ISSUE_SMOOTH: &str = "suspiciously smooth - possible digital creation";
pub const WARN_OVER_SMOOTHED: &str = "low noise (over-smoothed or high-quality scan)";
pub const WARN_POOR_SCAN: &str = "high noise (poor scan quality)";
pub const WARN_LIMITED_COLOR: &str = "limited color variation";
pub const ISSUE_DUPLICATES: &str = "repeated patterns found - possible copy-paste tampering";

/// Raw measurements taken from one color page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageMetrics {
    pub ela_score: f64,
    pub edge_density: f64,
    pub noise_variance: f64,
    pub channel_std: [f64; 3],
    pub duplicate_blocks: usize,
}

pub struct ForensicAnalyzer {
    thresholds: ForensicThresholds,
}

impl ForensicAnalyzer {
    pub fn new(thresholds: ForensicThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze_page(&self, page: &RgbImage) -> Result<ForensicReport> {
        let metrics = self.measure(page)?;
        Ok(score_metrics(&metrics, &self.thresholds))
    }

    pub fn measure(&self, page: &RgbImage) -> Result<PageMetrics> {
        let t = &self.thresholds;
        let gray = image::imageops::grayscale(page);
        Ok(PageMetrics {
            ela_score: recompression_delta(page, t.jpeg_quality)?,
            edge_density: edge_density(&gray, t.canny_low, t.canny_high),
            noise_variance: laplacian_variance(&gray),
            channel_std: channel_std(page),
            duplicate_blocks: duplicate_blocks(&gray, t.block_size, t.block_stride),
        })
    }
}

/// Applies the five checks to measured metrics. Pure, so every cutoff is testable in isolation.
pub fn score_metrics(m: &PageMetrics, t: &ForensicThresholds) -> ForensicReport {
    let mut score = 100.0;
    let mut issues = BTreeSet::new();
    let mut warnings = BTreeSet::new();

    if m.ela_score > t.ela_issue_threshold {
        issues.insert(ISSUE_COMPRESSION.to_string());
        score -= t.ela_issue_penalty;
    } else if m.ela_score > t.ela_warning_threshold {
        warnings.insert(WARN_COMPRESSION.to_string());
        score -= t.ela_warning_penalty;
    }

    if m.edge_density > t.edge_high {
        warnings.insert(WARN_DETAILED.to_string());
        score -= t.edge_high_penalty;
    } else if m.edge_density < t.edge_low {
        issues.insert(ISSUE_SMOOTH.to_string());
        score -= t.edge_low_penalty;
    }

    if m.noise_variance < t.noise_low {
        warnings.insert(WARN_OVER_SMOOTHED.to_string());
        score -= t.noise_penalty;
    } else if m.noise_variance > t.noise_high {
        warnings.insert(WARN_POOR_SCAN.to_string());
        score -= t.noise_penalty;
    }

    if m.channel_std.iter().any(|s| *s < t.color_std_floor) {
        warnings.insert(WARN_LIMITED_COLOR.to_string());
        score -= t.color_penalty;
    }

    if m.duplicate_blocks > t.duplicate_block_threshold {
        issues.insert(ISSUE_DUPLICATES.to_string());
        score -= t.duplicate_penalty;
    }

    ForensicReport {
        authenticity_score: clamp_score(score),
        tampering_detected: !issues.is_empty(),
        issues,
        warnings,
        metrics: ForensicMetrics {
            ela_score: m.ela_score,
            edge_density: m.edge_density,
            noise_variance: m.noise_variance,
        },
    }
}

/// Mean of per-page scores and metrics, union of findings.
pub fn reduce_reports(reports: &[ForensicReport]) -> ForensicReport {
    if reports.is_empty() {
        return ForensicReport::empty();
    }

    let issues: BTreeSet<String> = reports.iter().flat_map(|r| r.issues.iter().cloned()).collect();
    let warnings: BTreeSet<String> = reports.iter().flat_map(|r| r.warnings.iter().cloned()).collect();

    ForensicReport {
        authenticity_score: clamp_score(mean_of(reports, |r| r.authenticity_score)),
        tampering_detected: !issues.is_empty(),
        issues,
        warnings,
        metrics: ForensicMetrics {
            ela_score: mean_of(reports, |r| r.metrics.ela_score),
            edge_density: mean_of(reports, |r| r.metrics.edge_density),
            noise_variance: mean_of(reports, |r| r.metrics.noise_variance),
        },
    }
}

fn mean_of(reports: &[ForensicReport], field: impl Fn(&ForensicReport) -> f64) -> f64 {
    reports.iter().map(field).sum::<f64>() / reports.len() as f64
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Mean absolute per-channel difference between the page and a JPEG re-encode of it.
pub fn recompression_delta(page: &RgbImage, quality: u8) -> Result<f64> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(page)
        .map_err(|e| VerifyError::UnsupportedFormat(format!("re-encode failed: {}", e)))?;
    let decoded = image::load_from_memory_with_format(buf.get_ref(), ImageFormat::Jpeg)
        .map_err(|e| VerifyError::UnsupportedFormat(format!("re-decode failed: {}", e)))?
        .to_rgb8();

    let total: u64 = page
        .as_raw()
        .iter()
        .zip(decoded.as_raw())
        .map(|(a, b)| (*a as i16 - *b as i16).unsigned_abs() as u64)
        .sum();
    let samples = page.as_raw().len().max(1) as f64;
    Ok(total as f64 / samples)
}

pub fn edge_density(gray: &GrayImage, low: f32, high: f32) -> f64 {
    let total = (gray.width() as u64 * gray.height() as u64).max(1);
    let edges = canny(gray, low, high);
    let count = edges.pixels().filter(|p| p[0] > 0).count() as u64;
    count as f64 / total as f64
}

/// Variance of the 4-neighbour Laplacian response.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let response = laplacian_filter(gray);
    let n = response.width() as usize * response.height() as usize;
    if n == 0 {
        return 0.0;
    }
    let (sum, sum_sq) = response.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

pub fn channel_std(page: &RgbImage) -> [f64; 3] {
    let n = (page.width() as u64 * page.height() as u64).max(1) as f64;
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    for pixel in page.pixels() {
        for c in 0..3 {
            let v = pixel[c] as f64;
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }
    let mut out = [0.0; 3];
    for c in 0..3 {
        let mean = sum[c] / n;
        out[c] = (sum_sq[c] / n - mean * mean).max(0.0).sqrt();
    }
    out
}

/// Counts exact repeats among sampled, non-overlapping blocks. Flat blocks never count.
pub fn duplicate_blocks(gray: &GrayImage, block: u32, stride: u32) -> usize {
    let (w, h) = gray.dimensions();
    if block == 0 || w < block || h < block {
        return 0;
    }
    let stride = stride.max(block);
    let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();

    let mut y = 0;
    while y + block <= h {
        let mut x = 0;
        while x + block <= w {
            let mut content = Vec::with_capacity((block * block) as usize);
            for by in y..y + block {
                for bx in x..x + block {
                    content.push(gray.get_pixel(bx, by)[0]);
                }
            }
            let flat = content.iter().all(|v| *v == content[0]);
            if !flat {
                *seen.entry(content).or_insert(0) += 1;
            }
            x += stride;
        }
        y += stride;
    }

    seen.values().map(|count| count - 1).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn clean_metrics() -> PageMetrics {
        PageMetrics {
            ela_score: 2.0,
            edge_density: 0.05,
            noise_variance: 500.0,
            channel_std: [40.0, 42.0, 38.0],
            duplicate_blocks: 0,
        }
    }

    fn t() -> ForensicThresholds {
        ForensicThresholds::default()
    }

    #[test]
    fn clean_page_scores_full_marks() {
        let report = score_metrics(&clean_metrics(), &t());
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.authenticity_score, 100.0);
        assert!(!report.tampering_detected);
    }

    #[test]
    fn compression_tiers() {
        let mut m = clean_metrics();
        m.ela_score = 10.0;
        let moderate = score_metrics(&m, &t());
        assert!(moderate.warnings.contains(WARN_COMPRESSION));
        assert!(!moderate.tampering_detected);
        assert_eq!(moderate.authenticity_score, 90.0);

        m.ela_score = 20.0;
        let high = score_metrics(&m, &t());
        assert!(high.issues.contains(ISSUE_COMPRESSION));
        assert!(high.tampering_detected);
        assert_eq!(high.authenticity_score, 75.0);
    }

    #[test]
    fn dense_edges_only_warn() {
        let mut m = clean_metrics();
        m.edge_density = 0.4;
        let report = score_metrics(&m, &t());
        assert!(report.warnings.contains(WARN_DETAILED));
        assert!(!report.tampering_detected);
        assert_eq!(report.authenticity_score, 95.0);
    }

    #[test]
    fn smooth_page_is_an_issue() {
        let mut m = clean_metrics();
        m.edge_density = 0.001;
        let report = score_metrics(&m, &t());
        assert!(report.issues.contains(ISSUE_SMOOTH));
        assert_eq!(report.authenticity_score, 85.0);
    }

    #[test]
    fn noise_extremes_never_gate() {
        let mut m = clean_metrics();
        m.noise_variance = 1.0;
        assert!(!score_metrics(&m, &t()).tampering_detected);
        m.noise_variance = 1.0e6;
        let report = score_metrics(&m, &t());
        assert!(report.warnings.contains(WARN_POOR_SCAN));
        assert!(!report.tampering_detected);
    }

    #[test]
    fn one_low_channel_is_enough_for_color_warning() {
        let mut m = clean_metrics();
        m.channel_std = [40.0, 3.0, 40.0];
        let report = score_metrics(&m, &t());
        assert!(report.warnings.contains(WARN_LIMITED_COLOR));
        assert_eq!(report.authenticity_score, 90.0);
    }

    #[test]
    fn score_floors_at_zero() {
        let mut harsh = t();
        harsh.ela_issue_penalty = 80.0;
        harsh.edge_low_penalty = 80.0;
        let m = PageMetrics {
            ela_score: 50.0,
            edge_density: 0.0,
            ..clean_metrics()
        };
        assert_eq!(score_metrics(&m, &harsh).authenticity_score, 0.0);
    }

    #[test]
    fn worse_metrics_never_raise_the_score() {
        let base = clean_metrics();
        let mut last = f64::MAX;
        for ela in [0.0, 5.0, 8.5, 12.0, 16.0, 40.0] {
            let s = score_metrics(&PageMetrics { ela_score: ela, ..base }, &t()).authenticity_score;
            assert!(s <= last);
            last = s;
        }
        last = f64::MAX;
        for edges in [0.1, 0.05, 0.02, 0.009, 0.0] {
            let s = score_metrics(&PageMetrics { edge_density: edges, ..base }, &t()).authenticity_score;
            assert!(s <= last);
            last = s;
        }
        last = f64::MAX;
        for dups in [0, 5, 10, 11, 50] {
            let s = score_metrics(&PageMetrics { duplicate_blocks: dups, ..base }, &t()).authenticity_score;
            assert!(s <= last);
            last = s;
        }
    }

    #[test]
    fn reduction_averages_and_unions() {
        let clean = score_metrics(&clean_metrics(), &t());
        let smooth = score_metrics(
            &PageMetrics { edge_density: 0.0, channel_std: [1.0, 1.0, 1.0], ..clean_metrics() },
            &t(),
        );
        let reduced = reduce_reports(&[clean.clone(), smooth.clone(), smooth]);
        assert!((reduced.authenticity_score - (100.0 + 75.0 + 75.0) / 3.0).abs() < 1e-9);
        assert_eq!(reduced.issues.len(), 1);
        assert_eq!(reduced.warnings.len(), 1);
        assert!(reduced.tampering_detected);
    }

    #[test]
    fn uniform_page_has_no_edges_and_no_duplicates() {
        let page = RgbImage::from_pixel(64, 64, Rgb([200, 200, 200]));
        let gray = image::imageops::grayscale(&page);
        assert_eq!(edge_density(&gray, 50.0, 150.0), 0.0);
        assert_eq!(laplacian_variance(&gray), 0.0);
        assert_eq!(duplicate_blocks(&gray, 16, 32), 0);
        assert_eq!(channel_std(&page), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn single_dot_laplacian_variance() {
        let mut gray = GrayImage::new(5, 5);
        gray.put_pixel(2, 2, Luma([255]));
        // centre -1020, four neighbours +255, everything else 0
        assert_eq!(laplacian_variance(&gray), (1020.0 * 1020.0 + 4.0 * 255.0 * 255.0) / 25.0);
    }

    #[test]
    fn repeated_texture_counts_as_duplicates() {
        // Identical checkerboard tile stamped at every sampled block
        let gray = GrayImage::from_fn(128, 128, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        assert_eq!(duplicate_blocks(&gray, 16, 32), 15);
    }

    #[test]
    fn recompression_of_flat_page_is_near_lossless() {
        let page = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        assert!(recompression_delta(&page, 90).unwrap() < 2.0);
    }

    #[test]
    fn analyzer_flags_blank_page_as_smooth() {
        let page = RgbImage::from_pixel(64, 64, Rgb([240, 240, 240]));
        let report = ForensicAnalyzer::new(t()).analyze_page(&page).unwrap();
        assert!(report.issues.contains(ISSUE_SMOOTH));
        assert!(report.tampering_detected);
        assert!(report.authenticity_score <= 85.0);
    }
}
