/// Template matching implementation
///
/// Multi-scale zero-mean normalized cross-correlation. Raw cross-correlation comes from
/// imageproc; window means and energies come from summed-area tables, which turns it
/// into the correlation coefficient. Large frames are searched coarse-to-fine.
use super::types::ScaleMatch;
use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};

pub const DEFAULT_THRESHOLD: f64 = 0.72;

/// Templates smaller than this (either side, after scaling) are not searched
pub const MIN_TEMPLATE_SIZE: u32 = 4;

/// Frames above this pixel count get a downscaled first pass
pub const DEFAULT_MAX_SEARCH_PIXELS: u64 = 1_000_000;

/// Variance below which a window or template counts as flat
const FLAT_VARIANCE: f64 = 1e-6;

/// 0.85 to 1.15 in steps of 0.05
pub fn default_scales() -> Vec<f64> {
    (0..=6).map(|i| 0.85 + i as f64 * 0.05).collect()
}

/// Template matcher for locating a stored crop inside a frame
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    threshold: f64,
    scales: Vec<f64>,
    max_search_pixels: u64,
}

impl TemplateMatcher {
    pub fn new(threshold: f64, scales: Vec<f64>, max_search_pixels: u64) -> Self {
        Self {
            threshold,
            scales,
            max_search_pixels: max_search_pixels.max(1),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best placement across the scale sweep, if it exceeds the threshold
    pub fn find_best(&self, frame: &GrayImage, template: &GrayImage) -> Option<ScaleMatch> {
        let mut best: Option<ScaleMatch> = None;

        for &scale in &self.scales {
            let Some(scaled) = scale_template(template, scale) else {
                continue;
            };
            if scaled.width() > frame.width() || scaled.height() > frame.height() {
                log::debug!(
                    "  Scale {:.2}: template {}x{} larger than frame {}x{}",
                    scale,
                    scaled.width(),
                    scaled.height(),
                    frame.width(),
                    frame.height()
                );
                continue;
            }

            let Some((x, y, score)) = self.search(frame, &scaled) else {
                continue;
            };
            log::debug!("  Scale {:.2}: best {:.3} at ({}, {})", scale, score, x, y);

            if best.is_none_or(|b| score > b.score) {
                best = Some(ScaleMatch {
                    x,
                    y,
                    width: scaled.width(),
                    height: scaled.height(),
                    score,
                    scale,
                });
            }
        }

        best.filter(|b| b.score > self.threshold)
    }

    /// Full-resolution search, or coarse pass plus local refinement on large frames
    fn search(&self, frame: &GrayImage, template: &GrayImage) -> Option<(u32, u32, f64)> {
        let pixels = frame.width() as u64 * frame.height() as u64;
        if pixels <= self.max_search_pixels {
            return best_position(frame, template);
        }

        let factor = (self.max_search_pixels as f64 / pixels as f64).sqrt();
        let small_tw = (template.width() as f64 * factor).round() as u32;
        let small_th = (template.height() as f64 * factor).round() as u32;
        if small_tw < MIN_TEMPLATE_SIZE || small_th < MIN_TEMPLATE_SIZE {
            return best_position(frame, template);
        }

        let small_frame = imageops::resize(
            frame,
            ((frame.width() as f64 * factor).round() as u32).max(small_tw),
            ((frame.height() as f64 * factor).round() as u32).max(small_th),
            FilterType::Triangle,
        );
        let small_template = imageops::resize(template, small_tw, small_th, FilterType::Triangle);
        let (cx, cy, coarse) = best_position(&small_frame, &small_template)?;

        // Refine in a window around the coarse peak, mapped back to full resolution
        let margin = (2.0 / factor).ceil() as u32 + 2;
        let guess_x = (cx as f64 / factor).round() as u32;
        let guess_y = (cy as f64 / factor).round() as u32;
        let max_x = frame.width() - template.width();
        let max_y = frame.height() - template.height();
        let left = guess_x.saturating_sub(margin).min(max_x);
        let top = guess_y.saturating_sub(margin).min(max_y);
        let right = (guess_x + margin).min(max_x);
        let bottom = (guess_y + margin).min(max_y);

        let window = imageops::crop_imm(
            frame,
            left,
            top,
            right - left + template.width(),
            bottom - top + template.height(),
        )
        .to_image();
        let (rx, ry, score) = best_position(&window, template)?;
        log::debug!(
            "  Coarse {:.3} at ({}, {}) refined to {:.3} at ({}, {})",
            coarse,
            cx,
            cy,
            score,
            left + rx,
            top + ry
        );
        Some((left + rx, top + ry, score))
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, default_scales(), DEFAULT_MAX_SEARCH_PIXELS)
    }
}

fn scale_template(template: &GrayImage, scale: f64) -> Option<GrayImage> {
    if (scale - 1.0).abs() < 1e-6 {
        return (template.width() >= MIN_TEMPLATE_SIZE && template.height() >= MIN_TEMPLATE_SIZE)
            .then(|| template.clone());
    }
    let width = (template.width() as f64 * scale).round() as u32;
    let height = (template.height() as f64 * scale).round() as u32;
    if width < MIN_TEMPLATE_SIZE || height < MIN_TEMPLATE_SIZE {
        return None;
    }
    Some(imageops::resize(template, width, height, FilterType::Lanczos3))
}

/// Summed-area table of values and squared values, `(w + 1) x (h + 1)`
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl Integral {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sq = vec![0.0; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = image.get_pixel(x as u32, y as u32).0[0] as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq[idx] = sq[idx - stride] + row_sq;
            }
        }
        Self { stride, sum, sq }
    }

    /// Sum and squared sum of the `w x h` window at (x, y)
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let a = y * self.stride + x;
        let b = y * self.stride + x + w;
        let c = (y + h) * self.stride + x;
        let d = (y + h) * self.stride + x + w;
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sq[d] - self.sq[b] - self.sq[c] + self.sq[a],
        )
    }
}

/// Top-left and score of the best zero-mean NCC placement.
///
/// Flat windows score 0. A flat template cannot be located and yields `None`.
pub fn best_position(frame: &GrayImage, template: &GrayImage) -> Option<(u32, u32, f64)> {
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > frame.width() || th > frame.height() {
        return None;
    }

    let n = tw as f64 * th as f64;
    let (t_sum, t_sq) = template.pixels().fold((0.0, 0.0), |(s, q), p| {
        let v = p.0[0] as f64;
        (s + v, q + v * v)
    });
    let t_var = t_sq - t_sum * t_sum / n;
    if t_var <= FLAT_VARIANCE {
        log::debug!("  Template is flat; nothing to correlate");
        return None;
    }

    let cross = match_template(frame, template, MatchTemplateMethod::CrossCorrelation);
    let integral = Integral::new(frame);

    let mut best: Option<(u32, u32, f64)> = None;
    for (x, y, pixel) in cross.enumerate_pixels() {
        let (w_sum, w_sq) = integral.window(x as usize, y as usize, tw as usize, th as usize);
        let w_var = w_sq - w_sum * w_sum / n;
        let score = if w_var <= FLAT_VARIANCE {
            0.0
        } else {
            let numerator = pixel.0[0] as f64 - w_sum * t_sum / n;
            (numerator / (w_var * t_var).sqrt()).clamp(-1.0, 1.0)
        };
        if best.is_none_or(|(_, _, s)| score > s) {
            best = Some((x, y, score));
        }
    }
    best
}
