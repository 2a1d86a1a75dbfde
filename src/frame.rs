//! Frame utilities: pixel differencing, edge padding and cropping

use crate::error::{TemplateError, TemplateResult};
use crate::region::BoundingBox;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Grayscale intensity change above which a pixel counts as changed
pub const DEFAULT_DIFF_TOLERANCE: u8 = 25;

/// Fraction of pixels whose grayscale intensity changed by more than `tolerance`.
///
/// A frame of a different size is resized to the first frame's size before comparison.
/// Empty frames compare as unchanged.
pub fn pixel_diff_ratio(before: &RgbImage, after: &RgbImage, tolerance: u8) -> f64 {
    let total = before.width() as u64 * before.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let before_gray = imageops::grayscale(before);
    let after_gray = if after.dimensions() != before.dimensions() {
        log::debug!(
            "Diff frames differ in size ({:?} vs {:?}); resizing",
            before.dimensions(),
            after.dimensions()
        );
        if after.width() == 0 || after.height() == 0 {
            log::warn!("After-frame is empty; treating it as unchanged");
            return 0.0;
        }
        let resized = imageops::resize(after, before.width(), before.height(), FilterType::Triangle);
        imageops::grayscale(&resized)
    } else {
        imageops::grayscale(after)
    };

    let changed = before_gray
        .pixels()
        .zip(after_gray.pixels())
        .filter(|(a, b)| a.0[0].abs_diff(b.0[0]) > tolerance)
        .count() as u64;

    changed as f64 / total as f64
}

/// Pad a frame by `margin` pixels on every side, replicating the edge pixels outward
pub fn pad_replicate(frame: &RgbImage, margin: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 || margin == 0 {
        return frame.clone();
    }

    RgbImage::from_fn(w + 2 * margin, h + 2 * margin, |x, y| {
        let sx = x.saturating_sub(margin).min(w - 1);
        let sy = y.saturating_sub(margin).min(h - 1);
        *frame.get_pixel(sx, sy)
    })
}

/// Copy the part of `frame` covered by `bbox`, clipped to the frame
pub fn crop_box(frame: &RgbImage, bbox: &BoundingBox) -> TemplateResult<RgbImage> {
    let (w, h) = frame.dimensions();
    let x1 = bbox.x1.clamp(0, w as i32) as u32;
    let y1 = bbox.y1.clamp(0, h as i32) as u32;
    let x2 = bbox.x2.clamp(0, w as i32) as u32;
    let y2 = bbox.y2.clamp(0, h as i32) as u32;

    if x2 <= x1 || y2 <= y1 {
        return Err(TemplateError::CropOutOfFrame {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
            width: w,
            height: h,
        });
    }

    Ok(imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_identical_frames_have_zero_diff() {
        let a = RgbImage::from_pixel(20, 10, Rgb([40, 80, 120]));
        assert_eq!(pixel_diff_ratio(&a, &a.clone(), DEFAULT_DIFF_TOLERANCE), 0.0);
    }

    #[test]
    fn test_diff_counts_changed_pixels_above_tolerance() {
        let before = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let mut after = before.clone();
        for x in 0..10 {
            after.put_pixel(x, 0, Rgb([255, 255, 255]));
        }
        // Below tolerance: ignored
        after.put_pixel(0, 5, Rgb([10, 10, 10]));

        let ratio = pixel_diff_ratio(&before, &after, DEFAULT_DIFF_TOLERANCE);
        assert!((ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_diff_resizes_mismatched_frames() {
        let before = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let after = RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]));
        assert_eq!(pixel_diff_ratio(&before, &after, DEFAULT_DIFF_TOLERANCE), 0.0);
    }

    #[test]
    fn test_empty_after_frame_is_not_a_change() {
        let before = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let after = RgbImage::new(0, 0);
        assert_eq!(pixel_diff_ratio(&before, &after, DEFAULT_DIFF_TOLERANCE), 0.0);
    }

    #[test]
    fn test_pad_replicate_copies_edges() {
        let mut frame = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        frame.put_pixel(0, 0, Rgb([255, 0, 0]));
        frame.put_pixel(1, 1, Rgb([0, 0, 255]));

        let padded = pad_replicate(&frame, 3);
        assert_eq!(padded.dimensions(), (8, 8));
        assert_eq!(*padded.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*padded.get_pixel(7, 7), Rgb([0, 0, 255]));
        assert_eq!(*padded.get_pixel(3, 3), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_crop_box_clips_and_rejects() {
        let frame = RgbImage::from_pixel(50, 40, Rgb([1, 2, 3]));
        let crop = crop_box(&frame, &BoundingBox::new(40, 30, 60, 60)).unwrap();
        assert_eq!(crop.dimensions(), (10, 10));

        assert!(matches!(
            crop_box(&frame, &BoundingBox::new(60, 60, 70, 70)),
            Err(TemplateError::CropOutOfFrame { .. })
        ));
    }
}
