//! Annotated ranking frames for debugging misses

use crate::ranking::Candidate;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

const MATCHED: Rgb<u8> = Rgb([0, 220, 0]);
const SHORT_CANDIDATE: Rgb<u8> = Rgb([0, 220, 220]);
const PASSING: Rgb<u8> = Rgb([255, 150, 0]);
const REJECTED: Rgb<u8> = Rgb([110, 110, 110]);

/// Draw every candidate box onto a copy of the frame the candidates were read from
pub fn draw_candidates(
    frame: &RgbImage,
    candidates: &[Candidate],
    winner: Option<usize>,
    short_target: bool,
) -> RgbImage {
    let mut canvas = frame.clone();
    for (idx, candidate) in candidates.iter().enumerate() {
        let (color, thickness) = if Some(idx) == winner {
            (MATCHED, 3)
        } else if candidate.eligible && short_target {
            (SHORT_CANDIDATE, 1)
        } else if candidate.eligible {
            (PASSING, 1)
        } else {
            (REJECTED, 1)
        };
        let b = &candidate.detection.bbox;
        for inset in 0..thickness {
            let w = b.width() - 2 * inset;
            let h = b.height() - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(b.x1 + inset, b.y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }
    canvas
}

/// Save an annotated frame as `<dir>/<timestamp>_<stage>_<target>.png`
pub fn save_overlay(
    dir: &Path,
    target: &str,
    stage: &str,
    frame: &RgbImage,
    candidates: &[Candidate],
    winner: Option<usize>,
    short_target: bool,
) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        log::warn!("Cannot create debug directory {:?}: {}", dir, e);
        return None;
    }
    let slug: String = target
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let path = dir.join(format!("{stamp}_{stage}_{slug}.png"));

    let canvas = draw_candidates(frame, candidates, winner, short_target);
    match canvas.save(&path) {
        Ok(()) => {
            log::debug!("Debug overlay written to {:?}", path);
            Some(path)
        }
        Err(e) => {
            log::warn!("Failed to write debug overlay {:?}: {}", path, e);
            None
        }
    }
}
