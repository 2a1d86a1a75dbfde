use super::*;
use crate::automation::collaborators::{NullRecognizer, TextRecognizer};
use crate::ranking::TextDetection;
use crate::region::{BoundingBox, CaptureRegion, ScreenPoint};
use image::{Rgb, RgbImage, imageops};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Recognizer driven by a closure, counting its calls
struct FnRecognizer<F> {
    read: F,
    calls: Arc<AtomicUsize>,
}

impl<F> TextRecognizer for FnRecognizer<F>
where
    F: Fn(&RgbImage) -> Vec<TextDetection> + Send,
{
    fn extract(&self, frame: &RgbImage) -> Vec<TextDetection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.read)(frame)
    }
}

fn counting<F>(read: F) -> (Box<dyn TextRecognizer>, Arc<AtomicUsize>)
where
    F: Fn(&RgbImage) -> Vec<TextDetection> + Send + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let recognizer = FnRecognizer {
        read,
        calls: calls.clone(),
    };
    (Box::new(recognizer), calls)
}

fn det(text: &str, x1: i32, y1: i32, x2: i32, y2: i32, conf: f32) -> TextDetection {
    TextDetection::new(text, BoundingBox::new(x1, y1, x2, y2), conf)
}

fn blank(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([240, 240, 240]))
}

fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let mut v = (x / 4).wrapping_mul(2_654_435_761) ^ (y / 4).wrapping_mul(40_503);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        let g = (v & 0xff) as u8;
        Rgb([g, g, g])
    })
}

fn config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        template_dir: dir.path().join("templates"),
        ..EngineConfig::default()
    }
}

fn engine(region: CaptureRegion, config: EngineConfig, recognizer: Box<dyn TextRecognizer>) -> MatchEngine {
    MatchEngine::from_config(region, config, recognizer)
}

#[test]
fn test_misread_target_resolves_to_absolute_centre() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(100, 50, 800, 600);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![det("OK", 100, 100, 140, 120, 0.9)];
    let result = engine.match_target("0K", &detections, &blank(800, 600));

    assert_eq!(result.method(), "ocr");
    assert_eq!(result.point(), Some(ScreenPoint::new(220, 160)));
    assert_eq!(result.score(), 100.0);
    assert!(result.diagnostics.tried_memory);
    assert!(!result.diagnostics.tried_template);
    assert!(matches!(result.outcome, MatchOutcome::Ocr { clamped: false, .. }));
}

#[test]
fn test_memory_hit_short_circuits_without_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 800, 600);
    let (recognizer, calls) = counting(|_| vec![det("Submit", 10, 10, 80, 30, 0.99)]);
    let mut engine = engine(region, config(&dir), recognizer);
    engine.memory_mut().save("Submit", &region, 300, 300).unwrap();

    let result = engine.resolve("submit", &blank(800, 600));
    assert_eq!(result.method(), "memory");
    assert_eq!(result.point(), Some(ScreenPoint::new(300, 300)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Given detections are not consulted either
    let others = vec![det("Submit", 500, 500, 560, 520, 0.99)];
    let result = engine.match_target("Submit", &others, &blank(800, 600));
    assert_eq!(result.point(), Some(ScreenPoint::new(300, 300)));
    assert_eq!(result.diagnostics.candidates_considered, 0);
}

#[test]
fn test_memory_from_other_geometry_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let old = CaptureRegion::new(0, 0, 800, 600);
    let moved = CaptureRegion::new(40, 0, 800, 600);
    let mut engine = engine(moved, config(&dir), Box::new(NullRecognizer));
    engine.memory_mut().save("Apply", &old, 300, 300).unwrap();

    let detections = vec![det("Apply", 100, 100, 160, 120, 0.9)];
    let result = engine.match_target("Apply", &detections, &blank(800, 600));
    assert_eq!(result.method(), "ocr");
    assert_eq!(result.point(), Some(ScreenPoint::new(170, 110)));
}

#[test]
fn test_remembered_point_outside_region_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(100, 100, 200, 200);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));
    engine.memory_mut().save("Close", &region, 5, 5).unwrap();

    let detections = vec![det("Close", 20, 20, 80, 40, 0.9)];
    let result = engine.match_target("Close", &detections, &blank(200, 200));
    assert_eq!(result.method(), "ocr");
    assert!(engine.memory().is_empty());
}

#[test]
fn test_total_failure_attempts_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 300, 200);
    let (recognizer, calls) = counting(|_| Vec::new());
    let mut engine = engine(region, config(&dir), recognizer);

    let result = engine.match_target("Submit", &[], &blank(300, 200));
    assert!(!result.found());
    assert_eq!(result.method(), "failed");
    assert_eq!(result.point(), None);
    let d = result.diagnostics;
    assert!(d.tried_memory && d.tried_template && d.tried_expand);
    // Only the expanded re-scan ran OCR
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failure_reports_best_visible_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 300, 200);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![det("Username", 10, 10, 90, 30, 0.9)];
    let result = engine.match_target("Password", &detections, &blank(300, 200));
    match result.outcome {
        MatchOutcome::Failed {
            best_candidate: Some((text, score)),
            detections_seen,
        } => {
            assert_eq!(text, "Username");
            assert!(score < 75.0);
            assert_eq!(detections_seen, 1);
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_out_of_frame_box_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(10, 10, 200, 100);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![det("Next", 190, 90, 230, 130, 0.9)];
    let result = engine.match_target("Next", &detections, &blank(200, 100));
    assert!(matches!(result.outcome, MatchOutcome::Ocr { clamped: true, .. }));
    assert_eq!(result.point(), Some(ScreenPoint::new(210, 110)));
}

#[test]
fn test_template_fallback_when_text_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(1000, 0, 160, 120);
    let frame = textured(160, 120);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let crop = imageops::crop_imm(&frame, 64, 48, 32, 24).to_image();
    engine.templates().save("Logo", "default", &crop).unwrap();

    let result = engine.match_target("logo", &[], &frame);
    assert_eq!(result.method(), "template");
    assert_eq!(result.point(), Some(ScreenPoint::new(1000 + 80, 60)));
    assert!(!result.diagnostics.tried_expand);
}

#[test]
fn test_disabled_stages_are_not_tried() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 100, 100);
    let cfg = EngineConfig {
        enable_memory: false,
        enable_template: false,
        enable_expanded: false,
        ..config(&dir)
    };
    let (recognizer, calls) = counting(|_| Vec::new());
    let mut engine = engine(region, cfg, recognizer);

    let result = engine.resolve("ok", &blank(100, 100));
    assert!(!result.found());
    assert_eq!(result.diagnostics, MatchDiagnostics::default());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_corrupt_template_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 100, 100);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));
    let path = engine.templates().path_for("Cancel", "default");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"garbage").unwrap();

    let result = engine.match_target("Cancel", &[], &blank(100, 100));
    assert!(!result.found());
    assert!(result.diagnostics.tried_template);
    assert!(result.diagnostics.tried_expand);
}

#[test]
fn test_expanded_rescan_finds_edge_text() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(10, 20, 200, 100);
    // Text hugging the edge is only readable once the frame is padded
    let (recognizer, calls) = counting(|frame: &RgbImage| {
        if frame.width() == 280 {
            vec![det("Next", 40, 40, 80, 60, 0.8)]
        } else {
            Vec::new()
        }
    });
    let mut engine = engine(region, config(&dir), recognizer);

    let result = engine.resolve("Next", &blank(200, 100));
    assert_eq!(result.method(), "ocr_expanded");
    assert_eq!(result.point(), Some(ScreenPoint::new(30, 30)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    match result.outcome {
        MatchOutcome::Expanded {
            source_box,
            clamped,
            ..
        } => {
            assert_eq!(source_box, BoundingBox::new(0, 0, 40, 20));
            assert!(!clamped);
        }
        other => panic!("expected expanded match, got {other:?}"),
    }
}

#[test]
fn test_expanded_match_outside_region_is_flagged_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(10, 20, 200, 100);
    // Centre of the translated box lands at (-10, -5), left of and above the region
    let (recognizer, _) = counting(|frame: &RgbImage| {
        if frame.width() == 280 {
            vec![det("Next", 10, 25, 50, 45, 0.8)]
        } else {
            Vec::new()
        }
    });
    let mut engine = engine(region, config(&dir), recognizer);

    let result = engine.resolve("Next", &blank(200, 100));
    assert_eq!(result.point(), Some(ScreenPoint::new(10, 20)));
    assert!(result.summary().contains("(clamped)"));
    match result.outcome {
        MatchOutcome::Expanded {
            source_box,
            clamped,
            ..
        } => {
            assert_eq!(source_box, BoundingBox::new(-30, -15, 10, 5));
            assert!(clamped);
        }
        other => panic!("expected expanded match, got {other:?}"),
    }
}

#[test]
fn test_exact_label_wins_over_longer_label_in_bigger_box() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 200, 200);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![
        det("Submit", 10, 10, 40, 22, 0.9),
        det("Submit form", 10, 100, 130, 130, 0.9),
    ];
    let result = engine.match_target("Submit", &detections, &blank(200, 200));
    assert_eq!(result.label(), Some("Submit"));
    assert_eq!(result.score(), 100.0);
    assert_eq!(result.point(), Some(ScreenPoint::new(25, 16)));
}

#[test]
fn test_moved_window_ignores_memory_from_old_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let old = CaptureRegion::new(0, 0, 200, 200);
    let (recognizer, calls) = counting(|_| vec![det("Done", 100, 100, 160, 120, 0.9)]);
    let mut engine = engine(old, config(&dir), recognizer);
    engine.memory_mut().save("Done", &old, 130, 110).unwrap();
    assert_eq!(engine.resolve("Done", &blank(200, 200)).method(), "memory");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let moved = CaptureRegion::new(300, 40, 200, 200);
    engine.set_region(moved);
    assert_eq!(engine.region(), &moved);

    let result = engine.resolve("Done", &blank(200, 200));
    assert_eq!(result.method(), "ocr");
    assert_eq!(result.point(), Some(ScreenPoint::new(430, 150)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_record_success_feeds_memory_ledger_and_templates() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 160, 120);
    let frame = textured(160, 120);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![det("Submit", 64, 48, 96, 72, 0.9)];
    let result = engine.match_target("Submit", &detections, &frame);
    assert_eq!(result.method(), "ocr");
    engine.record_success("Submit", &result, &frame);

    assert_eq!(engine.memory().stats().saves, 1);
    assert_eq!(engine.ledger().get("submit", "submit").unwrap().successes, 1);
    assert!(engine.templates().exists("submit", "default"));

    let again = engine.match_target("Submit", &[], &frame);
    match again.outcome {
        MatchOutcome::Memory { point, hits, .. } => {
            assert_eq!(point, ScreenPoint::new(80, 60));
            assert_eq!(hits, 1);
        }
        other => panic!("expected memory hit, got {other:?}"),
    }
}

#[test]
fn test_record_failure_invalidates_memory() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 200, 200);
    let mut engine = engine(region, config(&dir), Box::new(NullRecognizer));

    let detections = vec![det("Apply", 10, 10, 70, 30, 0.9)];
    let result = engine.match_target("Apply", &detections, &blank(200, 200));
    engine.record_success("Apply", &result, &blank(200, 200));
    assert_eq!(engine.memory().len(), 1);

    let remembered = engine.match_target("Apply", &detections, &blank(200, 200));
    engine.record_failure("Apply", &remembered);
    assert!(engine.memory().is_empty());
    assert_eq!(engine.memory().stats().invalidations, 1);
}

#[test]
fn test_locate_fresh_skips_memory() {
    let dir = tempfile::tempdir().unwrap();
    let region = CaptureRegion::new(0, 0, 200, 200);
    let (recognizer, calls) = counting(|_| vec![det("Done", 100, 100, 160, 120, 0.9)]);
    let mut engine = engine(region, config(&dir), recognizer);
    engine.memory_mut().save("Done", &region, 1, 1).unwrap();

    let result = engine.locate_fresh("Done", &blank(200, 200));
    assert_eq!(result.method(), "ocr");
    assert!(!result.diagnostics.tried_memory);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_debug_overlays_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let debug_dir = dir.path().join("debug");
    let cfg = EngineConfig {
        debug_dir: Some(debug_dir.clone()),
        enable_expanded: false,
        ..config(&dir)
    };
    let mut engine = engine(CaptureRegion::new(0, 0, 100, 60), cfg, Box::new(NullRecognizer));

    engine.match_target("OK", &[det("OK", 10, 10, 40, 25, 0.9)], &blank(100, 60));
    assert_eq!(std::fs::read_dir(&debug_dir).unwrap().count(), 1);
}
