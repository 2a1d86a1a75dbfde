mod args;

use args::{Args, Mode};
use screen_match::automation::NullRecognizer;
use screen_match::frame::{crop_box, pixel_diff_ratio};
use screen_match::match_engine::{EngineConfig, MatchEngine};
use screen_match::ranking::TextDetection;
use screen_match::region::CaptureRegion;
use screen_match::text::{normalize, shadowed_word_fixes};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, String> {
    let config = match &args.config_path {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };

    match args.mode {
        Mode::Normalize(text) => {
            println!("{}", normalize(&text));
            for key in shadowed_word_fixes() {
                log::debug!("Dictionary entry '{key}' is unreachable after character fixes");
            }
            Ok(ExitCode::SUCCESS)
        }
        Mode::Diff { before, after } => {
            let a = open_frame(&before)?;
            let b = open_frame(&after)?;
            let ratio = pixel_diff_ratio(&a, &b, config.action.diff_tolerance);
            let changed = ratio >= config.action.diff_threshold;
            println!(
                "{} {:.4} ({:.2}% of pixels, threshold {:.2}%)",
                if changed { "✅ changed" } else { "➖ unchanged" },
                ratio,
                ratio * 100.0,
                config.action.diff_threshold * 100.0
            );
            Ok(if changed { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Mode::Match {
            target,
            frame,
            detections,
        } => {
            let frame = open_frame(&frame)?;
            let region = args
                .region
                .unwrap_or_else(|| CaptureRegion::full_screen(frame.width(), frame.height()));
            let mut engine = MatchEngine::from_config(region, config, Box::new(NullRecognizer));

            let result = match detections {
                Some(path) => {
                    let detections = load_detections(&path)?;
                    println!("📄 {} recorded detections", detections.len());
                    engine.match_target(&target, &detections, &frame)
                }
                None => engine.resolve(&target, &frame),
            };

            println!("🎯 '{}': {}", target, result.summary());
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(if result.found() { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Mode::SaveTemplate { label, frame, bbox } => {
            let frame = open_frame(&frame)?;
            let region = args
                .region
                .unwrap_or_else(|| CaptureRegion::full_screen(frame.width(), frame.height()));
            let engine = MatchEngine::from_config(region, config, Box::new(NullRecognizer));
            let crop = crop_box(&frame, &bbox).map_err(|e| e.to_string())?;
            let path = engine
                .templates()
                .save(&label, &engine.config().context_id, &crop)
                .map_err(|e| e.to_string())?;
            println!("✅ Template for '{}' saved to {}", normalize(&label), path.display());
            Ok(ExitCode::SUCCESS)
        }
        Mode::Forget(label) => {
            let region = args.region.unwrap_or_else(|| CaptureRegion::full_screen(0, 0));
            let context_id = config.context_id.clone();
            let mut engine = MatchEngine::from_config(region, config, Box::new(NullRecognizer));

            let removed = engine
                .memory_mut()
                .forget(&label)
                .map_err(|e| e.to_string())?;
            engine
                .ledger_mut()
                .forget(&label)
                .map_err(|e| e.to_string())?;
            let template = engine
                .templates()
                .remove(&label, &context_id)
                .map_err(|e| e.to_string())?;
            println!(
                "🧹 '{}': {} memory entr{} removed, template {}",
                normalize(&label),
                removed,
                if removed == 1 { "y" } else { "ies" },
                if template { "deleted" } else { "absent" }
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_frame(path: &Path) -> Result<image::RgbImage, String> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| format!("Failed to load frame {}: {e}", path.display()))
}

fn load_detections(path: &Path) -> Result<Vec<TextDetection>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read detections {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid detections {}: {e}", path.display()))
}
