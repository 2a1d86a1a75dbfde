use screen_match::region::{BoundingBox, CaptureRegion};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Mode {
    /// Resolve a target against a saved frame (and optionally a recorded OCR dump)
    Match {
        target: String,
        frame: PathBuf,
        detections: Option<PathBuf>,
    },
    /// Changed-pixel ratio between two frames
    Diff { before: PathBuf, after: PathBuf },
    Normalize(String),
    SaveTemplate {
        label: String,
        frame: PathBuf,
        bbox: BoundingBox,
    },
    /// Drop memory, ledger and template for a label
    Forget(String),
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub region: Option<CaptureRegion>,
    pub config_path: Option<PathBuf>,
    pub debug_mode: bool,
}

impl Args {
    /// `Ok(None)` when help or version was printed
    pub fn parse() -> Result<Option<Self>, String> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    pub fn parse_from(args: &[String]) -> Result<Option<Self>, String> {
        let mut target: Option<String> = None;
        let mut frame: Option<PathBuf> = None;
        let mut detections: Option<PathBuf> = None;
        let mut diff: Option<(PathBuf, PathBuf)> = None;
        let mut normalize: Option<String> = None;
        let mut save_template: Option<String> = None;
        let mut bbox: Option<BoundingBox> = None;
        let mut forget: Option<String> = None;
        let mut region: Option<CaptureRegion> = None;
        let mut config_path: Option<PathBuf> = None;
        let mut debug_mode = false;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return Ok(None);
            } else if arg == "--version" || arg == "-v" {
                println!("screen-match v{}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if let Some(val) = arg.strip_prefix("--match=") {
                target = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--frame=") {
                frame = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--detections=") {
                detections = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--diff=") {
                match val.split_once(',') {
                    Some((a, b)) if !a.is_empty() && !b.is_empty() => {
                        diff = Some((PathBuf::from(a), PathBuf::from(b)))
                    }
                    _ => return Err(format!("Invalid --diff value: {val} (expected a.png,b.png)")),
                }
            } else if let Some(val) = arg.strip_prefix("--normalize=") {
                normalize = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--save-template=") {
                save_template = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--box=") {
                bbox = Some(
                    parse_box(val)
                        .ok_or_else(|| format!("Invalid --box value: {val} (expected x1,y1,x2,y2)"))?,
                );
            } else if let Some(val) = arg.strip_prefix("--forget=") {
                forget = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--region=") {
                region = Some(CaptureRegion::parse(val).ok_or_else(|| {
                    format!("Invalid --region value: {val} (expected left,top,width,height)")
                })?);
            } else if let Some(val) = arg.strip_prefix("--config=") {
                config_path = Some(PathBuf::from(val));
            } else {
                print_help();
                return Err(format!("Unknown argument: {arg}"));
            }
        }

        let selected = [
            target.is_some(),
            diff.is_some(),
            normalize.is_some(),
            save_template.is_some(),
            forget.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if selected != 1 {
            print_help();
            return Err("Exactly one of --match, --diff, --normalize, --save-template, --forget is required".to_string());
        }

        let mode = if let Some(target) = target {
            let frame = frame.ok_or("--match needs --frame=<png>")?;
            Mode::Match {
                target,
                frame,
                detections,
            }
        } else if let Some((before, after)) = diff {
            Mode::Diff { before, after }
        } else if let Some(text) = normalize {
            Mode::Normalize(text)
        } else if let Some(label) = save_template {
            let frame = frame.ok_or("--save-template needs --frame=<png>")?;
            let bbox = bbox.ok_or("--save-template needs --box=x1,y1,x2,y2")?;
            Mode::SaveTemplate { label, frame, bbox }
        } else if let Some(label) = forget {
            Mode::Forget(label)
        } else {
            return Err("No mode selected".to_string());
        };

        Ok(Some(Args {
            mode,
            region,
            config_path,
            debug_mode,
        }))
    }
}

fn parse_box(val: &str) -> Option<BoundingBox> {
    let parts: Vec<&str> = val.split(',').collect();
    if parts.len() == 4
        && let (Ok(x1), Ok(y1), Ok(x2), Ok(y2)) = (
            parts[0].trim().parse::<i32>(),
            parts[1].trim().parse::<i32>(),
            parts[2].trim().parse::<i32>(),
            parts[3].trim().parse::<i32>(),
        )
        && x2 > x1
        && y2 > y1
    {
        return Some(BoundingBox::new(x1, y1, x2, y2));
    }
    None
}

fn print_help() {
    println!("🔎 screen-match: self-healing element resolution");
    println!();
    println!("USAGE:");
    println!("    screen-match <MODE> [FLAGS]");
    println!();
    println!("MODES:");
    println!("    --match=<target> --frame=<png> [--detections=<json>]");
    println!("                        Resolve a target against a saved frame and OCR dump");
    println!("    --diff=<a.png>,<b.png>");
    println!("                        Report the changed-pixel ratio between two frames");
    println!("    --normalize=<text>  Print the canonical form of a label");
    println!("    --save-template=<label> --frame=<png> --box=x1,y1,x2,y2");
    println!("                        Store a template crop (overwrites)");
    println!("    --forget=<label>    Drop memory, ledger entries and template for a label");
    println!();
    println!("FLAGS:");
    println!("    --region=l,t,w,h    Capture region (default: whole frame at 0,0)");
    println!("    --config=<json>     Engine configuration file");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    screen-match --normalize=\"0K\"");
    println!("    screen-match --match=Submit --frame=shot.png --detections=ocr.json --region=100,50,800,600");
    println!("    screen-match --diff=before.png,after.png");
}
