/// Template matching data types
use crate::region::ScreenPoint;

/// Best placement of a template inside a frame, in frame-pixel space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleMatch {
    /// Top-left corner in the searched frame
    pub x: u32,
    pub y: u32,
    /// Scaled template extent
    pub width: u32,
    pub height: u32,
    /// Zero-mean normalized cross-correlation, -1.0 to 1.0
    pub score: f64,
    /// Template scale factor that produced this placement
    pub scale: f64,
}

impl ScaleMatch {
    /// Centre of the placement: top-left plus half the scaled extent
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }
}

/// A template located on screen
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateHit {
    /// Normalized label the template was stored under
    pub label: String,
    /// Absolute screen coordinate of the match centre
    pub point: ScreenPoint,
    pub score: f64,
    pub scale: f64,
}

impl TemplateHit {
    /// Format hit as string with correlation percentage
    pub fn describe(&self) -> String {
        format!(
            "{} at ({},{}) - {}% @ {:.2}x",
            self.label,
            self.point.x,
            self.point.y,
            (self.score * 100.0) as i32,
            self.scale
        )
    }
}
