//! Capture region geometry, coordinate types and bounds validation

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An absolute (or region-relative, depending on context) pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box `[x1, y1, x2, y2]` in frame-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Integer centre, rounded towards negative infinity
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            (self.x1 + self.x2).div_euclid(2),
            (self.y1 + self.y2).div_euclid(2),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// The rectangular screen sub-area all capture and coordinates are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Create a region covering a whole screen of the given size
    pub fn full_screen(screen_width: u32, screen_height: u32) -> Self {
        Self::new(0, 0, screen_width, screen_height)
    }

    /// Parse `left,top,width,height` (as used on the command line); empty regions are rejected
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split(',').collect();
        if parts.len() == 4
            && let (Ok(left), Ok(top), Ok(width), Ok(height)) = (
                parts[0].trim().parse::<i32>(),
                parts[1].trim().parse::<i32>(),
                parts[2].trim().parse::<u32>(),
                parts[3].trim().parse::<u32>(),
            )
        {
            return Some(Self::new(left, top, width, height)).filter(Self::is_valid);
        }
        None
    }

    /// Stable hash of the region geometry.
    ///
    /// The canonical form is the sorted-key JSON text `{"height": H, "left": L, "top": T,
    /// "width": W}`; the first 16 hex characters of its SHA-256 digest are used. Memory
    /// files written by earlier tooling with the same convention stay valid.
    pub fn geometry_hash(&self) -> String {
        let canonical = format!(
            "{{\"height\": {}, \"left\": {}, \"top\": {}, \"width\": {}}}",
            self.height, self.left, self.top, self.width
        );
        let digest = Sha256::digest(canonical.as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(16);
        hash
    }

    /// Convert a region-relative point to absolute screen space
    pub fn to_absolute(&self, point: ScreenPoint) -> ScreenPoint {
        point.offset(self.left, self.top)
    }

    /// Convert an absolute point to region-relative space
    pub fn to_relative(&self, point: ScreenPoint) -> ScreenPoint {
        point.offset(-self.left, -self.top)
    }

    /// Check if an absolute point lies inside the region (edges inclusive)
    pub fn contains_absolute(&self, point: ScreenPoint) -> bool {
        let rel = self.to_relative(point);
        rel.x >= 0 && rel.y >= 0 && rel.x <= self.width as i32 && rel.y <= self.height as i32
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Clamp a region-relative point into the region.
///
/// Returns the adjusted point and whether clamping happened. A clamped point is never
/// silently trusted: callers surface the flag in their diagnostics.
pub fn validate(point: ScreenPoint, region: &CaptureRegion) -> (ScreenPoint, bool) {
    let max_x = region.width as i32;
    let max_y = region.height as i32;
    let clamped = ScreenPoint::new(point.x.clamp(0, max_x), point.y.clamp(0, max_y));
    let was_clamped = clamped != point;
    if was_clamped {
        log::debug!(
            "Coordinate ({}, {}) clamped to ({}, {}) inside {}x{} region",
            point.x,
            point.y,
            clamped.x,
            clamped.y,
            region.width,
            region.height
        );
    }
    (clamped, was_clamped)
}

/// Ratio between native (capture) pixels and logical (input) pixels.
///
/// Retina displays report 2.0, Windows at 150% DPI reports 1.5. Matching happens in
/// native space; conversion to logical space happens immediately before injection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenScale {
    pub x: f64,
    pub y: f64,
}

impl ScreenScale {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Derive the scale from native and logical screen sizes
    pub fn from_sizes(native: (u32, u32), logical: (u32, u32)) -> Self {
        let sx = native.0 as f64 / logical.0.max(1) as f64;
        let sy = native.1 as f64 / logical.1.max(1) as f64;
        Self::new(sx, sy)
    }

    pub fn identity() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn to_logical(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            (point.x as f64 / self.x) as i32,
            (point.y as f64 / self.y) as i32,
        )
    }

    pub fn to_native(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            (point.x as f64 * self.x) as i32,
            (point.y as f64 * self.y) as i32,
        )
    }
}

impl Default for ScreenScale {
    fn default() -> Self {
        Self::identity()
    }
}
