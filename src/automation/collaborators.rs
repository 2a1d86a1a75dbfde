// External capabilities the resolution pipeline drives but does not implement
use crate::error::{CaptureError, InjectionError};
use crate::ranking::TextDetection;
use crate::region::CaptureRegion;
use image::RgbImage;

/// OCR model wrapper: text, box and confidence for every line it reads
pub trait TextRecognizer: Send {
    fn extract(&self, frame: &RgbImage) -> Vec<TextDetection>;
}

/// Recognizer that reads nothing. Used for offline replay with recorded detections.
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn extract(&self, _frame: &RgbImage) -> Vec<TextDetection> {
        Vec::new()
    }
}

// Pointer and keyboard injection in logical screen coordinates
#[allow(async_fn_in_trait)]
pub trait InputInjector: Send {
    async fn click(&mut self, x: i32, y: i32) -> Result<(), InjectionError>;
    async fn type_text(&mut self, text: &str) -> Result<(), InjectionError>;
}

// Region capture in native pixels
#[allow(async_fn_in_trait)]
pub trait FrameSource: Send {
    async fn capture(&mut self, region: &CaptureRegion) -> Result<RgbImage, CaptureError>;
}
