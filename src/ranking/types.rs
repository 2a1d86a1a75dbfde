/// Ranking data types
use crate::region::BoundingBox;
use serde::{Deserialize, Serialize};

/// One OCR hit: text, axis-aligned box in frame-pixel space and confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl TextDetection {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// Blend weights for the four ranking signals. They must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub text: f64,
    pub confidence: f64,
    pub geometry: f64,
    pub history: f64,
}

impl RankWeights {
    pub fn sum(&self) -> f64 {
        self.text + self.confidence + self.geometry + self.history
    }
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            text: 0.4,
            confidence: 0.2,
            geometry: 0.2,
            history: 0.2,
        }
    }
}

/// Per-signal scores of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    /// Fuzzy text similarity, 0–100
    pub text: f64,
    /// OCR confidence, 0–1
    pub confidence: f64,
    /// Button-likeness of the box, 0–1
    pub geometry: f64,
    /// Historical success ratio, 0–1 (0.5 when unknown)
    pub history: f64,
    /// Weighted blend, 0–1
    pub blended: f64,
}

/// A detection scored against one target. Lives for a single resolution call.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub detection: TextDetection,
    pub normalized: String,
    pub scores: ScoreBreakdown,
    /// Text similarity cleared the adaptive threshold
    pub eligible: bool,
}

/// Target label prepared for ranking
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTarget {
    pub raw: String,
    pub normalized: String,
    pub short: bool,
    pub threshold: f64,
}

/// Source of memory-derived success ratios for (label, candidate text) pairs
pub trait SuccessHistory {
    /// Success ratio in [0, 1], or `None` when the pair was never validated
    fn success_rate(&self, label: &str, candidate: &str) -> Option<f64>;
}

/// History source that knows nothing; every pair scores neutral
pub struct NoHistory;

impl SuccessHistory for NoHistory {
    fn success_rate(&self, _label: &str, _candidate: &str) -> Option<f64> {
        None
    }
}
