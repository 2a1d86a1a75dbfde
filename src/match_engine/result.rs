//! Resolution outcomes

use crate::region::{BoundingBox, ScreenPoint};
use serde::Serialize;

/// How a target was resolved. Every point is absolute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Validated coordinate recalled for this label and region
    Memory {
        point: ScreenPoint,
        label: String,
        hits: u32,
    },
    /// Ranked OCR detection
    Ocr {
        point: ScreenPoint,
        /// Text similarity, 0-100
        score: f64,
        /// Detection text as read
        label: String,
        source_box: BoundingBox,
        /// The centre lay outside the region and was clamped
        clamped: bool,
    },
    /// Stored visual template
    Template {
        point: ScreenPoint,
        /// Correlation coefficient
        score: f64,
        label: String,
        scale: f64,
    },
    /// OCR on the edge-padded frame
    #[serde(rename = "ocr_expanded")]
    Expanded {
        point: ScreenPoint,
        score: f64,
        label: String,
        /// Box in region-relative frame space
        source_box: BoundingBox,
        clamped: bool,
    },
    /// Nothing cleared its threshold
    Failed {
        /// Highest text similarity seen, with its detection text
        best_candidate: Option<(String, f64)>,
        detections_seen: usize,
    },
}

/// Which stages ran and how much was looked at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchDiagnostics {
    pub tried_memory: bool,
    pub tried_template: bool,
    pub tried_expand: bool,
    pub candidates_considered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub diagnostics: MatchDiagnostics,
}

impl MatchResult {
    pub fn found(&self) -> bool {
        !matches!(self.outcome, MatchOutcome::Failed { .. })
    }

    pub fn point(&self) -> Option<ScreenPoint> {
        match &self.outcome {
            MatchOutcome::Memory { point, .. }
            | MatchOutcome::Ocr { point, .. }
            | MatchOutcome::Template { point, .. }
            | MatchOutcome::Expanded { point, .. } => Some(*point),
            MatchOutcome::Failed { .. } => None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self.outcome {
            MatchOutcome::Memory { .. } => "memory",
            MatchOutcome::Ocr { .. } => "ocr",
            MatchOutcome::Template { .. } => "template",
            MatchOutcome::Expanded { .. } => "ocr_expanded",
            MatchOutcome::Failed { .. } => "failed",
        }
    }

    /// Score on the outcome's own scale; memory hits report 100
    pub fn score(&self) -> f64 {
        match &self.outcome {
            MatchOutcome::Memory { .. } => 100.0,
            MatchOutcome::Ocr { score, .. }
            | MatchOutcome::Template { score, .. }
            | MatchOutcome::Expanded { score, .. } => *score,
            MatchOutcome::Failed { .. } => 0.0,
        }
    }

    /// Text the target was matched against, if any
    pub fn label(&self) -> Option<&str> {
        match &self.outcome {
            MatchOutcome::Memory { label, .. }
            | MatchOutcome::Ocr { label, .. }
            | MatchOutcome::Template { label, .. }
            | MatchOutcome::Expanded { label, .. } => Some(label),
            MatchOutcome::Failed { .. } => None,
        }
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        match &self.outcome {
            MatchOutcome::Failed {
                best_candidate,
                detections_seen,
            } => match best_candidate {
                Some((text, score)) => format!(
                    "not found ({detections_seen} detections, best '{text}' at {score:.1})"
                ),
                None => format!("not found ({detections_seen} detections)"),
            },
            MatchOutcome::Ocr { clamped: true, .. }
            | MatchOutcome::Expanded { clamped: true, .. } => format!(
                "{} via {} (clamped) score={:.1}",
                self.point_str(),
                self.method(),
                self.score()
            ),
            _ => format!("{} via {} score={:.1}", self.point_str(), self.method(), self.score()),
        }
    }

    fn point_str(&self) -> String {
        self.point()
            .map(|p| format!("({}, {})", p.x, p.y))
            .unwrap_or_default()
    }
}
