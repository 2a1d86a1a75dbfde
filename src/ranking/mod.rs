/// Candidate ranking for OCR detections
///
/// This module scores every detection on screen against a target label with:
/// - Fuzzy text similarity on normalized strings (short-target aware)
/// - OCR confidence
/// - Button-like geometry
/// - Memory-derived success history
pub mod ranker;
pub mod types;

pub use ranker::{CandidateRanker, best_text_score, geometry_score};
pub use types::{
    Candidate, NoHistory, PreparedTarget, RankWeights, ScoreBreakdown, SuccessHistory,
    TextDetection,
};
