/// Candidate ranking
///
/// Blends fuzzy text similarity, OCR confidence, box geometry and validated history into
/// one score per detection. The winner is the best text match among candidates that
/// clear the adaptive (short / normal) threshold; the blended score only separates
/// equally good text matches.
use super::types::{
    Candidate, PreparedTarget, RankWeights, ScoreBreakdown, SuccessHistory, TextDetection,
};
use crate::region::BoundingBox;
use crate::text::{is_short_target, normalize, text_similarity};

/// Neutral history score for pairs that were never validated
const NEUTRAL_HISTORY: f64 = 0.5;

/// Boxes at or above this area (px²) get full geometry credit
const GEOMETRY_FULL_AREA: f64 = 2000.0;

/// Aspect ratios outside (min, max) look less like buttons or labels
const BUTTON_ASPECT: (f64, f64) = (1.5, 10.0);
const ODD_ASPECT_PENALTY: f64 = 0.7;

pub struct CandidateRanker {
    weights: RankWeights,
    normal_threshold: f64,
    short_threshold: f64,
    short_max_len: usize,
}

impl CandidateRanker {
    pub fn new(
        weights: RankWeights,
        normal_threshold: f64,
        short_threshold: f64,
        short_max_len: usize,
    ) -> Self {
        Self {
            weights,
            normal_threshold,
            short_threshold,
            short_max_len,
        }
    }

    /// Normalize the target and pick its adaptive threshold
    pub fn prepare(&self, target: &str) -> PreparedTarget {
        let normalized = normalize(target);
        let short = is_short_target(&normalized, self.short_max_len);
        let threshold = if short {
            self.short_threshold
        } else {
            self.normal_threshold
        };
        PreparedTarget {
            raw: target.to_string(),
            normalized,
            short,
            threshold,
        }
    }

    /// Score every detection against the target.
    ///
    /// The returned candidates are in reading order (top to bottom, then left to right,
    /// then input order), which is also the tie-break order used by [`Self::select`].
    pub fn score(
        &self,
        target: &PreparedTarget,
        detections: &[TextDetection],
        history: &dyn SuccessHistory,
    ) -> Vec<Candidate> {
        let mut ordered: Vec<&TextDetection> = detections.iter().collect();
        ordered.sort_by_key(|d| (d.bbox.y1, d.bbox.x1));

        ordered
            .into_iter()
            .map(|detection| {
                let normalized = normalize(&detection.text);
                let text = if target.normalized.is_empty() {
                    0.0
                } else {
                    text_similarity(&target.normalized, &normalized, target.short)
                };
                let confidence = detection.confidence.clamp(0.0, 1.0) as f64;
                let geometry = geometry_score(&detection.bbox);
                let history = history
                    .success_rate(&target.normalized, &normalized)
                    .unwrap_or(NEUTRAL_HISTORY);

                let blended = self.weights.text * (text / 100.0)
                    + self.weights.confidence * confidence
                    + self.weights.geometry * geometry
                    + self.weights.history * history;

                Candidate {
                    detection: detection.clone(),
                    normalized,
                    scores: ScoreBreakdown {
                        text,
                        confidence,
                        geometry,
                        history,
                        blended,
                    },
                    eligible: text >= target.threshold,
                }
            })
            .collect()
    }

    /// Index of the winning candidate, if any cleared the threshold.
    ///
    /// Ordered by text similarity, then blended score. Strictly-greater comparison keeps
    /// the first candidate in reading order on full ties.
    pub fn select(&self, candidates: &[Candidate]) -> Option<usize> {
        let mut best: Option<(usize, f64, f64)> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            if !candidate.eligible {
                continue;
            }
            let text = candidate.scores.text;
            let blended = candidate.scores.blended;
            let better = match best {
                None => true,
                Some((_, best_text, best_blended)) => {
                    text > best_text || (text == best_text && blended > best_blended)
                }
            };
            if better {
                best = Some((idx, text, blended));
            }
        }

        for (rank, candidate) in candidates.iter().enumerate().take(3) {
            log::debug!(
                "Candidate #{}: '{}' -> blended={:.3} (T:{:.1} O:{:.2} G:{:.2} H:{:.2}){}",
                rank + 1,
                candidate.detection.text,
                candidate.scores.blended,
                candidate.scores.text,
                candidate.scores.confidence,
                candidate.scores.geometry,
                candidate.scores.history,
                if candidate.eligible { "" } else { " below threshold" }
            );
        }

        best.map(|(idx, _, _)| idx)
    }
}

/// Best text similarity among candidates, for "visible but under-confidence" diagnostics
pub fn best_text_score(candidates: &[Candidate]) -> Option<(&Candidate, f64)> {
    candidates.iter().fold(None, |best, c| match best {
        Some((_, score)) if c.scores.text <= score => best,
        _ => Some((c, c.scores.text)),
    })
}

/// Heuristic favouring boxes shaped like buttons or fields.
///
/// Small boxes score proportionally to their area; aspect ratios outside the usual
/// button range are penalised. The constants are tuning, not contract.
pub fn geometry_score(bbox: &BoundingBox) -> f64 {
    let width = bbox.width() as f64;
    let height = bbox.height() as f64;
    let area = width * height;
    if area <= 0.0 {
        return 0.0;
    }

    let mut score = (area / GEOMETRY_FULL_AREA).min(1.0);
    let aspect = width / height;
    if !(aspect > BUTTON_ASPECT.0 && aspect < BUTTON_ASPECT.1) {
        score *= ODD_ASPECT_PENALTY;
    }
    score
}
