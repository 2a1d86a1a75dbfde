// Element resolution: memory -> ranked OCR -> template -> expanded re-scan -> failed
use super::config::EngineConfig;
use super::overlay::save_overlay;
use super::result::{MatchDiagnostics, MatchOutcome, MatchResult};
use crate::automation::collaborators::TextRecognizer;
use crate::frame::{crop_box, pad_replicate};
use crate::memory::{CoordinateMemory, SuccessLedger};
use crate::ranking::{Candidate, CandidateRanker, PreparedTarget, TextDetection, best_text_score};
use crate::region::{CaptureRegion, validate};
use crate::template_matching::{TemplateMatcher, TemplateStore};
use crate::text::normalize;
use image::RgbImage;

pub struct MatchEngine {
    region: CaptureRegion,
    config: EngineConfig,
    ranker: CandidateRanker,
    memory: CoordinateMemory,
    ledger: SuccessLedger,
    templates: TemplateStore,
    recognizer: Box<dyn TextRecognizer>,
}

/// Best text-similarity seen so far, for the Failed diagnostics
type BestSeen = Option<(String, f64)>;

impl MatchEngine {
    pub fn new(
        region: CaptureRegion,
        config: EngineConfig,
        memory: CoordinateMemory,
        ledger: SuccessLedger,
        templates: TemplateStore,
        recognizer: Box<dyn TextRecognizer>,
    ) -> Self {
        let ranker = CandidateRanker::new(
            config.weights,
            config.normal_threshold,
            config.short_threshold,
            config.short_max_len,
        );
        Self {
            region,
            config,
            ranker,
            memory,
            ledger,
            templates,
            recognizer,
        }
    }

    /// Build an engine whose persistent state lives where the config says
    pub fn from_config(
        region: CaptureRegion,
        config: EngineConfig,
        recognizer: Box<dyn TextRecognizer>,
    ) -> Self {
        let memory = match &config.memory_path {
            Some(path) => CoordinateMemory::open(path, config.max_memory_entries),
            None => CoordinateMemory::in_memory(config.max_memory_entries),
        };
        let ledger = match &config.ledger_path {
            Some(path) => SuccessLedger::open(path),
            None => SuccessLedger::in_memory(),
        };
        let matcher = TemplateMatcher::new(
            config.template_threshold,
            config.template_scales.clone(),
            config.max_search_pixels,
        );
        let templates = TemplateStore::new(&config.template_dir, matcher);
        Self::new(region, config, memory, ledger, templates, recognizer)
    }

    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    /// The window moved or resized; memory keyed to the old geometry stops matching
    pub fn set_region(&mut self, region: CaptureRegion) {
        if region != self.region {
            log::info!(
                "📐 Region changed: {}x{}+{}+{} -> {}x{}+{}+{}",
                self.region.width,
                self.region.height,
                self.region.left,
                self.region.top,
                region.width,
                region.height,
                region.left,
                region.top
            );
        }
        self.region = region;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memory(&self) -> &CoordinateMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut CoordinateMemory {
        &mut self.memory
    }

    pub fn ledger(&self) -> &SuccessLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut SuccessLedger {
        &mut self.ledger
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Resolve `target` against detections the caller already has
    pub fn match_target(
        &mut self,
        target: &str,
        detections: &[TextDetection],
        frame: &RgbImage,
    ) -> MatchResult {
        self.run_chain(target, Some(detections), frame, true)
    }

    /// Resolve `target`, running OCR only when memory cannot answer
    pub fn resolve(&mut self, target: &str, frame: &RgbImage) -> MatchResult {
        self.run_chain(target, None, frame, true)
    }

    /// Resolve from what is on screen now, ignoring memory
    pub fn locate_fresh(&mut self, target: &str, frame: &RgbImage) -> MatchResult {
        self.run_chain(target, None, frame, false)
    }

    fn run_chain(
        &mut self,
        target: &str,
        detections: Option<&[TextDetection]>,
        frame: &RgbImage,
        use_memory: bool,
    ) -> MatchResult {
        log::debug!("🔍 Resolving '{}'", target);
        let mut diagnostics = MatchDiagnostics::default();

        if use_memory && self.config.enable_memory {
            diagnostics.tried_memory = true;
            if let Some(outcome) = self.memory_stage(target) {
                return self.finish(target, outcome, diagnostics);
            }
        }

        let recognized;
        let detections = match detections {
            Some(detections) => detections,
            None => {
                recognized = self.recognizer.extract(frame);
                log::debug!("OCR returned {} detections", recognized.len());
                &recognized[..]
            }
        };

        let prepared = self.ranker.prepare(target);
        let mut best_seen: BestSeen = None;

        if let Some(outcome) =
            self.ocr_stage(&prepared, detections, frame, &mut diagnostics, &mut best_seen)
        {
            return self.finish(target, outcome, diagnostics);
        }

        if self.config.enable_template {
            diagnostics.tried_template = true;
            if let Some(outcome) = self.template_stage(target, frame) {
                return self.finish(target, outcome, diagnostics);
            }
        }

        if self.config.enable_expanded {
            diagnostics.tried_expand = true;
            if let Some(outcome) =
                self.expanded_stage(&prepared, frame, &mut diagnostics, &mut best_seen)
            {
                return self.finish(target, outcome, diagnostics);
            }
        }

        let outcome = MatchOutcome::Failed {
            best_candidate: best_seen,
            detections_seen: detections.len(),
        };
        self.finish(target, outcome, diagnostics)
    }

    fn memory_stage(&mut self, target: &str) -> Option<MatchOutcome> {
        let point = self.memory.get(target, &self.region)?;
        if !self.region.contains_absolute(point) {
            log::warn!(
                "Remembered ({}, {}) for '{}' lies outside the region; dropping it",
                point.x,
                point.y,
                target
            );
            if let Err(e) = self.memory.invalidate(target, &self.region) {
                log::warn!("Failed to drop stale memory: {e}");
            }
            return None;
        }
        let hits = self.memory.hits(target, &self.region).unwrap_or(0);
        Some(MatchOutcome::Memory {
            point,
            label: normalize(target),
            hits,
        })
    }

    fn rank(
        &self,
        prepared: &PreparedTarget,
        detections: &[TextDetection],
        frame: &RgbImage,
        stage: &str,
        best_seen: &mut BestSeen,
    ) -> (Vec<Candidate>, Option<usize>) {
        let candidates = self.ranker.score(prepared, detections, &self.ledger);
        let winner = self.ranker.select(&candidates);

        if let Some((candidate, score)) = best_text_score(&candidates)
            && best_seen.as_ref().is_none_or(|(_, best)| score > *best)
        {
            *best_seen = Some((candidate.detection.text.clone(), score));
        }
        if let Some(dir) = &self.config.debug_dir {
            save_overlay(dir, &prepared.raw, stage, frame, &candidates, winner, prepared.short);
        }
        (candidates, winner)
    }

    fn ocr_stage(
        &self,
        prepared: &PreparedTarget,
        detections: &[TextDetection],
        frame: &RgbImage,
        diagnostics: &mut MatchDiagnostics,
        best_seen: &mut BestSeen,
    ) -> Option<MatchOutcome> {
        let (candidates, winner) = self.rank(prepared, detections, frame, "ocr", best_seen);
        diagnostics.candidates_considered += candidates.len();
        let winner = &candidates[winner?];

        let bbox = winner.detection.bbox;
        let (adjusted, clamped) = validate(bbox.center(), &self.region);
        Some(MatchOutcome::Ocr {
            point: self.region.to_absolute(adjusted),
            score: winner.scores.text,
            label: winner.detection.text.clone(),
            source_box: bbox,
            clamped,
        })
    }

    fn template_stage(&self, target: &str, frame: &RgbImage) -> Option<MatchOutcome> {
        match self
            .templates
            .find(target, &self.config.context_id, frame, &self.region)
        {
            Ok(Some(hit)) => Some(MatchOutcome::Template {
                point: hit.point,
                score: hit.score,
                label: hit.label,
                scale: hit.scale,
            }),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Template stage skipped: {e}");
                None
            }
        }
    }

    fn expanded_stage(
        &self,
        prepared: &PreparedTarget,
        frame: &RgbImage,
        diagnostics: &mut MatchDiagnostics,
        best_seen: &mut BestSeen,
    ) -> Option<MatchOutcome> {
        let margin = self.config.expand_margin;
        let padded = pad_replicate(frame, margin);
        let detections = self.recognizer.extract(&padded);
        log::debug!(
            "Expanded re-scan ({}px padding) returned {} detections",
            margin,
            detections.len()
        );

        let (candidates, winner) = self.rank(prepared, &detections, &padded, "expanded", best_seen);
        diagnostics.candidates_considered += candidates.len();
        let winner = &candidates[winner?];

        let offset = margin as i32;
        let source_box = winner.detection.bbox.translate(-offset, -offset);
        let (adjusted, clamped) = validate(source_box.center(), &self.region);
        if clamped {
            log::warn!(
                "Expanded match '{}' centred outside the region; clamped to ({}, {})",
                winner.detection.text,
                adjusted.x,
                adjusted.y
            );
        }
        Some(MatchOutcome::Expanded {
            point: self.region.to_absolute(adjusted),
            score: winner.scores.text,
            label: winner.detection.text.clone(),
            source_box,
            clamped,
        })
    }

    fn finish(
        &self,
        target: &str,
        outcome: MatchOutcome,
        diagnostics: MatchDiagnostics,
    ) -> MatchResult {
        let result = MatchResult {
            outcome,
            diagnostics,
        };
        if result.found() {
            log::info!("✅ '{}' -> {}", target, result.summary());
        } else {
            log::info!("❌ '{}' {}", target, result.summary());
        }
        result
    }

    /// The action on `result` visibly changed the screen.
    ///
    /// Saves the coordinate, credits the ledger and keeps a template crop of OCR
    /// matches if none exists yet. Persistence problems are logged, not returned.
    pub fn record_success(&mut self, target: &str, result: &MatchResult, frame: &RgbImage) {
        let Some(point) = result.point() else {
            return;
        };
        if let Err(e) = self.memory.save(target, &self.region, point.x, point.y) {
            log::warn!("Failed to save memory for '{}': {}", target, e);
        }

        let source = match &result.outcome {
            MatchOutcome::Ocr {
                label, source_box, ..
            }
            | MatchOutcome::Expanded {
                label, source_box, ..
            } => Some((label, source_box)),
            _ => None,
        };
        let Some((label, source_box)) = source else {
            return;
        };

        if let Err(e) = self.ledger.record_success(target, label) {
            log::warn!("Failed to update success ledger: {e}");
        }
        let stored = crop_box(frame, source_box).and_then(|crop| {
            self.templates
                .save_if_absent(target, &self.config.context_id, &crop)
        });
        if let Err(e) = stored {
            log::warn!("Template capture for '{}' failed: {}", target, e);
        }
    }

    /// The action on `result` had no visible effect: forget the coordinate
    pub fn record_failure(&mut self, target: &str, result: &MatchResult) {
        if let Err(e) = self.memory.invalidate(target, &self.region) {
            log::warn!("Failed to invalidate memory for '{}': {}", target, e);
        }
        if let MatchOutcome::Ocr { label, .. } | MatchOutcome::Expanded { label, .. } =
            &result.outcome
            && let Err(e) = self.ledger.record_failure(target, label)
        {
            log::warn!("Failed to update success ledger: {e}");
        }
    }
}
