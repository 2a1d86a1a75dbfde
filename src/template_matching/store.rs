//! On-disk template assets: `<root>/<context_id>/<normalized label>.png`

use super::matcher::TemplateMatcher;
use super::types::TemplateHit;
use crate::error::{TemplateError, TemplateResult};
use crate::region::CaptureRegion;
use crate::text::normalize;
use image::{GrayImage, RgbImage};
use std::path::PathBuf;

pub struct TemplateStore {
    root: PathBuf,
    matcher: TemplateMatcher,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>, matcher: TemplateMatcher) -> Self {
        Self {
            root: root.into(),
            matcher,
        }
    }

    /// Asset path for a label within a context (application / screen family)
    pub fn path_for(&self, label: &str, context_id: &str) -> PathBuf {
        let normalized = normalize(label);
        let stem = if normalized.is_empty() {
            "_".to_string()
        } else {
            normalized
        };
        self.root.join(context_id).join(format!("{stem}.png"))
    }

    pub fn exists(&self, label: &str, context_id: &str) -> bool {
        self.path_for(label, context_id).is_file()
    }

    /// Store a crop, replacing any existing asset
    pub fn save(&self, label: &str, context_id: &str, crop: &RgbImage) -> TemplateResult<PathBuf> {
        let path = self.path_for(label, context_id);
        if crop.width() == 0 || crop.height() == 0 {
            return Err(TemplateError::EmptyAsset { path });
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| TemplateError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        crop.save(&path).map_err(|source| TemplateError::Save {
            path: path.clone(),
            source,
        })?;
        log::info!("💾 Template saved: {:?} ({}x{})", path, crop.width(), crop.height());
        Ok(path)
    }

    /// Store a crop only if no asset exists yet. Returns whether a file was written.
    pub fn save_if_absent(
        &self,
        label: &str,
        context_id: &str,
        crop: &RgbImage,
    ) -> TemplateResult<bool> {
        if self.exists(label, context_id) {
            log::debug!("Template for '{}' already present; keeping it", normalize(label));
            return Ok(false);
        }
        self.save(label, context_id, crop).map(|_| true)
    }

    /// Load an asset as grayscale, `None` when it does not exist
    pub fn load(&self, label: &str, context_id: &str) -> TemplateResult<Option<GrayImage>> {
        let path = self.path_for(label, context_id);
        if !path.is_file() {
            return Ok(None);
        }
        let image = image::open(&path).map_err(|source| TemplateError::AssetCorrupt {
            path: path.clone(),
            source,
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TemplateError::EmptyAsset { path });
        }
        Ok(Some(image.to_luma8()))
    }

    /// Delete an asset. Returns whether one existed.
    pub fn remove(&self, label: &str, context_id: &str) -> TemplateResult<bool> {
        let path = self.path_for(label, context_id);
        if !path.is_file() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|source| TemplateError::Remove { path, source })?;
        Ok(true)
    }

    /// Locate the stored template for `label` in a region-relative frame.
    ///
    /// The returned point is absolute: match centre plus region origin.
    pub fn find(
        &self,
        label: &str,
        context_id: &str,
        frame: &RgbImage,
        region: &CaptureRegion,
    ) -> TemplateResult<Option<TemplateHit>> {
        let Some(template) = self.load(label, context_id)? else {
            log::debug!("No template for '{}' in context '{}'", normalize(label), context_id);
            return Ok(None);
        };

        let frame_gray = image::imageops::grayscale(frame);
        let Some(best) = self.matcher.find_best(&frame_gray, &template) else {
            log::debug!(
                "Template for '{}' below threshold {:.2}",
                normalize(label),
                self.matcher.threshold()
            );
            return Ok(None);
        };

        let hit = TemplateHit {
            label: normalize(label),
            point: region.to_absolute(best.center()),
            score: best.score,
            scale: best.scale,
        };
        log::info!("🎯 Template match: {}", hit.describe());
        Ok(Some(hit))
    }
}
