//! Configuration for element resolution and action validation

use crate::error::ConfigError;
use crate::memory::DEFAULT_MAX_ENTRIES;
use crate::ranking::RankWeights;
use crate::template_matching::{DEFAULT_MAX_SEARCH_PIXELS, DEFAULT_THRESHOLD, default_scales};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Text similarity (0-100) a candidate needs for ordinary targets
    pub normal_threshold: f64,
    /// Text similarity (0-100) a candidate needs for short targets
    pub short_threshold: f64,
    /// Targets up to this many characters (spaces excluded) are short
    pub short_max_len: usize,
    pub weights: RankWeights,
    /// Correlation the best template placement must exceed
    pub template_threshold: f64,
    pub template_scales: Vec<f64>,
    /// Frames above this pixel count are searched coarse-to-fine
    pub max_search_pixels: u64,
    /// Edge-replicated padding for the expanded re-scan
    pub expand_margin: u32,
    pub enable_memory: bool,
    pub enable_template: bool,
    pub enable_expanded: bool,
    /// Application / screen family the templates belong to
    pub context_id: String,
    /// Coordinate memory file; in-memory only when unset
    pub memory_path: Option<PathBuf>,
    /// Success ledger file; in-memory only when unset
    pub ledger_path: Option<PathBuf>,
    pub template_dir: PathBuf,
    pub max_memory_entries: usize,
    /// Annotated ranking frames are written here when set
    pub debug_dir: Option<PathBuf>,
    pub action: ActionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normal_threshold: 75.0,
            short_threshold: 60.0,
            short_max_len: 3,
            weights: RankWeights::default(),
            template_threshold: DEFAULT_THRESHOLD,
            template_scales: default_scales(),
            max_search_pixels: DEFAULT_MAX_SEARCH_PIXELS,
            expand_margin: 40,
            enable_memory: true,
            enable_template: true,
            enable_expanded: true,
            context_id: "default".to_string(),
            memory_path: None,
            ledger_path: None,
            template_dir: PathBuf::from("templates"),
            max_memory_entries: DEFAULT_MAX_ENTRIES,
            debug_dir: None,
            action: ActionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("⚙️ Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return invalid(format!("ranking weights sum to {sum:.4}, expected 1.0"));
        }
        let w = &self.weights;
        if [w.text, w.confidence, w.geometry, w.history]
            .iter()
            .any(|v| *v < 0.0)
        {
            return invalid("ranking weights must not be negative".to_string());
        }
        for (name, value) in [
            ("normal_threshold", self.normal_threshold),
            ("short_threshold", self.short_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("{name} {value} outside 0..=100"));
            }
        }
        if !(0.0..1.0).contains(&self.template_threshold) {
            return invalid(format!(
                "template_threshold {} outside 0..1",
                self.template_threshold
            ));
        }
        if self.template_scales.is_empty() || self.template_scales.iter().any(|s| *s <= 0.0) {
            return invalid("template_scales must be non-empty and positive".to_string());
        }
        if self.max_memory_entries == 0 {
            return invalid("max_memory_entries must be at least 1".to_string());
        }
        if self.context_id.trim().is_empty() {
            return invalid("context_id must not be empty".to_string());
        }
        self.action.validate()
    }
}

/// Timing and thresholds of the act-then-verify loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Pause between the action and the validation capture
    pub settle_delay_ms: u64,
    /// Pause between focusing a field and typing into it
    pub type_delay_ms: u64,
    /// Changed-pixel fraction at or above which an action counts as effective
    pub diff_threshold: f64,
    /// Grayscale delta above which a pixel counts as changed
    pub diff_tolerance: u8,
    pub max_retries: u32,
    /// Backoff before attempt n+1 is `backoff_base_ms * n`
    pub backoff_base_ms: u64,
    pub poll_interval_ms: u64,
    pub wait_timeout_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1200,
            type_delay_ms: 200,
            diff_threshold: 0.01,
            diff_tolerance: crate::frame::DEFAULT_DIFF_TOLERANCE,
            max_retries: 3,
            backoff_base_ms: 500,
            poll_interval_ms: 1000,
            wait_timeout_ms: 10_000,
        }
    }
}

impl ActionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(attempt as u64))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.diff_threshold) {
            return invalid(format!("diff_threshold {} outside 0..=1", self.diff_threshold));
        }
        if self.max_retries == 0 {
            return invalid("max_retries must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be at least 1".to_string());
        }
        Ok(())
    }
}

fn invalid(description: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid { description })
}

/// Preset for fast, stable UIs: no expanded re-scan and a shorter settle delay
pub fn create_fast_config() -> EngineConfig {
    EngineConfig {
        enable_expanded: false,
        action: ActionConfig {
            settle_delay_ms: 600,
            ..ActionConfig::default()
        },
        ..EngineConfig::default()
    }
}

/// Preset for noisy remote sessions: looser text gate, more retries, longer settle
pub fn create_remote_session_config() -> EngineConfig {
    EngineConfig {
        normal_threshold: 70.0,
        short_threshold: 55.0,
        action: ActionConfig {
            settle_delay_ms: 2000,
            max_retries: 4,
            backoff_base_ms: 1000,
            ..ActionConfig::default()
        },
        ..EngineConfig::default()
    }
}
