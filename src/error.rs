use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for coordinate memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// A specialized `Result` type for template asset operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while loading or persisting the coordinate memory and success ledger.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Failed to read memory file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write memory file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Memory file {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize memory: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

/// Errors raised by the template asset store.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template asset {path:?} is unreadable: {source}")]
    AssetCorrupt {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Template asset {path:?} has no pixels")]
    EmptyAsset { path: PathBuf },

    #[error("Failed to create template directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to save template {path:?}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to remove template {path:?}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Crop box [{x1},{y1},{x2},{y2}] does not overlap the {width}x{height} frame")]
    CropOutOfFrame {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        width: u32,
        height: u32,
    },
}

/// Raised by the input-injection collaborator. Always fatal: the pointer may no longer be
/// under our control, so the action is aborted without retry.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("Fail-safe triggered: pointer reached reserved corner at ({x}, {y})")]
    FailSafe { x: i32, y: i32 },

    #[error("Input backend failed: {description}")]
    Backend { description: String },
}

/// Raised by the frame capture collaborator.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Screen capture failed: {description}")]
    Failed { description: String },
}

/// Fatal conditions that end an action immediately.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Input injection aborted the action: {source}")]
    Injection {
        #[from]
        source: InjectionError,
    },

    #[error("Frame capture aborted the action: {source}")]
    Capture {
        #[from]
        source: CaptureError,
    },
}

/// Errors from the wait-until-visible polling loop.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("'{target}' did not become visible within {timeout:?} ({polls} polls)")]
    Timeout {
        target: String,
        timeout: std::time::Duration,
        polls: u32,
    },

    #[error("Frame capture failed while waiting: {source}")]
    Capture {
        #[from]
        source: CaptureError,
    },
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {description}")]
    Invalid { description: String },
}

impl ActionError {
    /// Check if this error came from the fail-safe corner rather than a backend fault
    pub fn is_fail_safe(&self) -> bool {
        matches!(
            self,
            ActionError::Injection {
                source: InjectionError::FailSafe { .. }
            }
        )
    }
}
