/// Template matching module for visual fallback when text matching fails
///
/// This module provides:
/// - Zero-mean normalized cross-correlation over a scale sweep
/// - Coarse-to-fine search on large frames
/// - A per-context asset store that never overwrites automatically
pub mod matcher;
pub mod store;
pub mod types;


pub use matcher::{
    DEFAULT_MAX_SEARCH_PIXELS, DEFAULT_THRESHOLD, MIN_TEMPLATE_SIZE, TemplateMatcher,
    best_position, default_scales,
};
pub use store::TemplateStore;
pub use types::{ScaleMatch, TemplateHit};
