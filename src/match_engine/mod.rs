/// Element resolution pipeline
///
/// Given a target label and the current frame, produce a validated absolute coordinate
/// through the short-circuiting chain memory -> ranked OCR -> template -> expanded
/// re-scan, and feed validated outcomes back into memory, ledger and templates.
pub mod config;
pub mod engine;
pub mod overlay;
pub mod result;

#[cfg(test)]
mod tests;

pub use config::{ActionConfig, EngineConfig, create_fast_config, create_remote_session_config};
pub use engine::MatchEngine;
pub use result::{MatchDiagnostics, MatchOutcome, MatchResult};
