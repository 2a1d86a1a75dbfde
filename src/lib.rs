pub mod automation;
pub mod error;
pub mod frame;
pub mod match_engine;
pub mod memory;
pub mod ranking;
pub mod region;
pub mod template_matching;
pub mod text;

pub use automation::{Action, ActionReport, ActionValidator};
pub use match_engine::{EngineConfig, MatchEngine, MatchOutcome, MatchResult};
pub use region::{CaptureRegion, ScreenPoint, ScreenScale};
