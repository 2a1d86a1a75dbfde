// Action execution with visual confirmation
pub mod collaborators;
pub mod fsm;
pub mod types;


pub use collaborators::{FrameSource, InputInjector, NullRecognizer, TextRecognizer};
pub use fsm::ActionValidator;
pub use types::{Action, ActionKind, ActionOutcome, ActionReport, ActionState, FailureReason};
