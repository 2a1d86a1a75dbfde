// Types and enums for the act-then-verify loop
use crate::match_engine::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Resolving,
    Acting,
    Validating,
    Retrying,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Click,
    Type(String), // click the field, then type this value
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub target: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn click(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: ActionKind::Click,
        }
    }

    pub fn type_into(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: ActionKind::Type(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The resolution chain found nothing to act on
    Unresolved,
    /// Every attempt left the screen unchanged
    NoVisibleEffect { attempts: u32, last_ratio: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Success,
    Failed(FailureReason),
}

#[derive(Debug, Clone)]
pub struct ActionReport {
    pub action: Action,
    pub outcome: ActionOutcome,
    pub attempts: u32,
    /// Changed-pixel fraction measured after the last attempt
    pub last_ratio: Option<f64>,
    /// Every state entered, in order
    pub trace: Vec<ActionState>,
    /// Resolution used by the last attempt
    pub result: Option<MatchResult>,
}

impl ActionReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == ActionOutcome::Success
    }
}
