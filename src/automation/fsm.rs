// Finite state machine that acts on a resolved target and verifies the screen reacted
use super::collaborators::{FrameSource, InputInjector};
use super::types::{Action, ActionKind, ActionOutcome, ActionReport, ActionState, FailureReason};
use crate::error::{ActionError, WaitError};
use crate::frame::pixel_diff_ratio;
use crate::match_engine::{ActionConfig, MatchEngine, MatchResult};
use crate::region::ScreenScale;
use image::RgbImage;
use std::time::Duration;
use tokio::time::{Instant, sleep};

pub struct ActionValidator<F, I> {
    engine: MatchEngine,
    frames: F,
    injector: I,
    config: ActionConfig,
    scale: ScreenScale,
    state: ActionState,
    trace: Vec<ActionState>,
}

impl<F, I> ActionValidator<F, I>
where
    F: FrameSource,
    I: InputInjector,
{
    pub fn new(engine: MatchEngine, frames: F, injector: I, scale: ScreenScale) -> Self {
        let config = engine.config().action.clone();
        Self {
            engine,
            frames,
            injector,
            config,
            scale,
            state: ActionState::Idle,
            trace: Vec::new(),
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MatchEngine {
        &mut self.engine
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    fn change_state(&mut self, new_state: ActionState) {
        if self.state != new_state {
            log::debug!("🎬 Action state: {:?} -> {:?}", self.state, new_state);
        }
        self.state = new_state;
        self.trace.push(new_state);
    }

    /// Resolve, act, and confirm the screen changed, retrying with backoff.
    ///
    /// Injection and capture errors abort at once; everything else ends in a report.
    pub async fn execute(&mut self, action: &Action) -> Result<ActionReport, ActionError> {
        self.state = ActionState::Idle;
        self.trace.clear();
        let region = *self.engine.region();
        let max_attempts = self.config.max_retries.max(1);
        log::info!("▶️ {:?} '{}'", action.kind, action.target);

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.change_state(ActionState::Resolving);
            let before = self.frames.capture(&region).await?;
            let result = self.engine.resolve(&action.target, &before);
            let Some(point) = result.point() else {
                self.change_state(ActionState::Failed);
                log::warn!("❌ '{}' could not be resolved", action.target);
                return Ok(self.report(
                    action,
                    ActionOutcome::Failed(FailureReason::Unresolved),
                    attempt,
                    None,
                    Some(result),
                ));
            };

            self.change_state(ActionState::Acting);
            let logical = self.scale.to_logical(point);
            log::debug!(
                "Clicking ({}, {}) [native ({}, {})] via {}",
                logical.x,
                logical.y,
                point.x,
                point.y,
                result.method()
            );
            self.injector.click(logical.x, logical.y).await?;
            if let ActionKind::Type(value) = &action.kind {
                sleep(self.config.type_delay()).await;
                self.injector.type_text(value).await?;
            }

            self.change_state(ActionState::Validating);
            sleep(self.config.settle_delay()).await;
            let after = self.frames.capture(&region).await?;
            let ratio = pixel_diff_ratio(&before, &after, self.config.diff_tolerance);
            log::debug!(
                "Attempt {}/{}: {:.2}% of pixels changed",
                attempt,
                max_attempts,
                ratio * 100.0
            );

            if ratio >= self.config.diff_threshold {
                self.engine.record_success(&action.target, &result, &before);
                self.change_state(ActionState::Success);
                log::info!("✅ '{}' confirmed after {} attempt(s)", action.target, attempt);
                return Ok(self.report(action, ActionOutcome::Success, attempt, Some(ratio), Some(result)));
            }

            self.engine.record_failure(&action.target, &result);
            if attempt >= max_attempts {
                self.change_state(ActionState::Failed);
                log::warn!(
                    "❌ '{}' had no visible effect after {} attempts",
                    action.target,
                    attempt
                );
                let reason = FailureReason::NoVisibleEffect {
                    attempts: attempt,
                    last_ratio: ratio,
                };
                return Ok(self.report(
                    action,
                    ActionOutcome::Failed(reason),
                    attempt,
                    Some(ratio),
                    Some(result),
                ));
            }

            self.change_state(ActionState::Retrying);
            let backoff = self.config.backoff(attempt);
            log::info!("🔁 No change for '{}', retrying in {:?}", action.target, backoff);
            sleep(backoff).await;
        }
    }

    fn report(
        &self,
        action: &Action,
        outcome: ActionOutcome,
        attempts: u32,
        last_ratio: Option<f64>,
        result: Option<MatchResult>,
    ) -> ActionReport {
        ActionReport {
            action: action.clone(),
            outcome,
            attempts,
            last_ratio,
            trace: self.trace.clone(),
            result,
        }
    }

    /// [`Self::wait_until_visible`] bounded by the configured `wait_timeout_ms`
    pub async fn wait_for(&mut self, target: &str) -> Result<MatchResult, WaitError> {
        let timeout = self.config.wait_timeout();
        self.wait_until_visible(target, timeout).await
    }

    /// Poll until `target` is visible, independent of the retry machine
    pub async fn wait_until_visible(
        &mut self,
        target: &str,
        timeout: Duration,
    ) -> Result<MatchResult, WaitError> {
        let region = *self.engine.region();
        let deadline = Instant::now() + timeout;
        let mut polls = 0;

        loop {
            polls += 1;
            let frame: RgbImage = self.frames.capture(&region).await?;
            let result = self.engine.locate_fresh(target, &frame);
            if result.found() {
                log::info!("👀 '{}' visible after {} poll(s)", target, polls);
                return Ok(result);
            }

            let now = Instant::now();
            if now >= deadline {
                log::warn!("⏱️ '{}' not visible within {:?}", target, timeout);
                return Err(WaitError::Timeout {
                    target: target.to_string(),
                    timeout,
                    polls,
                });
            }
            log::debug!("'{}' not yet visible, polling", target);
            sleep(self.config.poll_interval().min(deadline - now)).await;
        }
    }
}
