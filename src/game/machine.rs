use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;
use thiserror::Error;

use super::animator::{AnimationFrame, ScoreAnimator};
use super::state::{Phase, PunchEvent, PunchResult, SessionState, MAX_USERNAME_CHARS};
use super::verdict::{self, DEFAULT_PRAISE_THRESHOLD};

pub const DEFAULT_QUALIFYING_FORCE: i64 = 650;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchRules {
    pub qualifying_force: i64,
    pub debounce: Duration,
    pub result_timeout: Duration,
    pub praise_threshold: i64,
}

impl Default for PunchRules {
    fn default() -> Self {
        Self {
            qualifying_force: DEFAULT_QUALIFYING_FORCE,
            debounce: DEFAULT_DEBOUNCE,
            result_timeout: DEFAULT_RESULT_TIMEOUT,
            praise_threshold: DEFAULT_PRAISE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,
    #[error("username is longer than 20 characters")]
    TooLong,
    #[error("username contains non-printable characters")]
    NotPrintable,
    #[error("not waiting for a username (phase: {})", .0.as_str())]
    WrongPhase(Phase),
}

/// Trimmed, non-empty, at most `MAX_USERNAME_CHARS` printable characters.
pub fn validate_username(raw: &str) -> Result<String, UsernameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(UsernameError::Empty);
    }
    if name.chars().any(char::is_control) {
        return Err(UsernameError::NotPrintable);
    }
    if name.chars().count() > MAX_USERNAME_CHARS {
        return Err(UsernameError::TooLong);
    }
    Ok(name.to_string())
}

/// The single store write owed for an accepted punch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreWrite {
    pub username: String,
    pub score: i64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BelowQualifyingForce,
    NotListening(Phase),
    Debounced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunchOutcome {
    Accepted(ScoreWrite),
    Ignored(IgnoreReason),
}

/// Name entry -> listening -> animating -> result -> name entry.
///
/// Time is always passed in, never read, so the whole session can be
/// replayed deterministically in tests.
#[derive(Debug, Clone)]
pub struct PunchStateMachine {
    state: SessionState,
    rules: PunchRules,
    animator: ScoreAnimator,
    last_accepted_at: Option<Instant>,
}

impl PunchStateMachine {
    pub fn new(rules: PunchRules, animator: ScoreAnimator, now: Instant) -> Self {
        Self {
            state: SessionState::new(now),
            rules,
            animator,
            last_accepted_at: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn rules(&self) -> &PunchRules {
        &self.rules
    }

    pub fn type_char(&mut self, c: char) -> bool {
        if self.state.phase != Phase::UsernameInput || c.is_control() {
            return false;
        }
        if self.state.username.chars().count() >= MAX_USERNAME_CHARS {
            return false;
        }
        self.state.username.push(c);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.state.phase != Phase::UsernameInput {
            return false;
        }
        self.state.username.pop().is_some()
    }

    /// Replaces the draft with a whole typed line, then confirms it. Unlike
    /// `type_char`, nothing is cut at the length limit.
    pub fn submit_username(&mut self, raw: &str, now: Instant) -> Result<&str, UsernameError> {
        if self.state.phase != Phase::UsernameInput {
            return Err(UsernameError::WrongPhase(self.state.phase));
        }
        self.state.username = raw.to_string();
        self.confirm_username(now)
    }

    pub fn confirm_username(&mut self, now: Instant) -> Result<&str, UsernameError> {
        if self.state.phase != Phase::UsernameInput {
            return Err(UsernameError::WrongPhase(self.state.phase));
        }
        let name = validate_username(&self.state.username)?;
        info!("Player '{name}' is up");
        self.state.username = name;
        self.state.enter(Phase::Listening, now);
        Ok(&self.state.username)
    }

    /// Checks force, phase and debounce in one step and, on success, moves to
    /// `Animating`. `best_before` is the overall best known before this punch.
    pub fn on_punch<R: Rng + ?Sized>(
        &mut self,
        event: PunchEvent,
        best_before: i64,
        rng: &mut R,
    ) -> PunchOutcome {
        if event.force < self.rules.qualifying_force {
            return PunchOutcome::Ignored(IgnoreReason::BelowQualifyingForce);
        }
        if self.state.phase != Phase::Listening {
            debug!(
                "Ignoring punch of {} while {}",
                event.force,
                self.state.phase.as_str()
            );
            return PunchOutcome::Ignored(IgnoreReason::NotListening(self.state.phase));
        }
        if let Some(last) = self.last_accepted_at {
            if event.at.saturating_duration_since(last) < self.rules.debounce {
                debug!("Dropping punch of {} inside debounce window", event.force);
                return PunchOutcome::Ignored(IgnoreReason::Debounced);
            }
        }

        self.last_accepted_at = Some(event.at);

        let username = self.state.username.clone();
        self.state.last_result = Some(PunchResult {
            username: username.clone(),
            score: event.force,
            verdict: verdict::judge(event.force, self.rules.praise_threshold, rng),
            new_high_score: event.force > best_before,
        });
        self.state.animation = Some(self.animator.start(event.force, event.at));
        self.state.enter(Phase::Animating, event.at);

        info!("Accepted punch of {} for '{}'", event.force, username);
        PunchOutcome::Accepted(ScoreWrite {
            username,
            score: event.force,
            recorded_at: event.timestamp,
        })
    }

    /// Advances time-driven transitions. Returns the phase entered, if any.
    pub fn tick(&mut self, now: Instant) -> Option<Phase> {
        match self.state.phase {
            Phase::Animating => {
                let finished = self
                    .state
                    .animation
                    .map_or(true, |animation| animation.is_done(now));
                if !finished {
                    return None;
                }
                self.state.animation = None;
                self.state.enter(Phase::ResultDisplay, now);
                Some(Phase::ResultDisplay)
            }
            Phase::ResultDisplay => {
                if self.state.time_in_phase(now) < self.rules.result_timeout {
                    return None;
                }
                debug!("Result screen timed out");
                self.state.clear(now);
                Some(Phase::UsernameInput)
            }
            Phase::UsernameInput | Phase::Listening => None,
        }
    }

    pub fn continue_from_result(&mut self, now: Instant) -> bool {
        if self.state.phase != Phase::ResultDisplay {
            return false;
        }
        self.state.clear(now);
        true
    }

    /// Always allowed. Drops the player and any in-flight animation; the
    /// score write for an accepted punch has already been handed off.
    pub fn reset(&mut self, now: Instant) {
        if self.state.animation.is_some() {
            debug!("Reset cancelled an in-flight animation");
        }
        self.state.clear(now);
    }

    pub fn animation_frame(&self, now: Instant) -> Option<AnimationFrame> {
        self.state.animation.map(|animation| animation.poll(now))
    }
}
