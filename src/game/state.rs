use chrono::{DateTime, Utc};
use std::time::Instant;

use super::animator::AnimationState;
use super::verdict::Verdict;

pub const MAX_USERNAME_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    UsernameInput,
    Listening,
    Animating,
    ResultDisplay,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::UsernameInput => "username-input",
            Phase::Listening => "listening",
            Phase::Animating => "animating",
            Phase::ResultDisplay => "result-display",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchSource {
    Sensor,
    Manual,
}

/// One punch strong enough to be worth offering to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunchEvent {
    pub force: i64,
    pub source: PunchSource,
    /// Monotonic arrival time; debounce windows are measured on this clock.
    pub at: Instant,
    pub timestamp: DateTime<Utc>,
}

impl PunchEvent {
    pub fn new(force: i64, source: PunchSource) -> Self {
        Self {
            force,
            source,
            at: Instant::now(),
            timestamp: Utc::now(),
        }
    }

    pub fn at(force: i64, source: PunchSource, at: Instant) -> Self {
        Self {
            force,
            source,
            at,
            timestamp: Utc::now(),
        }
    }
}

/// What the result screen shows for the last accepted punch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchResult {
    pub username: String,
    pub score: i64,
    pub verdict: Verdict,
    pub new_high_score: bool,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    /// While in `UsernameInput` this is the draft being typed.
    pub username: String,
    pub animation: Option<AnimationState>,
    pub phase_entered_at: Instant,
    pub last_result: Option<PunchResult>,
}

impl SessionState {
    pub fn new(now: Instant) -> Self {
        Self {
            phase: Phase::UsernameInput,
            username: String::new(),
            animation: None,
            phase_entered_at: now,
            last_result: None,
        }
    }

    pub fn enter(&mut self, phase: Phase, now: Instant) {
        self.phase = phase;
        self.phase_entered_at = now;
    }

    pub fn time_in_phase(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.phase_entered_at)
    }

    /// Back to a blank name prompt; nothing from the previous player survives.
    pub fn clear(&mut self, now: Instant) {
        *self = Self::new(now);
    }
}
