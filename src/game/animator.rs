//! Score reveal: a quadratic ease-out count-up followed by a short run of
//! alternating flashes. Everything here is a pure function of `Instant`s, so
//! the render loop can poll it once per tick without ever blocking.

use std::time::{Duration, Instant};


pub const DEFAULT_DURATION: Duration = Duration::from_millis(2500);
pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(250);
pub const DEFAULT_FLASH_COUNT: u32 = 3;

/// `round(target * (1 - (1 - t/duration)^2))`, clamped to `target` once
/// `elapsed >= duration`.
pub fn eased_score(target: i64, elapsed: Duration, duration: Duration) -> i64 {
    if duration.is_zero() || elapsed >= duration {
        return target;
    }
    let remaining = 1.0 - elapsed.as_secs_f64() / duration.as_secs_f64();
    let eased = 1.0 - remaining * remaining;
    (target as f64 * eased).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashColor {
    Gold,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationFrame {
    Counting { value: i64, progress: f64 },
    Flash { value: i64, index: u32, color: FlashColor },
    Done { value: i64 },
}

impl AnimationFrame {
    pub fn value(&self) -> i64 {
        match *self {
            AnimationFrame::Counting { value, .. }
            | AnimationFrame::Flash { value, .. }
            | AnimationFrame::Done { value } => value,
        }
    }
}

/// Timing shared by every reveal; `start` stamps out a fresh `AnimationState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreAnimator {
    pub duration: Duration,
    pub flash_duration: Duration,
    pub flash_count: u32,
}

impl Default for ScoreAnimator {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            flash_duration: DEFAULT_FLASH_DURATION,
            flash_count: DEFAULT_FLASH_COUNT,
        }
    }
}

impl ScoreAnimator {
    pub fn new(duration: Duration, flash_duration: Duration, flash_count: u32) -> Self {
        Self {
            duration,
            flash_duration,
            flash_count,
        }
    }

    pub fn start(&self, target_score: i64, now: Instant) -> AnimationState {
        AnimationState {
            target_score,
            started_at: now,
            duration: self.duration,
            flash_duration: self.flash_duration,
            flash_count: self.flash_count,
        }
    }

    /// Count-up plus the whole flash sequence.
    pub fn total(&self) -> Duration {
        self.duration + self.flash_duration * self.flash_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub target_score: i64,
    pub started_at: Instant,
    pub duration: Duration,
    pub flash_duration: Duration,
    pub flash_count: u32,
}

impl AnimationState {
    pub fn poll(&self, now: Instant) -> AnimationFrame {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed < self.duration {
            return AnimationFrame::Counting {
                value: eased_score(self.target_score, elapsed, self.duration),
                progress: elapsed.as_secs_f64() / self.duration.as_secs_f64(),
            };
        }

        if self.flash_duration.is_zero() {
            return AnimationFrame::Done {
                value: self.target_score,
            };
        }

        let into_flash = elapsed - self.duration;
        let index = into_flash.as_nanos() / self.flash_duration.as_nanos();
        if index < u128::from(self.flash_count) {
            let index = index as u32;
            AnimationFrame::Flash {
                value: self.target_score,
                index,
                color: if index % 2 == 0 {
                    FlashColor::Gold
                } else {
                    FlashColor::White
                },
            }
        } else {
            AnimationFrame::Done {
                value: self.target_score,
            }
        }
    }

    pub fn displayed(&self, now: Instant) -> i64 {
        self.poll(now).value()
    }

    pub fn is_done(&self, now: Instant) -> bool {
        matches!(self.poll(now), AnimationFrame::Done { .. })
    }
}
