//! Threshold/averaging policy that turns a pair of FSR readings into a
//! single punch force.

use super::frame::SensorFrame;

pub const DEFAULT_MINIMUM_THRESHOLD: i32 = 305;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Force(i64),
    NoEvent,
}

impl Evaluation {
    pub fn force(self) -> Option<i64> {
        match self {
            Evaluation::Force(force) => Some(force),
            Evaluation::NoEvent => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForceEvaluator {
    minimum_threshold: i32,
}

impl Default for ForceEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_THRESHOLD)
    }
}

impl ForceEvaluator {
    pub fn new(minimum_threshold: i32) -> Self {
        Self { minimum_threshold }
    }

    pub fn minimum_threshold(&self) -> i32 {
        self.minimum_threshold
    }

    /// A reading counts only when it is strictly above the threshold.
    pub fn evaluate(&self, frame: SensorFrame) -> Evaluation {
        let first = frame.fsr1 > self.minimum_threshold;
        let second = frame.fsr2 > self.minimum_threshold;

        match (first, second) {
            (true, true) => Evaluation::Force(mean(frame.fsr1, frame.fsr2)),
            (true, false) => Evaluation::Force(i64::from(frame.fsr1)),
            (false, true) => Evaluation::Force(i64::from(frame.fsr2)),
            (false, false) => Evaluation::NoEvent,
        }
    }
}

// Half away from zero, so 600/651 shows and persists as 626 everywhere.
fn mean(a: i32, b: i32) -> i64 {
    ((f64::from(a) + f64::from(b)) / 2.0).round() as i64
}
