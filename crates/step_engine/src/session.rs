use shared::domain::{SensorMode, StepSnapshot};

use crate::sensor::SensorEvent;

/// Value a step detector reports for one detected step.
const DETECTED_STEP: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSession {
    mode: SensorMode,
    started: bool,
    count: u64,
}

impl StepSession {
    pub fn new(mode: SensorMode) -> Self {
        Self {
            mode,
            started: false,
            count: 0,
        }
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    /// Applies one sensor event and reports whether the snapshot changed.
    pub fn apply(&mut self, event: &SensorEvent) -> bool {
        let before = self.snapshot();
        match self.mode {
            SensorMode::Counter => {
                self.started = true;
                // The counter already reports a running total since boot.
                self.count = floor_count(event.value);
            }
            SensorMode::Detector => {
                self.started = true;
                if event.value == DETECTED_STEP {
                    self.count = self.count.saturating_add(1);
                }
            }
            SensorMode::None => {}
        }
        before != self.snapshot()
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            started: self.started,
            count: self.count,
        }
    }
}

fn floor_count(value: f32) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as u64
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
