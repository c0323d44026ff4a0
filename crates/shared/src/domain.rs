use serde::{Deserialize, Serialize};

/// Value reported to clients while no sensor event has arrived yet.
pub const NOT_STARTED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Cumulative steps since the last device boot.
    StepCounter,
    /// One event per detected step.
    StepDetector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    #[default]
    None,
    Counter,
    Detector,
}

impl SensorMode {
    pub fn is_supported(self) -> bool {
        self != SensorMode::None
    }
}

impl From<SensorKind> for SensorMode {
    fn from(value: SensorKind) -> Self {
        match value {
            SensorKind::StepCounter => SensorMode::Counter,
            SensorKind::StepDetector => SensorMode::Detector,
        }
    }
}

/// Read-side view of a step session. Travels by value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub started: bool,
    pub count: u64,
}

impl StepSnapshot {
    /// Count as carried by a `Reply`: `-1` until the first sensor event.
    pub fn reply_value(self) -> i64 {
        if self.started {
            i64::try_from(self.count).unwrap_or(i64::MAX)
        } else {
            NOT_STARTED
        }
    }
}
