use futures::stream::BoxStream;
use shared::domain::{SensorKind, SensorMode};
use thiserror::Error;
use tracing::{info, warn};

/// Preferred sensor first: an absolute counter beats a per-step detector.
pub const PROBE_ORDER: [SensorKind; 2] = [SensorKind::StepCounter, SensorKind::StepDetector];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub value: f32,
}

impl SensorEvent {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

pub type SensorEventStream = BoxStream<'static, SensorEvent>;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor {0:?} is not present on this device")]
    Unavailable(SensorKind),
    #[error("failed to register listener for {kind:?}: {reason}")]
    Registration { kind: SensorKind, reason: String },
}

/// Host access to motion sensors.
pub trait SensorHub: Send + Sync {
    fn has_sensor(&self, kind: SensorKind) -> bool;
    fn register_listener(&self, kind: SensorKind) -> Result<SensorEventStream, SensorError>;
}

pub fn supports_step_counting(hub: &dyn SensorHub) -> bool {
    PROBE_ORDER.iter().any(|kind| hub.has_sensor(*kind))
}

/// Picks the first available sensor in [`PROBE_ORDER`] and registers for it.
///
/// Returns `SensorMode::None` without a stream when no sensor exists or the
/// registration is refused; the refusal is logged and otherwise swallowed.
pub fn select_sensor(hub: &dyn SensorHub) -> (SensorMode, Option<SensorEventStream>) {
    let Some(kind) = PROBE_ORDER.into_iter().find(|kind| hub.has_sensor(*kind)) else {
        warn!("device unsupported: no step counter or step detector present");
        return (SensorMode::None, None);
    };

    match hub.register_listener(kind) {
        Ok(stream) => {
            let mode = SensorMode::from(kind);
            info!(?mode, "step sensor registered");
            (mode, Some(stream))
        }
        Err(err) => {
            warn!(%err, "device unsupported: step sensor registration failed");
            (SensorMode::None, None)
        }
    }
}
