//! Step counting engine.
//!
//! Turns raw step-sensor events into a running session count. The session is
//! owned by a single sensor task; everything else sees it through a
//! [`SnapshotReader`], which always observes a complete `(started, count)`
//! pair.

mod runtime;
mod sensor;
mod session;
mod snapshot;
pub mod sources;

pub use runtime::EngineRuntime;
pub use sensor::{
    select_sensor, supports_step_counting, SensorError, SensorEvent, SensorEventStream, SensorHub,
    PROBE_ORDER,
};
pub use session::StepSession;
pub use snapshot::{SnapshotCell, SnapshotReader};
