use std::sync::Arc;

use futures::StreamExt;
use shared::domain::{SensorMode, StepSnapshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    sensor::{select_sensor, SensorEventStream, SensorHub},
    session::StepSession,
    snapshot::{SnapshotCell, SnapshotReader},
};

/// Owns the sensor task that drives a [`StepSession`].
///
/// Must be started from inside a tokio runtime.
pub struct EngineRuntime {
    mode: SensorMode,
    cell: Arc<SnapshotCell>,
    sensor_task: Option<JoinHandle<()>>,
}

impl EngineRuntime {
    pub fn start(hub: &dyn SensorHub) -> Self {
        let cell = Arc::new(SnapshotCell::default());
        let (mode, stream) = select_sensor(hub);
        let sensor_task = stream.map(|stream| spawn_sensor_task(mode, stream, Arc::clone(&cell)));
        Self {
            mode,
            cell,
            sensor_task,
        }
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    pub fn is_supported(&self) -> bool {
        self.mode.is_supported()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader::new(Arc::clone(&self.cell))
    }

    pub fn snapshot(&self) -> StepSnapshot {
        self.cell.load()
    }

    /// Re-probes the sensors and starts a fresh session. Existing readers keep
    /// observing the same cell.
    pub async fn reset(&mut self, hub: &dyn SensorHub) {
        self.stop_sensor_task().await;
        self.cell.store(StepSnapshot::default());

        let (mode, stream) = select_sensor(hub);
        self.mode = mode;
        self.sensor_task =
            stream.map(|stream| spawn_sensor_task(mode, stream, Arc::clone(&self.cell)));
        info!(?mode, "step engine reset");
    }

    pub async fn shutdown(&mut self) {
        self.stop_sensor_task().await;
    }

    async fn stop_sensor_task(&mut self) {
        if let Some(task) = self.sensor_task.take() {
            task.abort();
            // Once joined, the old task can no longer publish into the cell.
            let _ = task.await;
        }
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.sensor_task.take() {
            task.abort();
        }
    }
}

fn spawn_sensor_task(
    mode: SensorMode,
    mut stream: SensorEventStream,
    cell: Arc<SnapshotCell>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut session = StepSession::new(mode);
        while let Some(event) = stream.next().await {
            if session.apply(&event) {
                let snapshot = session.snapshot();
                cell.store(snapshot);
                debug!(count = snapshot.count, "step session updated");
            }
        }
        debug!(?mode, "sensor stream ended");
    })
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
