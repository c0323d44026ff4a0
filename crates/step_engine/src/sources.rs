//! Sensor hubs that do not need real hardware.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use futures::StreamExt;
use shared::domain::SensorKind;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{IntervalStream, UnboundedReceiverStream};

use crate::sensor::{SensorError, SensorEvent, SensorEventStream, SensorHub};

/// Hub whose events are pushed by hand through [`ManualSensorHub::emit`].
#[derive(Default)]
pub struct ManualSensorHub {
    available: Vec<SensorKind>,
    refuse_registration: bool,
    feeds: Mutex<HashMap<SensorKind, mpsc::UnboundedSender<SensorEvent>>>,
}

impl ManualSensorHub {
    pub fn new(available: impl IntoIterator<Item = SensorKind>) -> Self {
        Self {
            available: available.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A device with no step sensors at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn refusing_registration(mut self) -> Self {
        self.refuse_registration = true;
        self
    }

    /// Delivers one reading to the listener registered for `kind`.
    pub fn emit(&self, kind: SensorKind, value: f32) -> bool {
        let Ok(feeds) = self.feeds.lock() else {
            return false;
        };
        feeds
            .get(&kind)
            .is_some_and(|tx| tx.send(SensorEvent::new(value)).is_ok())
    }
}

impl SensorHub for ManualSensorHub {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        self.available.contains(&kind)
    }

    fn register_listener(&self, kind: SensorKind) -> Result<SensorEventStream, SensorError> {
        if !self.has_sensor(kind) {
            return Err(SensorError::Unavailable(kind));
        }
        if self.refuse_registration {
            return Err(SensorError::Registration {
                kind,
                reason: "listener refused".to_string(),
            });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut feeds = self.feeds.lock().map_err(|_| SensorError::Registration {
            kind,
            reason: "feed table poisoned".to_string(),
        })?;
        feeds.insert(kind, tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

/// Hub that simulates a steady walk: one step every `step_interval`.
#[derive(Debug, Clone)]
pub struct SimulatedSensorHub {
    sensor: Option<SensorKind>,
    step_interval: Duration,
    steps_since_boot: u64,
}

impl SimulatedSensorHub {
    pub fn new(sensor: Option<SensorKind>, step_interval: Duration) -> Self {
        Self {
            sensor,
            step_interval: step_interval.max(Duration::from_millis(1)),
            steps_since_boot: 0,
        }
    }

    /// Counter readings start from this many steps already taken since boot.
    pub fn with_steps_since_boot(mut self, steps: u64) -> Self {
        self.steps_since_boot = steps;
        self
    }
}

impl SensorHub for SimulatedSensorHub {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        self.sensor == Some(kind)
    }

    fn register_listener(&self, kind: SensorKind) -> Result<SensorEventStream, SensorError> {
        if !self.has_sensor(kind) {
            return Err(SensorError::Unavailable(kind));
        }
        let baseline = self.steps_since_boot;
        let ticks = IntervalStream::new(tokio::time::interval(self.step_interval));
        let stream = ticks.enumerate().map(move |(taken, _)| match kind {
            SensorKind::StepCounter => SensorEvent::new((baseline + taken as u64) as f32),
            SensorKind::StepDetector => SensorEvent::new(1.0),
        });
        Ok(stream.boxed())
    }
}
