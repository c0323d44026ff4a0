use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, Weak,
};

use async_trait::async_trait;
use shared::{
    domain::{SensorMode, StepSnapshot},
    error::ChannelError,
    protocol::Envelope,
    transport::{pipe, send_frame, Connection, ConnectionLease, ServiceConnector, ServiceEnd},
};
use step_engine::{EngineRuntime, SensorHub};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{app_state::AppState, config::ServiceSettings, presenter::NotificationPresenter};

#[derive(Default)]
struct ConnectionSlot {
    lease: Weak<ConnectionLease>,
    dispatcher: Option<JoinHandle<()>>,
}

/// Long-lived step service: engine, presenter, and the one client connection.
///
/// Lives independently of any client. Disconnecting never stops it; only
/// [`ServiceHost::shutdown`] does.
pub struct ServiceHost {
    state: AppState,
    engine: tokio::sync::Mutex<EngineRuntime>,
    mode: Mutex<SensorMode>,
    slot: Mutex<ConnectionSlot>,
    pipe_capacity: usize,
    shut_down: AtomicBool,
}

impl ServiceHost {
    /// Starts the engine on `hub` and posts the initial status entry.
    pub fn start(
        hub: &dyn SensorHub,
        presenter: NotificationPresenter,
        settings: &ServiceSettings,
    ) -> Arc<Self> {
        let engine = EngineRuntime::start(hub);
        let mode = engine.mode();
        let presenter = Arc::new(presenter);
        presenter.start();
        info!(?mode, "step service started");

        Arc::new(Self {
            state: AppState {
                steps: engine.reader(),
                presenter,
            },
            engine: tokio::sync::Mutex::new(engine),
            mode: Mutex::new(mode),
            slot: Mutex::new(ConnectionSlot::default()),
            pipe_capacity: settings.pipe_capacity,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn mode(&self) -> SensorMode {
        self.mode.lock().map(|mode| *mode).unwrap_or_default()
    }

    pub fn is_supported(&self) -> bool {
        self.mode().is_supported()
    }

    pub fn snapshot(&self) -> StepSnapshot {
        self.state.steps.snapshot()
    }

    pub fn presenter(&self) -> &NotificationPresenter {
        &self.state.presenter
    }

    pub fn has_live_connection(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.lease.upgrade().is_some())
            .unwrap_or(false)
    }

    /// Hands out the capability for a new connection. At most one is live.
    pub fn accept(&self) -> Result<Connection, ChannelError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let mut slot = self.slot.lock().map_err(|_| ChannelError::Closed)?;
        if slot.lease.upgrade().is_some() {
            return Err(ChannelError::AlreadyConnected);
        }

        let (connection, service_end, lease) = pipe(self.pipe_capacity);
        slot.lease = lease;
        if let Some(previous) = slot.dispatcher.take() {
            previous.abort();
        }
        slot.dispatcher = Some(spawn_dispatcher(self.state.clone(), service_end));
        info!("client connected");
        Ok(connection)
    }

    /// Re-probes sensors and starts a fresh session. Does nothing once the
    /// service has been shut down.
    pub async fn reset_engine(&self, hub: &dyn SensorHub) {
        let mut engine = self.engine.lock().await;
        if self.shut_down.load(Ordering::Acquire) {
            debug!("service stopped; ignoring engine reset");
            return;
        }
        engine.reset(hub).await;
        if let Ok(mut mode) = self.mode.lock() {
            *mode = engine.mode();
        }
    }

    /// Stops sensing, drops the live connection, and hides the status entry.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.engine.lock().await.shutdown().await;
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(dispatcher) = slot.dispatcher.take() {
                dispatcher.abort();
            }
        }
        self.state.presenter.hide();
        info!("step service stopped");
    }
}

#[async_trait]
impl ServiceConnector for ServiceHost {
    async fn connect(&self) -> Result<Connection, ChannelError> {
        self.accept()
    }
}

fn spawn_dispatcher(state: AppState, service_end: ServiceEnd) -> JoinHandle<()> {
    let ServiceEnd {
        mut inbound,
        outbound,
    } = service_end;
    tokio::spawn(async move {
        while let Some(frame) = inbound.recv().await {
            let envelope = match Envelope::decode(&frame) {
                Ok(envelope) => envelope,
                Err(err) => {
                    debug!(%err, "ignoring malformed frame");
                    continue;
                }
            };
            if let Some(reply) = state.handle(envelope) {
                send_frame(&outbound, &reply);
            }
        }
        info!("client disconnected");
    })
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
