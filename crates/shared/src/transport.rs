//! Frame pipes between the client and the step service.
//!
//! The two sides never share state: everything crossing the boundary is an
//! encoded [`Envelope`] frame. Sends are fire-and-forget; a send that cannot
//! be queued is dropped and reported as `false`.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{error::ChannelError, protocol::Envelope};

/// Well-known identity clients use to reach the step service.
pub const STEP_SERVICE: &str = "step-service";

pub type Frame = String;

/// Liveness token for one connection. The service holds it weakly, so the
/// connection counts as live exactly as long as the client's [`Outbound`]
/// exists.
#[derive(Debug)]
pub struct ConnectionLease;

/// Client-side capability handle returned by [`ServiceConnector::connect`].
pub struct Connection {
    pub outbound: Outbound,
    pub inbound: mpsc::Receiver<Frame>,
}

/// Service-side half of a connection.
pub struct ServiceEnd {
    pub inbound: mpsc::Receiver<Frame>,
    pub outbound: mpsc::Sender<Frame>,
}

pub struct Outbound {
    tx: mpsc::Sender<Frame>,
    _lease: Arc<ConnectionLease>,
}

impl Outbound {
    pub fn send(&self, envelope: &Envelope) -> bool {
        send_frame(&self.tx, envelope)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Builds both halves of a connection plus the weak lease the service keeps.
pub fn pipe(capacity: usize) -> (Connection, ServiceEnd, Weak<ConnectionLease>) {
    let capacity = capacity.max(1);
    let (to_service_tx, to_service_rx) = mpsc::channel(capacity);
    let (to_client_tx, to_client_rx) = mpsc::channel(capacity);
    let lease = Arc::new(ConnectionLease);
    let weak = Arc::downgrade(&lease);

    let connection = Connection {
        outbound: Outbound {
            tx: to_service_tx,
            _lease: lease,
        },
        inbound: to_client_rx,
    };
    let service_end = ServiceEnd {
        inbound: to_service_rx,
        outbound: to_client_tx,
    };
    (connection, service_end, weak)
}

/// Encodes and queues one frame. Failures are discarded.
pub fn send_frame(tx: &mpsc::Sender<Frame>, envelope: &Envelope) -> bool {
    let frame = match envelope.encode() {
        Ok(frame) => frame,
        Err(err) => {
            debug!(%err, kind = ?envelope.kind(), "dropping unencodable frame");
            return false;
        }
    };
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(err) => {
            debug!(%err, kind = ?envelope.kind(), "dropping frame");
            false
        }
    }
}

#[async_trait]
pub trait ServiceConnector: Send + Sync {
    async fn connect(&self) -> Result<Connection, ChannelError>;
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
