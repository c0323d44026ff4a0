use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use shared::{
    protocol::{Envelope, ReplyAddress},
    transport::{Connection, Frame, Outbound, ServiceConnector, STEP_SERVICE},
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::display::{status_text, to_display_value, DisplayState};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Longest accepted poll period; larger requests are clamped to it.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Unanswered reply addresses expire after this many poll periods.
const REPLY_TTL_POLLS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl ClientSettings {
    /// Zero falls back to [`POLL_INTERVAL`]; anything above
    /// [`MAX_POLL_INTERVAL`] is clamped.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        if poll_interval.is_zero() {
            return Self::default();
        }
        Self {
            poll_interval: poll_interval.min(MAX_POLL_INTERVAL),
        }
    }
}

fn reply_ttl(period: Duration) -> Duration {
    period.saturating_mul(REPLY_TTL_POLLS)
}

struct LiveOutbound {
    generation: u64,
    outbound: Outbound,
}

/// Current send handle plus the reply addresses still waiting for an answer.
#[derive(Default)]
struct Link {
    live: RwLock<Option<LiveOutbound>>,
    pending: Mutex<HashMap<ReplyAddress, Instant>>,
    generations: AtomicU64,
}

impl Link {
    fn attach(&self, outbound: Outbound) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut live) = self.live.write() {
            *live = Some(LiveOutbound {
                generation,
                outbound,
            });
        }
        generation
    }

    /// Drops the send handle and forgets every outstanding reply address.
    fn detach(&self) {
        if let Ok(mut live) = self.live.write() {
            *live = None;
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    fn detach_generation(&self, generation: u64) {
        let current = self
            .live
            .read()
            .ok()
            .and_then(|live| live.as_ref().map(|live| live.generation));
        if current == Some(generation) {
            self.detach();
        }
    }

    fn is_connected(&self) -> bool {
        self.live
            .read()
            .map(|live| live.as_ref().is_some_and(|live| !live.outbound.is_closed()))
            .unwrap_or(false)
    }

    /// Fire-and-forget: `false` means the envelope was dropped.
    fn send(&self, envelope: &Envelope) -> bool {
        let Ok(live) = self.live.read() else {
            return false;
        };
        match live.as_ref() {
            Some(live) => live.outbound.send(envelope),
            None => {
                debug!(kind = ?envelope.kind(), "not connected; dropping");
                false
            }
        }
    }

    fn send_poll(&self, reply_ttl: Duration) -> bool {
        if !self.is_connected() {
            debug!("not connected; dropping poll");
            return false;
        }
        let (poll, reply_to) = Envelope::poll();
        let now = Instant::now();
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|_, sent_at| now.duration_since(*sent_at) < reply_ttl);
            pending.insert(reply_to, now);
        }
        let sent = self.send(&poll);
        if !sent {
            self.redeem(reply_to);
        }
        sent
    }

    /// Consumes a reply address. Each address is good for one reply.
    fn redeem(&self, reply_to: ReplyAddress) -> bool {
        self.pending
            .lock()
            .map(|mut pending| pending.remove(&reply_to).is_some())
            .unwrap_or(false)
    }
}

/// Client side of the step service connection.
///
/// Polls the service on a fixed interval, turns each reply into a display
/// value on the UI task, and pushes the rendered value back as a
/// `StatusUpdate`.
pub struct ClientChannel {
    connector: Arc<dyn ServiceConnector>,
    settings: ClientSettings,
    display: Arc<DisplayState>,
    link: Arc<Link>,
    ui_tx: mpsc::UnboundedSender<i64>,
    ui_task: JoinHandle<()>,
    connection_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientChannel {
    /// Must be called from inside a tokio runtime.
    pub fn new(connector: Arc<dyn ServiceConnector>, settings: ClientSettings) -> Arc<Self> {
        let settings = ClientSettings::with_poll_interval(settings.poll_interval);
        let display = Arc::new(DisplayState::default());
        let link = Arc::new(Link::default());

        let status_link = Arc::clone(&link);
        display.subscribe(move |value| {
            status_link.send(&Envelope::StatusUpdate {
                text: status_text(value),
            });
        });

        let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<i64>();
        let ui_display = Arc::clone(&display);
        let ui_task = tokio::spawn(async move {
            while let Some(value) = ui_rx.recv().await {
                ui_display.publish(value);
            }
        });

        Arc::new(Self {
            connector,
            settings,
            display,
            link,
            ui_tx,
            ui_task,
            connection_tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Connects to the step service and starts polling immediately.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        let Connection { outbound, inbound } = self
            .connector
            .connect()
            .await
            .with_context(|| format!("failed to connect to {STEP_SERVICE}"))?;

        self.stop_connection_tasks();
        let generation = self.link.attach(outbound);
        let reader = spawn_reply_reader(
            Arc::clone(&self.link),
            generation,
            inbound,
            self.ui_tx.clone(),
        );
        let poller = spawn_poll_loop(Arc::clone(&self.link), self.settings.poll_interval);
        if let Ok(mut tasks) = self.connection_tasks.lock() {
            tasks.push(reader);
            tasks.push(poller);
        }
        info!(interval = ?self.settings.poll_interval, "connected to step service");
        Ok(())
    }

    /// Stops polling and invalidates outstanding reply addresses. The service
    /// keeps running.
    pub fn disconnect(&self) {
        self.stop_connection_tasks();
        self.link.detach();
        info!("disconnected from step service");
    }

    /// Sends one poll right away. Dropped when not connected.
    pub fn poll_now(&self) -> bool {
        self.link.send_poll(reply_ttl(self.settings.poll_interval))
    }

    /// Re-sends the current display value as a `StatusUpdate`.
    pub fn notify_status(&self) -> bool {
        self.link.send(&Envelope::StatusUpdate {
            text: status_text(self.display.get()),
        })
    }

    fn stop_connection_tasks(&self) {
        if let Ok(mut tasks) = self.connection_tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl Drop for ClientChannel {
    fn drop(&mut self) {
        self.stop_connection_tasks();
        self.ui_task.abort();
    }
}

fn spawn_poll_loop(link: Arc<Link>, period: Duration) -> JoinHandle<()> {
    let reply_ttl = reply_ttl(period);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !link.send_poll(reply_ttl) && !link.is_connected() {
                debug!("connection gone; poll loop stopping");
                break;
            }
        }
    })
}

fn spawn_reply_reader(
    link: Arc<Link>,
    generation: u64,
    mut inbound: mpsc::Receiver<Frame>,
    ui_tx: mpsc::UnboundedSender<i64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = inbound.recv().await {
            match Envelope::decode(&frame) {
                Ok(Envelope::Reply { in_reply_to, count }) => {
                    if !link.redeem(in_reply_to) {
                        debug!(correlation = %in_reply_to, "dropping unmatched reply");
                        continue;
                    }
                    // Display observers do UI work; publish on the UI task.
                    let _ = ui_tx.send(to_display_value(count));
                }
                Ok(other) => debug!(kind = ?other.kind(), "ignoring envelope"),
                Err(err) => debug!(%err, "ignoring malformed frame"),
            }
        }
        info!("step service closed the connection");
        link.detach_generation(generation);
    })
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
