use std::sync::RwLock;

use shared::domain::NOT_STARTED;
use tokio::sync::watch;

type Subscriber = Box<dyn Fn(i64) + Send + Sync>;

/// Observable display value owned by the client.
///
/// Publishing replaces the value and then runs every registered subscriber
/// synchronously. Subscribers may send messages out, but nothing they do
/// publishes back into this value.
pub struct DisplayState {
    value: watch::Sender<i64>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl DisplayState {
    pub fn new(initial: i64) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn get(&self) -> i64 {
        *self.value.borrow()
    }

    /// Receiver for renderers that want to await changes.
    pub fn watch(&self) -> watch::Receiver<i64> {
        self.value.subscribe()
    }

    pub fn subscribe(&self, subscriber: impl Fn(i64) + Send + Sync + 'static) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push(Box::new(subscriber));
        }
    }

    pub fn publish(&self, value: i64) {
        self.value.send_replace(value);
        if let Ok(subscribers) = self.subscribers.read() {
            for subscriber in subscribers.iter() {
                subscriber(value);
            }
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Maps a `Reply` count to the displayed value: real counts are shown plus
/// one, the not-started sentinel passes through unchanged.
pub fn to_display_value(count: i64) -> i64 {
    if count == NOT_STARTED {
        NOT_STARTED
    } else {
        count.saturating_add(1)
    }
}

/// Text carried by the `StatusUpdate` for a display value.
pub fn status_text(value: i64) -> String {
    value.to_string()
}

/// On-screen label for a display value.
pub fn display_label(value: i64) -> String {
    format!("Step is: {value}")
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
