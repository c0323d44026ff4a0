//! Persistent status surface for the step service.
//!
//! One status entry, one stable id. Every render re-posts the same id so the
//! host replaces the entry in place.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServiceSettings;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("persistent status capability denied")]
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    /// The client is already in front; tapping does nothing.
    Noop,
    /// Launch the client fresh, dropping any existing navigation stack.
    Relaunch { clear_stack: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: u32,
    pub channel_id: String,
    pub channel_name: String,
    pub title: String,
    pub body: String,
    pub tap_action: TapAction,
    pub posted_at: DateTime<Utc>,
}

/// Host capability that shows the persistent status entry.
pub trait StatusSurface: Send + Sync {
    fn post(&self, entry: &StatusEntry) -> Result<(), SurfaceError>;
    fn cancel(&self, id: u32) -> Result<(), SurfaceError>;
}

/// Answers whether the display client is currently in the foreground.
pub trait ClientPresence: Send + Sync {
    fn is_foreground(&self) -> bool;
}

/// Shared flag the client side flips when it comes to the front.
#[derive(Debug, Default)]
pub struct PresenceFlag(AtomicBool);

impl PresenceFlag {
    pub fn set_foreground(&self, foreground: bool) {
        self.0.store(foreground, Ordering::Relaxed);
    }
}

impl ClientPresence for PresenceFlag {
    fn is_foreground(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Writes the status entry to the log.
#[derive(Debug, Default)]
pub struct TracingSurface;

impl StatusSurface for TracingSurface {
    fn post(&self, entry: &StatusEntry) -> Result<(), SurfaceError> {
        info!(
            id = entry.id,
            channel = %entry.channel_name,
            title = %entry.title,
            body = %entry.body,
            tap = ?entry.tap_action,
            "status entry posted"
        );
        Ok(())
    }

    fn cancel(&self, id: u32) -> Result<(), SurfaceError> {
        info!(id, "status entry removed");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NotificationState {
    title: String,
    available: bool,
    visible: bool,
}

pub struct NotificationPresenter {
    id: u32,
    channel_id: String,
    channel_name: String,
    title_prefix: String,
    body: String,
    surface: Arc<dyn StatusSurface>,
    presence: Arc<dyn ClientPresence>,
    state: Mutex<NotificationState>,
}

impl NotificationPresenter {
    pub fn new(
        settings: &ServiceSettings,
        surface: Arc<dyn StatusSurface>,
        presence: Arc<dyn ClientPresence>,
    ) -> Self {
        Self {
            id: settings.notification_id,
            channel_id: settings.channel_id.clone(),
            channel_name: settings.channel_name.clone(),
            title_prefix: settings.title_prefix.clone(),
            body: settings.body.clone(),
            surface,
            presence,
            state: Mutex::new(NotificationState {
                title: settings.initial_title.clone(),
                available: true,
                visible: false,
            }),
        }
    }

    /// Posts the initial entry. A denied surface leaves the presenter in a
    /// degraded mode where renders only update the in-memory title.
    pub fn start(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let entry = self.entry(&state.title);
        match self.surface.post(&entry) {
            Ok(()) => {
                state.available = true;
                state.visible = true;
            }
            Err(err) => {
                warn!(%err, "status surface unavailable; continuing without it");
                state.available = false;
            }
        }
    }

    /// Replaces the title in place and re-posts the same entry.
    pub fn render(&self, text: &str) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.title = format!("{}{}", self.title_prefix, text);
        if !state.available {
            return;
        }
        let entry = self.entry(&state.title);
        match self.surface.post(&entry) {
            Ok(()) => state.visible = true,
            Err(err) => debug!(%err, "status render dropped"),
        }
    }

    /// Removes the entry. Only the owning shutdown path calls this.
    pub fn hide(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !state.visible {
            return;
        }
        if let Err(err) = self.surface.cancel(self.id) {
            debug!(%err, "status cancel failed");
        }
        state.visible = false;
    }

    pub fn title(&self) -> String {
        self.state
            .lock()
            .map(|state| state.title.clone())
            .unwrap_or_default()
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().map(|state| state.available).unwrap_or(false)
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().map(|state| state.visible).unwrap_or(false)
    }

    pub fn tap_action(&self) -> TapAction {
        if self.presence.is_foreground() {
            TapAction::Noop
        } else {
            TapAction::Relaunch { clear_stack: true }
        }
    }

    fn entry(&self, title: &str) -> StatusEntry {
        StatusEntry {
            id: self.id,
            channel_id: self.channel_id.clone(),
            channel_name: self.channel_name.clone(),
            title: title.to_string(),
            body: self.body.clone(),
            tap_action: self.tap_action(),
            posted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
