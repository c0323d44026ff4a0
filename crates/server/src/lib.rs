//! Step counting service: owns the engine and the persistent status entry,
//! and answers one client over a frame connection.

mod app_state;
pub mod config;
pub mod presenter;
mod service;

pub use config::{load_settings, ServiceSettings};
pub use presenter::{
    ClientPresence, NotificationPresenter, PresenceFlag, StatusEntry, StatusSurface, SurfaceError,
    TapAction, TracingSurface,
};
pub use service::ServiceHost;
