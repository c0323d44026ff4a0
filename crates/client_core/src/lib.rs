//! Display client for the step service.
//!
//! [`ClientChannel`] owns the connection and the poll loop; [`DisplayState`]
//! holds what the user sees.

mod channel;
mod display;

pub use channel::{ClientChannel, ClientSettings, MAX_POLL_INTERVAL, POLL_INTERVAL};
pub use display::{display_label, status_text, to_display_value, DisplayState};
