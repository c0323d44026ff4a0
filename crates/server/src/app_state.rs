use std::sync::Arc;

use shared::protocol::Envelope;
use step_engine::SnapshotReader;
use tracing::debug;

use crate::presenter::NotificationPresenter;

/// What every connection dispatcher shares: a read-only view of the step
/// session and the presenter.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) steps: SnapshotReader,
    pub(crate) presenter: Arc<NotificationPresenter>,
}

impl AppState {
    /// Handles one inbound envelope and returns the reply to send, if any.
    pub(crate) fn handle(&self, envelope: Envelope) -> Option<Envelope> {
        match envelope {
            Envelope::Poll { reply_to } => {
                let count = self.steps.reply_value();
                debug!(correlation = %reply_to, count, "answering poll");
                Some(Envelope::Reply {
                    in_reply_to: reply_to,
                    count,
                })
            }
            Envelope::StatusUpdate { text } => {
                self.presenter.render(&text);
                None
            }
            other => {
                debug!(kind = ?other.kind(), "ignoring envelope");
                None
            }
        }
    }
}
