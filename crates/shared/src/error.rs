use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no live connection to the step service")]
    NotConnected,
    #[error("the step service already has a live connection")]
    AlreadyConnected,
    #[error("connection closed by peer")]
    Closed,
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),
}
