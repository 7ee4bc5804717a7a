use thiserror::Error;
use waddle_xmpp::{IqError, RsmError};

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error(transparent)]
    Request(#[from] IqError),

    #[error("malformed pubsub response: {0}")]
    MalformedResponse(String),

    #[error("invalid result set in pubsub response: {0}")]
    Rsm(#[from] RsmError),
}
