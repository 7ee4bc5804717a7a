use thiserror::Error;
use xmpp_parsers::stanza_error::StanzaError;

/// Failure reported by the request correlator for one outbound IQ.
#[derive(Debug, Error)]
pub enum IqError {
    #[error("remote entity returned a stanza error: {0:?}")]
    Stanza(Box<StanzaError>),

    #[error("no response before the request timed out")]
    Timeout,

    #[error("connection closed before a response arrived")]
    Disconnected,

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<StanzaError> for IqError {
    fn from(error: StanzaError) -> Self {
        IqError::Stanza(Box::new(error))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stanza parse failed: {0}")]
    ParseFailed(String),

    #[error("stanza serialization failed: {0}")]
    SerializeFailed(String),
}
