use thiserror::Error;
use waddle_xmpp::IqError;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Request(#[from] IqError),

    #[error("malformed roster response: {0}")]
    MalformedResponse(String),

    #[error("invalid roster address {value:?}: {source}")]
    InvalidJid {
        value: String,
        #[source]
        source: jid::Error,
    },

    #[error("invalid roster item: {0}")]
    InvalidItem(String),
}
