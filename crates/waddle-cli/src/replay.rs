use std::sync::Mutex;

use async_trait::async_trait;
use minidom::Element;
use tracing::debug;
use waddle_xmpp::{ns, Iq, IqError, IqRequester};

/// Answers the first request with a recorded response.
///
/// The recording may be a whole `<iq type='result'/>` or just its payload.
/// Any further request sees a closed connection.
pub struct ReplayRequester {
    response: Mutex<Option<Option<Element>>>,
}

impl ReplayRequester {
    pub fn new(recorded: Element) -> Self {
        let response = if recorded.is("iq", ns::CLIENT) {
            recorded.children().next().cloned()
        } else {
            Some(recorded)
        };
        Self {
            response: Mutex::new(Some(response)),
        }
    }
}

#[async_trait]
impl IqRequester for ReplayRequester {
    async fn request(&self, iq: Iq) -> Result<Option<Element>, IqError> {
        debug!(id = %iq.id, "replaying recorded response");
        self.response
            .lock()
            .map_err(|_| IqError::Transport("replay state poisoned".to_string()))?
            .take()
            .ok_or(IqError::Disconnected)
    }
}
