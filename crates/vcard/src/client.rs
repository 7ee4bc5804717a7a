use std::sync::Arc;

use jid::Jid;
use minidom::Element;
use thiserror::Error;
use tracing::{debug, instrument};
use waddle_core::config::MixedContentPolicy;
use waddle_xmpp::{iq_get, iq_set, ns, IqError, IqRequester};

use crate::codec::VCardTree;

#[derive(Debug, Error)]
pub enum VCardError {
    #[error(transparent)]
    Request(#[from] IqError),

    #[error("malformed vCard response: {0}")]
    MalformedResponse(String),
}

pub struct VCardClient {
    requester: Arc<dyn IqRequester>,
    mixed_content: MixedContentPolicy,
}

impl VCardClient {
    pub fn new(requester: Arc<dyn IqRequester>) -> Self {
        Self {
            requester,
            mixed_content: MixedContentPolicy::default(),
        }
    }

    pub fn with_mixed_content(mut self, policy: MixedContentPolicy) -> Self {
        self.mixed_content = policy;
        self
    }

    /// Fetch the vCard of `jid`, or of the account itself when `None`.
    ///
    /// An empty result means the entity has no vCard and yields `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn get(&self, jid: Option<&Jid>) -> Result<Option<VCardTree>, VCardError> {
        let request = iq_get(jid.cloned(), Element::builder("vCard", ns::VCARD).build());

        let Some(response) = self.requester.request(request).await? else {
            debug!("empty vCard result");
            return Ok(None);
        };
        if !response.is("vCard", ns::VCARD) {
            return Err(VCardError::MalformedResponse(format!(
                "expected <vCard xmlns='{}'/>, got <{}/>",
                ns::VCARD,
                response.name()
            )));
        }

        let tree = VCardTree::from_element(&response, self.mixed_content);
        debug!(fields = tree.len(), "vCard received");
        Ok(Some(tree))
    }

    /// Replace the account's vCard.
    pub async fn set(&self, vcard: &VCardTree) -> Result<(), VCardError> {
        self.requester
            .request(iq_set(None, vcard.to_element()))
            .await?;
        Ok(())
    }
}
