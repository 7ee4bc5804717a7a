use std::sync::Arc;

use jid::Jid;
use minidom::Element;
use serde::Serialize;
use tracing::{debug, instrument};
use waddle_core::config::RsmNumberPolicy;
use waddle_xmpp::{element_to_string, iq_get, iq_set, ns, IqRequester, RsmQuery, RsmSet};

use crate::error::PubSubError;
use crate::item::{NodeConfig, PubSubItem};

/// One page of items from a node.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsPage {
    pub items: Vec<PubSubItem>,
    /// Present only when the response carried a `<set/>`.
    pub rsm: Option<RsmSet>,
}

#[derive(Serialize)]
struct ItemSummary<'a> {
    id: Option<&'a str>,
    payload: Option<String>,
}

impl Serialize for ItemsPage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let items: Vec<ItemSummary<'_>> = self
            .items
            .iter()
            .map(|item| ItemSummary {
                id: item.id.as_deref(),
                payload: item
                    .payload
                    .as_ref()
                    .and_then(|payload| element_to_string(payload).ok()),
            })
            .collect();

        let mut state = serializer.serialize_struct("ItemsPage", 2)?;
        state.serialize_field("items", &items)?;
        if let Some(ref rsm) = self.rsm {
            state.serialize_field("rsm", rsm)?;
        } else {
            state.skip_field("rsm")?;
        }
        state.end()
    }
}

/// Node lifecycle and item operations against a PubSub service.
pub struct PubSubClient {
    requester: Arc<dyn IqRequester>,
    rsm_policy: RsmNumberPolicy,
}

impl PubSubClient {
    pub fn new(requester: Arc<dyn IqRequester>) -> Self {
        Self {
            requester,
            rsm_policy: RsmNumberPolicy::default(),
        }
    }

    pub fn with_rsm_policy(mut self, policy: RsmNumberPolicy) -> Self {
        self.rsm_policy = policy;
        self
    }

    /// Create `node`, returning the node id the service confirmed.
    ///
    /// Services may answer with an empty result when the requested id was
    /// used as-is; the requested id is returned then.
    #[instrument(skip(self, config))]
    pub async fn create_node(
        &self,
        service: &Jid,
        node: &str,
        config: Option<&NodeConfig>,
    ) -> Result<String, PubSubError> {
        let mut pubsub = Element::builder("pubsub", ns::PUBSUB)
            .append(Element::builder("create", ns::PUBSUB).attr("node", node).build());
        if let Some(config) = config {
            pubsub = pubsub.append(config.to_configure());
        }

        let response = self
            .requester
            .request(iq_set(Some(service.clone()), pubsub.build()))
            .await?;

        let confirmed = response
            .as_ref()
            .and_then(|pubsub| pubsub.get_child("create", ns::PUBSUB))
            .and_then(|create| create.attr("node"))
            .unwrap_or(node)
            .to_string();
        debug!(node = %confirmed, "node created");
        Ok(confirmed)
    }

    #[instrument(skip(self))]
    pub async fn delete_node(&self, service: &Jid, node: &str) -> Result<(), PubSubError> {
        let pubsub = Element::builder("pubsub", ns::PUBSUB_OWNER)
            .append(
                Element::builder("delete", ns::PUBSUB_OWNER)
                    .attr("node", node)
                    .build(),
            )
            .build();

        self.requester
            .request(iq_set(Some(service.clone()), pubsub))
            .await?;
        Ok(())
    }

    /// Publish `item` to `node`, returning the item id.
    #[instrument(skip(self, item))]
    pub async fn publish(
        &self,
        service: &Jid,
        node: &str,
        item: Option<PubSubItem>,
    ) -> Result<String, PubSubError> {
        let supplied_id = item.as_ref().and_then(|item| item.id.clone());

        let mut publish = Element::builder("publish", ns::PUBSUB).attr("node", node);
        if let Some(ref item) = item {
            publish = publish.append(item.to_element(ns::PUBSUB));
        }
        let pubsub = Element::builder("pubsub", ns::PUBSUB)
            .append(publish.build())
            .build();

        let response = self
            .requester
            .request(iq_set(Some(service.clone()), pubsub))
            .await?;

        let assigned = response
            .as_ref()
            .and_then(|pubsub| pubsub.get_child("publish", ns::PUBSUB))
            .and_then(|publish| publish.get_child("item", ns::PUBSUB))
            .and_then(|item| item.attr("id"))
            .map(String::from);

        assigned.or(supplied_id).ok_or_else(|| {
            PubSubError::MalformedResponse("publish result carries no item id".to_string())
        })
    }

    /// Retract one item. The raw response payload is handed back untouched.
    #[instrument(skip(self))]
    pub async fn retract(
        &self,
        service: &Jid,
        node: &str,
        id: &str,
        notify: bool,
    ) -> Result<Option<Element>, PubSubError> {
        let retract = Element::builder("retract", ns::PUBSUB)
            .attr("node", node)
            .attr("notify", if notify { "true" } else { "false" })
            .append(Element::builder("item", ns::PUBSUB).attr("id", id).build())
            .build();
        let pubsub = Element::builder("pubsub", ns::PUBSUB)
            .append(retract)
            .build();

        Ok(self
            .requester
            .request(iq_set(Some(service.clone()), pubsub))
            .await?)
    }

    /// Fetch a single item; `None` when the service returned no items.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        service: &Jid,
        node: &str,
        id: &str,
    ) -> Result<Option<PubSubItem>, PubSubError> {
        let items = Element::builder("items", ns::PUBSUB)
            .attr("node", node)
            .append(Element::builder("item", ns::PUBSUB).attr("id", id).build())
            .build();
        let pubsub = Element::builder("pubsub", ns::PUBSUB)
            .append(items)
            .build();

        let response = self
            .requester
            .request(iq_get(Some(service.clone()), pubsub))
            .await?;
        let items = items_of(response.as_ref())?;

        Ok(items.children().next().map(PubSubItem::from_element))
    }

    /// Fetch a page of items, optionally driven by an RSM cursor.
    #[instrument(skip(self, rsm))]
    pub async fn items(
        &self,
        service: &Jid,
        node: &str,
        rsm: Option<&RsmQuery>,
    ) -> Result<ItemsPage, PubSubError> {
        let mut pubsub = Element::builder("pubsub", ns::PUBSUB)
            .append(Element::builder("items", ns::PUBSUB).attr("node", node).build());
        if let Some(rsm) = rsm {
            pubsub = pubsub.append(rsm.to_element());
        }

        let response = self
            .requester
            .request(iq_get(Some(service.clone()), pubsub.build()))
            .await?;
        let items = items_of(response.as_ref())?;

        let page = ItemsPage {
            items: items.children().map(PubSubItem::from_element).collect(),
            rsm: match response.as_ref() {
                Some(pubsub) => RsmSet::from_parent(pubsub, self.rsm_policy)?,
                None => None,
            },
        };
        debug!(
            node,
            count = page.items.len(),
            paged = page.rsm.is_some(),
            "fetched items"
        );
        Ok(page)
    }
}

fn items_of(response: Option<&Element>) -> Result<&Element, PubSubError> {
    let pubsub = response
        .filter(|payload| payload.is("pubsub", ns::PUBSUB))
        .ok_or_else(|| {
            PubSubError::MalformedResponse("items result carries no <pubsub/>".to_string())
        })?;
    pubsub.get_child("items", ns::PUBSUB).ok_or_else(|| {
        PubSubError::MalformedResponse("items result carries no <items/>".to_string())
    })
}
