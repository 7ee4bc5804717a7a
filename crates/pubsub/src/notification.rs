use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use minidom::Element;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};
use waddle_core::EventChannels;
use waddle_xmpp::{
    element_to_string, ns, ProcessorContext, ProcessorResult, StanzaProcessor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Published,
    PublishedLast,
    Retracted,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Published => "item-published",
            NotificationKind::PublishedLast => "last-item-published",
            NotificationKind::Retracted => "item-deleted",
        }
    }
}

/// Address of one notification channel: every event of `kind` from `service`,
/// or only those for `node` when it is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationChannel {
    pub kind: NotificationKind,
    pub service: String,
    pub node: Option<String>,
}

impl NotificationChannel {
    pub fn service(kind: NotificationKind, service: impl Into<String>) -> Self {
        Self {
            kind,
            service: service.into(),
            node: None,
        }
    }

    pub fn node(
        kind: NotificationKind,
        service: impl Into<String>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            service: service.into(),
            node: Some(node.into()),
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.service)?;
        if let Some(ref node) = self.node {
            write!(f, ":{node}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotificationEvent {
    Published {
        node: String,
        id: Option<String>,
        #[serde(serialize_with = "serialize_payload")]
        payload: Option<Element>,
    },
    PublishedLast {
        node: String,
        id: Option<String>,
        #[serde(serialize_with = "serialize_payload")]
        payload: Option<Element>,
        stamp: String,
    },
    Retracted {
        node: String,
        id: Option<String>,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::Published { .. } => NotificationKind::Published,
            NotificationEvent::PublishedLast { .. } => NotificationKind::PublishedLast,
            NotificationEvent::Retracted { .. } => NotificationKind::Retracted,
        }
    }

    pub fn node(&self) -> &str {
        match self {
            NotificationEvent::Published { node, .. }
            | NotificationEvent::PublishedLast { node, .. }
            | NotificationEvent::Retracted { node, .. } => node,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            NotificationEvent::Published { id, .. }
            | NotificationEvent::PublishedLast { id, .. }
            | NotificationEvent::Retracted { id, .. } => id.as_deref(),
        }
    }

    /// The replay stamp parsed as an XEP-0082 date-time.
    pub fn stamp_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            NotificationEvent::PublishedLast { stamp, .. } => {
                DateTime::parse_from_rfc3339(stamp).ok()
            }
            _ => None,
        }
    }
}

fn serialize_payload<S: Serializer>(
    payload: &Option<Element>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match payload {
        Some(payload) => {
            let xml = element_to_string(payload).map_err(serde::ser::Error::custom)?;
            serializer.serialize_some(&xml)
        }
        None => serializer.serialize_none(),
    }
}

pub type NotificationChannels = EventChannels<NotificationChannel, NotificationEvent>;

/// Classifies inbound PubSub event messages and emits them on service and node channels.
pub struct NotificationRouter {
    channels: Arc<NotificationChannels>,
}

impl NotificationRouter {
    pub fn new(channels: Arc<NotificationChannels>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &Arc<NotificationChannels> {
        &self.channels
    }

    fn route(&self, stanza: &Element, event: &Element, service: &str) {
        let Some(items) = event.get_child("items", ns::PUBSUB_EVENT) else {
            warn!(service, "pubsub event without <items/>, ignoring");
            return;
        };
        let Some(node) = items.attr("node") else {
            warn!(service, "pubsub <items/> without node, ignoring");
            return;
        };

        let stamp = stanza
            .children()
            .find(|child| child.name() == "delay")
            .and_then(|delay| delay.attr("stamp"));

        for child in items.children() {
            let id = child.attr("id").map(String::from);
            let event = match child.name() {
                "item" => {
                    let payload = child.children().next().cloned();
                    match stamp {
                        Some(stamp) => NotificationEvent::PublishedLast {
                            node: node.to_string(),
                            id,
                            payload,
                            stamp: stamp.to_string(),
                        },
                        None => NotificationEvent::Published {
                            node: node.to_string(),
                            id,
                            payload,
                        },
                    }
                }
                "retract" => NotificationEvent::Retracted {
                    node: node.to_string(),
                    id,
                },
                other => {
                    debug!(service, node, element = other, "skipping unknown items child");
                    continue;
                }
            };

            let kind = event.kind();
            let by_service = self
                .channels
                .emit(&NotificationChannel::service(kind, service), &event);
            let by_node = self
                .channels
                .emit(&NotificationChannel::node(kind, service, node), &event);
            debug!(
                service,
                node,
                kind = kind.as_str(),
                listeners = by_service + by_node,
                "routed pubsub notification"
            );
        }
    }
}

fn event_child(stanza: &Element) -> Option<&Element> {
    if stanza.name() != "message" {
        return None;
    }
    stanza.get_child("event", ns::PUBSUB_EVENT)
}

impl StanzaProcessor for NotificationRouter {
    fn name(&self) -> &str {
        "pubsub-notifications"
    }

    fn process_inbound(&self, stanza: &Element, ctx: &ProcessorContext) -> ProcessorResult {
        let Some(event) = event_child(stanza) else {
            return ProcessorResult::Continue;
        };

        let service = match stanza.attr("from") {
            Some(from) => from.to_string(),
            None => ctx.account.to_bare().to_string(),
        };
        self.route(stanza, event, &service);

        ProcessorResult::Handled
    }

    fn priority(&self) -> i32 {
        40
    }
}
