use std::sync::Arc;

use jid::Jid;
use serde::Serialize;
use tracing::{debug, warn};
use waddle_core::EventChannels;
use waddle_xmpp::{ns, IqCallee, IqHandler, IqRequestContext};

use crate::item::{parse_item, RosterItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosterEventKind {
    Set,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RosterEvent {
    Set {
        item: RosterItem,
        version: Option<String>,
    },
    Remove {
        jid: Jid,
        version: Option<String>,
    },
}

impl RosterEvent {
    pub fn kind(&self) -> RosterEventKind {
        match self {
            RosterEvent::Set { .. } => RosterEventKind::Set,
            RosterEvent::Remove { .. } => RosterEventKind::Remove,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            RosterEvent::Set { version, .. } | RosterEvent::Remove { version, .. } => {
                version.as_deref()
            }
        }
    }
}

pub type RosterEvents = EventChannels<RosterEventKind, RosterEvent>;

/// Accepts roster pushes (RFC 6121 §2.1.6) and republishes them as [`RosterEvent`]s.
///
/// A push is only trusted when it has no `from` or comes from the account's
/// own bare address. Anything else is declined, never surfaced as an error.
pub struct RosterPushHandler {
    events: Arc<RosterEvents>,
}

impl RosterPushHandler {
    pub fn new(events: Arc<RosterEvents>) -> Self {
        Self { events }
    }

    /// Install this handler for roster `set` requests.
    pub fn register(self, callee: &mut IqCallee) {
        callee.on_set(ns::ROSTER, "query", self);
    }

    /// Decide and publish. Returns whether the push was accepted.
    pub fn accept(&self, ctx: &IqRequestContext<'_>) -> bool {
        if let Some(ref from) = ctx.from {
            if from.to_bare() != ctx.account.to_bare() {
                warn!(
                    from = %from,
                    account = %ctx.account.to_bare(),
                    "ignoring roster push from foreign sender"
                );
                return false;
            }
        }

        let Some(item) = ctx.payload.get_child("item", ns::ROSTER) else {
            warn!(id = ctx.id, "roster push without <item/>");
            return false;
        };
        let item = match parse_item(item) {
            Ok(item) => item,
            Err(error) => {
                warn!(id = ctx.id, %error, "ignoring unparseable roster push");
                return false;
            }
        };
        let version = ctx.payload.attr("ver").map(String::from);

        let event = if item.is_removal() {
            RosterEvent::Remove {
                jid: item.jid,
                version,
            }
        } else {
            RosterEvent::Set { item, version }
        };

        let listeners = self.events.emit(&event.kind(), &event);
        debug!(
            kind = ?event.kind(),
            version = event.version(),
            listeners,
            "roster push accepted"
        );
        true
    }
}

impl IqHandler for RosterPushHandler {
    fn handle(&self, ctx: &IqRequestContext<'_>) -> bool {
        self.accept(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minidom::Element;

    fn account() -> Jid {
        "juliet@example.com/balcony".parse().unwrap()
    }

    fn query(xml: &str) -> Element {
        xml.parse().unwrap()
    }

    fn accept(handler: &RosterPushHandler, from: Option<&str>, payload: &Element) -> bool {
        let account = account();
        let stanza = Element::builder("iq", ns::CLIENT).build();
        handler.accept(&IqRequestContext {
            id: "push",
            from: from.map(|from| from.parse().unwrap()),
            account: &account,
            payload,
            stanza: &stanza,
        })
    }

    #[test]
    fn own_full_jid_is_trusted() {
        let handler = RosterPushHandler::new(Arc::new(RosterEvents::new()));
        let payload = query("<query xmlns='jabber:iq:roster'><item jid='a@b'/></query>");

        assert!(accept(&handler, Some("juliet@example.com/other"), &payload));
    }

    #[test]
    fn foreign_sender_emits_nothing() {
        let events = Arc::new(RosterEvents::new());
        let (_, mut sets) = events.subscribe_stream(RosterEventKind::Set);
        let handler = RosterPushHandler::new(Arc::clone(&events));
        let payload = query("<query xmlns='jabber:iq:roster'><item jid='a@b'/></query>");

        assert!(!accept(&handler, Some("romeo@example.net"), &payload));
        assert!(!accept(&handler, Some("example.com"), &payload));
        assert!(sets.try_recv().is_err());
    }

    #[test]
    fn push_without_item_is_declined() {
        let handler = RosterPushHandler::new(Arc::new(RosterEvents::new()));
        let payload = query("<query xmlns='jabber:iq:roster' ver='v2'/>");

        assert!(!accept(&handler, None, &payload));
    }

    #[test]
    fn remove_event_carries_jid_and_version() {
        let events = Arc::new(RosterEvents::new());
        let (_, mut removes) = events.subscribe_stream(RosterEventKind::Remove);
        let handler = RosterPushHandler::new(Arc::clone(&events));
        let payload = query(
            "<query xmlns='jabber:iq:roster' ver='v1'>\
             <item jid='foo@bar' subscription='remove'/></query>",
        );

        assert!(accept(&handler, None, &payload));
        assert_eq!(
            removes.try_recv().unwrap(),
            RosterEvent::Remove {
                jid: "foo@bar".parse().unwrap(),
                version: Some("v1".into()),
            }
        );
    }
}
