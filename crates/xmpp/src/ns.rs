//! XML namespaces spoken by the adapters.

pub const CLIENT: &str = "jabber:client";

/// XEP-0060 Publish-Subscribe.
pub const PUBSUB: &str = "http://jabber.org/protocol/pubsub";
pub const PUBSUB_EVENT: &str = "http://jabber.org/protocol/pubsub#event";
pub const PUBSUB_OWNER: &str = "http://jabber.org/protocol/pubsub#owner";
pub const PUBSUB_NODE_CONFIG: &str = "http://jabber.org/protocol/pubsub#node_config";

/// XEP-0059 Result Set Management.
pub const RSM: &str = "http://jabber.org/protocol/rsm";

/// XEP-0004 Data Forms.
pub const DATA_FORMS: &str = "jabber:x:data";

/// XEP-0203 Delayed Delivery.
pub const DELAY: &str = "urn:xmpp:delay";

/// RFC 6121 roster.
pub const ROSTER: &str = "jabber:iq:roster";

/// XEP-0054 vcard-temp.
pub const VCARD: &str = "vcard-temp";
