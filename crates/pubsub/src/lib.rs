//! Publish-Subscribe (XEP-0060) for Waddle clients.
//!
//! [`PubSubClient`] wraps the node lifecycle and item operations behind an
//! [`IqRequester`](waddle_xmpp::IqRequester). [`NotificationRouter`] sits in the
//! inbound [`StanzaPipeline`](waddle_xmpp::StanzaPipeline) and fans event
//! notifications out to typed channels.

pub mod client;
pub mod error;
pub mod item;
pub mod notification;

pub use client::{ItemsPage, PubSubClient};
pub use error::PubSubError;
pub use item::{NodeConfig, PubSubItem};
pub use notification::{
    NotificationChannel, NotificationChannels, NotificationEvent, NotificationKind,
    NotificationRouter,
};
