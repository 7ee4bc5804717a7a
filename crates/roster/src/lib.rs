//! Roster management (RFC 6121 §2) including roster versioning.
//!
//! [`RosterClient`] fetches and edits the roster through an
//! [`IqRequester`](waddle_xmpp::IqRequester). [`RosterPushHandler`] accepts
//! server pushes via an [`IqCallee`](waddle_xmpp::IqCallee) and republishes
//! them as [`RosterEvent`]s.

pub mod client;
pub mod error;
pub mod item;
pub mod push;

pub use client::{RosterClient, RosterItemUpdate, RosterUpdate};
pub use error::RosterError;
pub use item::{parse_item, parse_roster_query, Roster, RosterItem, Subscription};
pub use push::{RosterEvent, RosterEventKind, RosterEvents, RosterPushHandler};
