use std::str::FromStr;
use std::sync::Arc;

use jid::{BareJid, Jid};
use minidom::Element;
use tracing::{debug, instrument};
use waddle_xmpp::{iq_get, iq_set, ns, IqRequester};

use crate::error::RosterError;
use crate::item::{parse_roster_query, Roster};

/// Item fields sent with a roster `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterItemUpdate {
    pub jid: Jid,
    pub name: Option<String>,
    pub groups: Vec<String>,
}

impl RosterItemUpdate {
    pub fn new(jid: Jid) -> Self {
        Self {
            jid,
            name: None,
            groups: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// What a roster `set` may be called with: a bare address, or an item with
/// a name and groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterUpdate {
    Address(Jid),
    Item(RosterItemUpdate),
}

impl RosterUpdate {
    fn to_item_element(&self) -> Element {
        match self {
            RosterUpdate::Address(jid) => Element::builder("item", ns::ROSTER)
                .attr("jid", jid.to_string())
                .build(),
            RosterUpdate::Item(update) => {
                let mut item =
                    Element::builder("item", ns::ROSTER).attr("jid", update.jid.to_string());
                if let Some(ref name) = update.name {
                    item = item.attr("name", name);
                }
                update
                    .groups
                    .iter()
                    .fold(item, |item, group| {
                        item.append(
                            Element::builder("group", ns::ROSTER)
                                .append(group.as_str())
                                .build(),
                        )
                    })
                    .build()
            }
        }
    }
}

impl From<Jid> for RosterUpdate {
    fn from(jid: Jid) -> Self {
        RosterUpdate::Address(jid)
    }
}

impl From<BareJid> for RosterUpdate {
    fn from(jid: BareJid) -> Self {
        RosterUpdate::Address(Jid::from(jid))
    }
}

impl From<RosterItemUpdate> for RosterUpdate {
    fn from(update: RosterItemUpdate) -> Self {
        RosterUpdate::Item(update)
    }
}

impl FromStr for RosterUpdate {
    type Err = RosterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .parse::<Jid>()
            .map(RosterUpdate::Address)
            .map_err(|source| RosterError::InvalidJid {
                value: value.to_string(),
                source,
            })
    }
}

pub struct RosterClient {
    requester: Arc<dyn IqRequester>,
}

impl RosterClient {
    pub fn new(requester: Arc<dyn IqRequester>) -> Self {
        Self { requester }
    }

    /// Fetch the roster, optionally conditioned on a known `version`.
    ///
    /// `Ok(None)` means the server answered with an empty result: nothing
    /// changed since `version`. Expect pushes for the changes instead.
    #[instrument(skip(self))]
    pub async fn get(&self, version: Option<&str>) -> Result<Option<Roster>, RosterError> {
        let mut query = Element::builder("query", ns::ROSTER);
        if let Some(version) = version {
            query = query.attr("ver", version);
        }

        let Some(response) = self.requester.request(iq_get(None, query.build())).await? else {
            debug!("roster unchanged since requested version");
            return Ok(None);
        };

        let roster = parse_roster_query(&response)?;
        debug!(
            count = roster.items.len(),
            version = roster.version.as_deref(),
            "roster received"
        );
        Ok(Some(roster))
    }

    /// Add or update a roster item.
    pub async fn set(&self, update: impl Into<RosterUpdate>) -> Result<(), RosterError> {
        let update = update.into();
        let query = Element::builder("query", ns::ROSTER)
            .append(update.to_item_element())
            .build();

        self.requester.request(iq_set(None, query)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, jid: &Jid) -> Result<(), RosterError> {
        let query = Element::builder("query", ns::ROSTER)
            .append(
                Element::builder("item", ns::ROSTER)
                    .attr("jid", jid.to_string())
                    .attr("subscription", "remove")
                    .build(),
            )
            .build();

        self.requester.request(iq_set(None, query)).await?;
        Ok(())
    }
}
