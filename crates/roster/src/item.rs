use jid::Jid;
use minidom::Element;
use serde::Serialize;
use waddle_xmpp::ns;

use crate::error::RosterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    None,
    To,
    From,
    Both,
    /// Only ever seen in pushes and removal requests.
    Remove,
}

impl Subscription {
    /// Unknown or absent values read as `None`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("to") => Subscription::To,
            Some("from") => Subscription::From,
            Some("both") => Subscription::Both,
            Some("remove") => Subscription::Remove,
            _ => Subscription::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Subscription::None => "none",
            Subscription::To => "to",
            Subscription::From => "from",
            Subscription::Both => "both",
            Subscription::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterItem {
    pub jid: Jid,
    pub name: String,
    pub subscription: Subscription,
    pub approved: bool,
    /// Only the exact wire value `subscribe` sets this.
    pub ask: bool,
    pub groups: Vec<String>,
}

impl RosterItem {
    pub fn new(jid: Jid) -> Self {
        Self {
            jid,
            name: String::new(),
            subscription: Subscription::None,
            approved: false,
            ask: false,
            groups: Vec::new(),
        }
    }

    pub fn is_removal(&self) -> bool {
        self.subscription == Subscription::Remove
    }
}

/// A full roster result. `version` is opaque and only compared or echoed back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub items: Vec<RosterItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

pub fn parse_item(item: &Element) -> Result<RosterItem, RosterError> {
    let raw = item
        .attr("jid")
        .ok_or_else(|| RosterError::InvalidItem("<item/> without jid".to_string()))?;
    let jid = raw.parse::<Jid>().map_err(|source| RosterError::InvalidJid {
        value: raw.to_string(),
        source,
    })?;

    Ok(RosterItem {
        jid,
        name: item.attr("name").unwrap_or_default().to_string(),
        subscription: Subscription::parse(item.attr("subscription")),
        approved: item.attr("approved") == Some("true"),
        ask: item.attr("ask") == Some("subscribe"),
        groups: item
            .children()
            .filter(|child| child.is("group", ns::ROSTER))
            .map(Element::text)
            .collect(),
    })
}

pub fn parse_roster_query(query: &Element) -> Result<Roster, RosterError> {
    if !query.is("query", ns::ROSTER) {
        return Err(RosterError::MalformedResponse(format!(
            "expected roster <query/>, got <{}/>",
            query.name()
        )));
    }

    let items = query
        .children()
        .filter(|child| child.is("item", ns::ROSTER))
        .map(parse_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Roster {
        items,
        version: query.attr("ver").map(String::from),
    })
}
