//! XEP-0059 Result Set Management cursors.
//!
//! Requests carry an [`RsmQuery`]: an ordered set of named fields whose values
//! may be text, a number, or null (an empty element, e.g. `<before/>` to ask
//! for the last page). Responses decode into an [`RsmSet`] where `max` and
//! `count` are integers and every other field is kept verbatim.

use std::fmt;

use minidom::Element;
use thiserror::Error;
use tracing::{debug, warn};
use waddle_core::config::RsmNumberPolicy;

use crate::ns;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RsmError {
    #[error("rsm field <{field}/> is not a base-10 integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsmField {
    First,
    Last,
    After,
    Before,
    Index,
    Max,
    Count,
}

impl RsmField {
    pub fn as_str(self) -> &'static str {
        match self {
            RsmField::First => "first",
            RsmField::Last => "last",
            RsmField::After => "after",
            RsmField::Before => "before",
            RsmField::Index => "index",
            RsmField::Max => "max",
            RsmField::Count => "count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "first" => RsmField::First,
            "last" => RsmField::Last,
            "after" => RsmField::After,
            "before" => RsmField::Before,
            "index" => RsmField::Index,
            "max" => RsmField::Max,
            "count" => RsmField::Count,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, RsmField::Max | RsmField::Count)
    }
}

impl fmt::Display for RsmField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied value of one query field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsmValue {
    Text(String),
    Number(i64),
    Null,
}

impl RsmValue {
    fn to_text(&self) -> Option<String> {
        match self {
            RsmValue::Text(text) => Some(text.clone()),
            RsmValue::Number(number) => Some(number.to_string()),
            RsmValue::Null => None,
        }
    }
}

impl From<&str> for RsmValue {
    fn from(value: &str) -> Self {
        RsmValue::Text(value.to_string())
    }
}

impl From<String> for RsmValue {
    fn from(value: String) -> Self {
        RsmValue::Text(value)
    }
}

impl From<i64> for RsmValue {
    fn from(value: i64) -> Self {
        RsmValue::Number(value)
    }
}

impl From<u32> for RsmValue {
    fn from(value: u32) -> Self {
        RsmValue::Number(i64::from(value))
    }
}

impl From<u64> for RsmValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(RsmValue::Number)
            .unwrap_or_else(|_| RsmValue::Text(value.to_string()))
    }
}

impl From<usize> for RsmValue {
    fn from(value: usize) -> Self {
        RsmValue::from(value as u64)
    }
}

impl<T: Into<RsmValue>> From<Option<T>> for RsmValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RsmValue::Null, Into::into)
    }
}

/// Cursor sent with a paged request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsmQuery {
    fields: Vec<(RsmField, RsmValue)>,
}

impl RsmQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing an earlier value in place.
    pub fn set(mut self, field: RsmField, value: impl Into<RsmValue>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    pub fn max(self, max: u32) -> Self {
        self.set(RsmField::Max, max)
    }

    pub fn after(self, id: impl Into<String>) -> Self {
        self.set(RsmField::After, id.into())
    }

    /// `None` asks for the last page.
    pub fn before(self, id: Option<&str>) -> Self {
        self.set(RsmField::Before, id)
    }

    pub fn index(self, index: u32) -> Self {
        self.set(RsmField::Index, index)
    }

    pub fn get(&self, field: RsmField) -> Option<&RsmValue> {
        self.fields
            .iter()
            .find(|(existing, _)| *existing == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_element(&self) -> Element {
        self.fields
            .iter()
            .fold(Element::builder("set", ns::RSM), |set, (field, value)| {
                let child = Element::builder(field.as_str(), ns::RSM);
                let child = match value.to_text() {
                    Some(text) => child.append(text),
                    None => child,
                };
                set.append(child.build())
            })
            .build()
    }
}

/// Cursor decoded from a response `<set/>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RsmSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl RsmSet {
    pub fn from_element(set: &Element, policy: RsmNumberPolicy) -> Result<Self, RsmError> {
        let mut decoded = RsmSet::default();

        for child in set.children() {
            let Some(field) = RsmField::from_name(child.name()) else {
                debug!(name = child.name(), "skipping unknown rsm field");
                continue;
            };
            let text = child.text();

            if field.is_numeric() {
                let number = match text.trim().parse::<u64>() {
                    Ok(number) => number,
                    Err(_) if policy == RsmNumberPolicy::Lenient => {
                        warn!(field = field.as_str(), value = %text, "dropping non-numeric rsm field");
                        continue;
                    }
                    Err(_) => {
                        return Err(RsmError::InvalidNumber {
                            field: field.as_str(),
                            value: text,
                        })
                    }
                };
                match field {
                    RsmField::Max => decoded.max = Some(number),
                    _ => decoded.count = Some(number),
                }
                continue;
            }

            let slot = match field {
                RsmField::First => &mut decoded.first,
                RsmField::Last => &mut decoded.last,
                RsmField::After => &mut decoded.after,
                RsmField::Before => &mut decoded.before,
                _ => &mut decoded.index,
            };
            *slot = Some(text);
        }

        Ok(decoded)
    }

    /// Look for a `<set/>` directly under `parent`. `Ok(None)` when there is none.
    pub fn from_parent(parent: &Element, policy: RsmNumberPolicy) -> Result<Option<Self>, RsmError> {
        parent
            .get_child("set", ns::RSM)
            .map(|set| Self::from_element(set, policy))
            .transpose()
    }
}
