use std::str::FromStr;

use jid::Jid;
use minidom::Element;
use uuid::Uuid;
use xmpp_parsers::iq::{Iq, IqType};

use crate::error::PipelineError;

/// Build a `get` request with a fresh identifier.
pub fn iq_get(to: Option<Jid>, payload: Element) -> Iq {
    Iq {
        from: None,
        to,
        id: Uuid::new_v4().to_string(),
        payload: IqType::Get(payload),
    }
}

/// Build a `set` request with a fresh identifier.
pub fn iq_set(to: Option<Jid>, payload: Element) -> Iq {
    Iq {
        from: None,
        to,
        id: Uuid::new_v4().to_string(),
        payload: IqType::Set(payload),
    }
}

pub fn parse_element(raw: &[u8]) -> Result<Element, PipelineError> {
    let xml = std::str::from_utf8(raw).map_err(|error| {
        PipelineError::ParseFailed(format!("invalid UTF-8 stanza bytes: {error}"))
    })?;
    let trimmed = xml.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::ParseFailed(
            "stanza payload is empty".to_string(),
        ));
    }

    Element::from_str(trimmed).map_err(|error| {
        PipelineError::ParseFailed(format!("failed to parse stanza XML: {error}"))
    })
}

pub fn element_to_string(element: &Element) -> Result<String, PipelineError> {
    let mut payload = Vec::new();
    element.write_to(&mut payload).map_err(|error| {
        PipelineError::SerializeFailed(format!(
            "failed to serialize <{}/>: {error}",
            element.name()
        ))
    })?;
    String::from_utf8(payload)
        .map_err(|error| PipelineError::SerializeFailed(format!("non UTF-8 output: {error}")))
}

/// Text content of the first non-whitespace text node directly under `element`.
pub fn first_text_node(element: &Element) -> Option<&str> {
    element
        .nodes()
        .filter_map(|node| node.as_text())
        .find(|text| !text.trim().is_empty())
}
