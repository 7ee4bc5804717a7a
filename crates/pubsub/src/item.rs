use std::fmt::Display;

use minidom::Element;
use waddle_xmpp::ns;

/// A single item in a PubSub node.
#[derive(Debug, Clone, PartialEq)]
pub struct PubSubItem {
    /// Optional item ID. If None, the service assigns one on publish.
    pub id: Option<String>,
    /// The item payload (any XML element).
    pub payload: Option<Element>,
}

impl PubSubItem {
    pub fn new(id: Option<String>, payload: Option<Element>) -> Self {
        Self { id, payload }
    }

    pub fn with_id(id: impl Into<String>, payload: Element) -> Self {
        Self::new(Some(id.into()), Some(payload))
    }

    /// Read an `<item/>`; the payload is its first child element.
    pub fn from_element(elem: &Element) -> Self {
        let id = elem.attr("id").map(String::from);
        let payload = elem.children().next().cloned();
        Self { id, payload }
    }

    pub fn to_element(&self, ns: &str) -> Element {
        let mut builder = Element::builder("item", ns);

        if let Some(ref id) = self.id {
            builder = builder.attr("id", id);
        }

        if let Some(ref payload) = self.payload {
            builder = builder.append(payload.clone());
        }

        builder.build()
    }
}

/// Node configuration submitted with `create`, kept in insertion order.
///
/// Values are stringified on insert and forwarded without checking the
/// field names against the node_config form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    options: Vec<(String, String)>,
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.options.push((name.into(), value.to_string()));
        self
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Build `<configure><x type='submit'/></configure>` with `FORM_TYPE` first.
    pub fn to_configure(&self) -> Element {
        let form_type = field("FORM_TYPE", Some("hidden"), ns::PUBSUB_NODE_CONFIG);
        let form = self
            .options()
            .map(|(name, value)| field(name, None, value))
            .fold(
                Element::builder("x", ns::DATA_FORMS)
                    .attr("type", "submit")
                    .append(form_type),
                |form, field| form.append(field),
            )
            .build();

        Element::builder("configure", ns::PUBSUB)
            .append(form)
            .build()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for NodeConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(NodeConfig::new(), |config, (name, value)| {
                config.option(name, value)
            })
    }
}

fn field(var: &str, kind: Option<&str>, value: &str) -> Element {
    let mut builder = Element::builder("field", ns::DATA_FORMS).attr("var", var);
    if let Some(kind) = kind {
        builder = builder.attr("type", kind);
    }
    builder
        .append(
            Element::builder("value", ns::DATA_FORMS)
                .append(value)
                .build(),
        )
        .build()
}
