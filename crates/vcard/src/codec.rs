use std::fmt;

use minidom::Element;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use waddle_core::config::MixedContentPolicy;
use waddle_xmpp::{first_text_node, ns};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VCardValue {
    Text(String),
    Tree(VCardTree),
}

impl VCardValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            VCardValue::Text(text) => Some(text),
            VCardValue::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&VCardTree> {
        match self {
            VCardValue::Tree(tree) => Some(tree),
            VCardValue::Text(_) => None,
        }
    }

    fn decode(element: &Element, policy: MixedContentPolicy) -> Self {
        let has_children = element.children().next().is_some();
        let text = first_text_node(element);

        match (policy, text) {
            (MixedContentPolicy::TextFirst, Some(text)) => VCardValue::Text(text.to_string()),
            _ if has_children => VCardValue::Tree(VCardTree::decode_children(element, policy)),
            (_, text) => VCardValue::Text(text.unwrap_or_default().to_string()),
        }
    }

    fn encode(&self, name: &str) -> Element {
        let builder = Element::builder(name, ns::VCARD);
        match self {
            VCardValue::Text(text) => builder.append(text.as_str()).build(),
            VCardValue::Tree(tree) => tree.append_to(builder).build(),
        }
    }
}

impl From<&str> for VCardValue {
    fn from(text: &str) -> Self {
        VCardValue::Text(text.to_string())
    }
}

impl From<String> for VCardValue {
    fn from(text: String) -> Self {
        VCardValue::Text(text)
    }
}

impl From<VCardTree> for VCardValue {
    fn from(tree: VCardTree) -> Self {
        VCardValue::Tree(tree)
    }
}

/// Field name to value mapping of a vCard or one of its containers.
///
/// Insertion order is kept so encoding is deterministic, but two trees with
/// the same entries compare equal regardless of order.
#[derive(Debug, Clone, Default)]
pub struct VCardTree {
    entries: Vec<(String, VCardValue)>,
}

impl VCardTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `name`. An existing entry keeps its position and
    /// its old value is returned.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<VCardValue>,
    ) -> Option<VCardValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<VCardValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&VCardValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(VCardValue::as_text)
    }

    pub fn tree(&self, name: &str) -> Option<&VCardTree> {
        self.get(name).and_then(VCardValue::as_tree)
    }

    pub fn remove(&mut self, name: &str) -> Option<VCardValue> {
        let position = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VCardValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode the children of a `<vCard/>` element.
    ///
    /// A repeated field name keeps the last value seen.
    pub fn from_element(vcard: &Element, policy: MixedContentPolicy) -> Self {
        Self::decode_children(vcard, policy)
    }

    fn decode_children(element: &Element, policy: MixedContentPolicy) -> Self {
        element
            .children()
            .fold(VCardTree::new(), |tree, child| {
                tree.with(child.name(), VCardValue::decode(child, policy))
            })
    }

    pub fn to_element(&self) -> Element {
        self.append_to(Element::builder("vCard", ns::VCARD)).build()
    }

    fn append_to(&self, builder: minidom::ElementBuilder) -> minidom::ElementBuilder {
        self.entries
            .iter()
            .fold(builder, |builder, (name, value)| builder.append(value.encode(name)))
    }
}

impl PartialEq for VCardTree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Eq for VCardTree {}

impl<K: Into<String>, V: Into<VCardValue>> FromIterator<(K, V)> for VCardTree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(VCardTree::new(), |tree, (name, value)| tree.with(name, value))
    }
}

impl Serialize for VCardTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for VCardValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VCardValue::Text(text) => serializer.serialize_str(text),
            VCardValue::Tree(tree) => tree.serialize(serializer),
        }
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = VCardTree;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of vCard fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut tree = VCardTree::new();
        while let Some((name, value)) = access.next_entry::<String, VCardValue>()? {
            tree.insert(name, value);
        }
        Ok(tree)
    }
}

impl<'de> Deserialize<'de> for VCardTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TreeVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = VCardValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or map of vCard fields")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value.to_string()))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(VCardValue::Text(value.to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        TreeVisitor.visit_map(access).map(VCardValue::Tree)
    }
}

impl<'de> Deserialize<'de> for VCardValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
