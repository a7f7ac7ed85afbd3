//! The structural record type produced by the decoder

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed unit from a dump archive: a recursive node with a tag name,
/// attributes, child records, and optional text content.
///
/// Attributes are kept in a sorted map so serialized output is deterministic
/// for a given input. Records are immutable once produced by the decoder and
/// owned by the chunk that carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub tag: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Record>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Record {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Set an attribute (builder style, used by tests and fixtures)
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Append a child record (builder style)
    pub fn with_child(mut self, child: Record) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content (builder style)
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// First child with the given tag
    pub fn child(&self, tag: &str) -> Option<&Record> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in document order
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text content of the first child with the given tag
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(|c| c.text.as_deref())
    }

    /// The record's identifier.
    ///
    /// Dumps carry ids in one of two shapes: an `id` attribute on the record
    /// element (masters, releases) or an `<id>` child element (artists,
    /// labels). Both are recognized, attribute first.
    pub fn identifier(&self) -> Option<&str> {
        self.attr("id").or_else(|| self.child_text("id"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn release() -> Record {
        Record::new("release")
            .with_attr("id", "42")
            .with_attr("status", "Accepted")
            .with_child(Record::new("title").with_text("Stockholm"))
            .with_child(Record::new("genres").with_child(Record::new("genre").with_text("House")))
    }

    #[test]
    fn test_identifier_from_attribute() {
        assert_eq!(release().identifier(), Some("42"));
    }

    #[test]
    fn test_identifier_from_child_element() {
        let artist = Record::new("artist")
            .with_child(Record::new("id").with_text("7"))
            .with_child(Record::new("name").with_text("Some Artist"));
        assert_eq!(artist.identifier(), Some("7"));
    }

    #[test]
    fn test_identifier_missing() {
        assert_eq!(Record::new("artist").identifier(), None);
    }

    #[test]
    fn test_child_lookup() {
        let record = release();
        assert_eq!(record.child_text("title"), Some("Stockholm"));
        assert_eq!(record.attr("status"), Some("Accepted"));
        assert!(record.child("videos").is_none());
        assert_eq!(record.children_named("title").count(), 1);
    }

    #[test]
    fn test_serialized_shape_is_compact() {
        let json = serde_json::to_string(&Record::new("artist")).unwrap();
        assert_eq!(json, r#"{"tag":"artist"}"#);

        let json = serde_json::to_string(&Record::new("title").with_text("x")).unwrap();
        assert_eq!(json, r#"{"tag":"title","text":"x"}"#);
    }
}
