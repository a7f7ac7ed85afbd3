//! Record tree to JSON document flattening
//!
//! The decoder yields structural nodes; the store persists flat documents.
//! Flattening merges attributes as string fields, inlines text-only children
//! as strings, groups repeated tags into arrays, and recurses into nested
//! trees. The `images` subtree is collapsed to an `image_count` field unless
//! image data was explicitly requested, since image metadata dominates dump
//! size but is rarely queried.

use cdp_pipeline::Record;
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// Controls how a record tree is flattened
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOptions {
    /// Keep full image metadata instead of collapsing it to a count
    pub include_images: bool,
}

/// Flatten a record into a JSON document.
///
/// The record identifier is not injected here; the store adds it so the
/// document always names its own row key.
pub fn record_to_document(record: &Record, options: DocumentOptions) -> Value {
    Value::Object(flatten(record, options))
}

fn flatten(record: &Record, options: DocumentOptions) -> Map<String, Value> {
    let mut doc = Map::new();

    for (name, value) in &record.attrs {
        doc.insert(name.clone(), Value::String(value.clone()));
    }

    for child in &record.children {
        if child.tag == "images" && !options.include_images {
            doc.insert(
                "image_count".to_string(),
                Value::from(child.children.len()),
            );
            continue;
        }
        let value = flatten_node(child, options);
        insert_grouped(&mut doc, child.tag.clone(), value);
    }

    if let Some(text) = &record.text {
        if !doc.contains_key("text") {
            doc.insert("text".to_string(), Value::String(text.clone()));
        }
    }

    doc
}

/// A child with no attributes or children collapses to its text; anything
/// richer stays an object.
fn flatten_node(node: &Record, options: DocumentOptions) -> Value {
    if node.attrs.is_empty() && node.children.is_empty() {
        return match &node.text {
            Some(text) => Value::String(text.clone()),
            None => Value::Null,
        };
    }
    Value::Object(flatten(node, options))
}

/// Insert under `key`, promoting to an array when the tag repeats
fn insert_grouped(doc: &mut Map<String, Value>, key: String, value: Value) {
    match doc.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        },
        Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(items) => items.push(value),
            existing => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            },
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artist() -> Record {
        Record::new("artist")
            .with_child(Record::new("id").with_text("153073"))
            .with_child(Record::new("name").with_text("Some Band"))
            .with_child(
                Record::new("namevariations")
                    .with_child(Record::new("name").with_text("Someband"))
                    .with_child(Record::new("name").with_text("S. Band")),
            )
            .with_child(
                Record::new("images")
                    .with_child(Record::new("image").with_attr("uri", "a.jpg"))
                    .with_child(Record::new("image").with_attr("uri", "b.jpg")),
            )
    }

    #[test]
    fn test_text_children_inline_as_strings() {
        let doc = record_to_document(&artist(), DocumentOptions::default());
        assert_eq!(doc["id"], json!("153073"));
        assert_eq!(doc["name"], json!("Some Band"));
    }

    #[test]
    fn test_nested_trees_recurse() {
        let doc = record_to_document(&artist(), DocumentOptions::default());
        assert_eq!(
            doc["namevariations"],
            json!({ "name": ["Someband", "S. Band"] })
        );
    }

    #[test]
    fn test_images_collapse_to_count_by_default() {
        let doc = record_to_document(&artist(), DocumentOptions::default());
        assert_eq!(doc["image_count"], json!(2));
        assert!(doc.get("images").is_none());
    }

    #[test]
    fn test_images_kept_when_requested() {
        let options = DocumentOptions {
            include_images: true,
        };
        let doc = record_to_document(&artist(), options);
        assert!(doc.get("image_count").is_none());
        assert_eq!(
            doc["images"],
            json!({ "image": [{ "uri": "a.jpg" }, { "uri": "b.jpg" }] })
        );
    }

    #[test]
    fn test_attributes_become_fields() {
        let release = Record::new("release")
            .with_attr("id", "42")
            .with_attr("status", "Accepted")
            .with_child(Record::new("title").with_text("Stockholm"));
        let doc = record_to_document(&release, DocumentOptions::default());
        assert_eq!(doc["id"], json!("42"));
        assert_eq!(doc["status"], json!("Accepted"));
        assert_eq!(doc["title"], json!("Stockholm"));
    }

    #[test]
    fn test_repeated_tag_promotes_to_array() {
        let record = Record::new("release")
            .with_child(Record::new("genre").with_text("House"))
            .with_child(Record::new("genre").with_text("Techno"));
        let doc = record_to_document(&record, DocumentOptions::default());
        assert_eq!(doc["genre"], json!(["House", "Techno"]));
    }

    #[test]
    fn test_empty_child_is_null() {
        let record = Record::new("release").with_child(Record::new("notes"));
        let doc = record_to_document(&record, DocumentOptions::default());
        assert_eq!(doc["notes"], json!(null));
    }
}
