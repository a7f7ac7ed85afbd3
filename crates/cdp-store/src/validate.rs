//! Per-collection JSON Schema validation
//!
//! Schemas are embedded at compile time and compiled once into an immutable
//! registry shared across every chunk of a run.

use crate::error::{Result, StoreError};
use cdp_common::types::Collection;
use jsonschema::Validator;
use serde_json::Value;
use std::collections::BTreeMap;

/// Immutable set of compiled validators, one per collection
pub struct ValidatorRegistry {
    validators: BTreeMap<Collection, Validator>,
}

impl ValidatorRegistry {
    pub fn new() -> Result<Self> {
        let mut validators = BTreeMap::new();
        for collection in Collection::ALL {
            let schema: Value =
                serde_json::from_str(schema_source(collection)).map_err(|err| {
                    StoreError::Schema {
                        collection,
                        reason: err.to_string(),
                    }
                })?;
            let validator = Validator::new(&schema).map_err(|err| StoreError::Schema {
                collection,
                reason: err.to_string(),
            })?;
            validators.insert(collection, validator);
        }
        Ok(Self { validators })
    }

    /// Validate a serialized record against its collection's schema.
    ///
    /// Returns `None` when the record is valid, otherwise all schema
    /// violations joined into one reason string.
    pub fn check(&self, collection: Collection, record: &Value) -> Option<String> {
        let validator = self.validators.get(&collection)?;
        let reasons: Vec<String> = validator
            .iter_errors(record)
            .map(|err| format!("{}: {}", err.instance_path(), err))
            .collect();
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }
}

fn schema_source(collection: Collection) -> &'static str {
    match collection {
        Collection::Artists => include_str!("../schemas/artists.json"),
        Collection::Labels => include_str!("../schemas/labels.json"),
        Collection::Masters => include_str!("../schemas/masters.json"),
        Collection::Releases => include_str!("../schemas/releases.json"),
    }
}
