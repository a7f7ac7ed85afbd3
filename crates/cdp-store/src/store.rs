//! SQLite-backed document store
//!
//! The reference chunk handler: validates each record, flattens it to a JSON
//! document, and upserts it by (collection, id) inside one transaction per
//! chunk. Upsert semantics make chunk replay after a crash idempotent, which
//! the pipeline's at-least-once delivery contract requires.

use crate::document::{record_to_document, DocumentOptions};
use crate::error::{Result, StoreError};
use crate::validate::ValidatorRegistry;
use async_trait::async_trait;
use cdp_common::types::Collection;
use cdp_pipeline::{Chunk, ChunkHandler, InvalidRow, Record};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Behavior switches for the reference handler
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Validate each record against its collection's schema
    pub validate: bool,
    /// Escalate the first invalid record to a fatal error
    pub bail: bool,
    /// Keep full image metadata in documents
    pub include_images: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            validate: true,
            bail: false,
            include_images: false,
        }
    }
}

pub struct DocumentStore {
    pool: SqlitePool,
    registry: Option<ValidatorRegistry>,
    options: StoreOptions,
}

impl DocumentStore {
    /// Open the database file, creating it and its parent directory if
    /// needed, and bring the schema up to date.
    pub async fn open(path: &Path, options: StoreOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(connect)
            .await
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        info!(database = %path.display(), "Opened document database");
        Self::from_pool(pool, options).await
    }

    /// Build a store on an existing pool. Tests use this with in-memory
    /// databases.
    pub async fn from_pool(pool: SqlitePool, options: StoreOptions) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        let registry = if options.validate {
            Some(ValidatorRegistry::new()?)
        } else {
            None
        };

        Ok(Self {
            pool,
            registry,
            options,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored documents for a collection
    pub async fn count(&self, collection: Collection) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?1")
                .bind(collection.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Fetch one stored document by id
    pub async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((body,)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Decide whether a record can be written. Returns its identifier when
    /// writable, otherwise the reason it is invalid.
    fn classify(
        &self,
        collection: Collection,
        record: &Record,
        raw: &Value,
        seen: &mut HashSet<String>,
    ) -> std::result::Result<String, String> {
        if let Some(registry) = &self.registry {
            if let Some(reason) = registry.check(collection, raw) {
                return Err(reason);
            }
        }

        let Some(id) = record.identifier() else {
            return Err("record has no identifier".to_string());
        };

        if !seen.insert(id.to_string()) {
            return Err(format!(
                "{collection} document {id} already exists in this chunk"
            ));
        }

        Ok(id.to_string())
    }
}

#[async_trait]
impl ChunkHandler for DocumentStore {
    async fn process_chunk(
        &self,
        chunk: Chunk,
        collection: Collection,
    ) -> anyhow::Result<Vec<InvalidRow>> {
        let mut reports = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut written = 0usize;
        let document_options = DocumentOptions {
            include_images: self.options.include_images,
        };

        let mut tx = self.pool.begin().await?;

        for (offset, record) in chunk.records.iter().enumerate() {
            let index = chunk.start_index + offset as u64;
            let raw = serde_json::to_value(record)?;

            match self.classify(collection, record, &raw, &mut seen_ids) {
                Err(reason) => {
                    // Dropping the transaction here rolls back anything
                    // already written for this chunk.
                    if self.options.bail {
                        anyhow::bail!(
                            "invalid {collection} record at index {index} (id {}): {reason}",
                            record.identifier().unwrap_or("unknown"),
                        );
                    }
                    reports.push(InvalidRow {
                        index,
                        id: record.identifier().map(String::from),
                        raw_json: raw.to_string(),
                        reason,
                    });
                },
                Ok(id) => {
                    let mut document = record_to_document(record, document_options);
                    if let Value::Object(map) = &mut document {
                        map.insert("id".to_string(), Value::String(id.clone()));
                    }

                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, body, updated_at)
                        VALUES (?1, ?2, ?3, datetime('now'))
                        ON CONFLICT(collection, id) DO UPDATE SET
                            body = excluded.body,
                            updated_at = datetime('now')
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(document.to_string())
                    .execute(&mut *tx)
                    .await?;
                    written += 1;
                },
            }
        }

        tx.commit().await?;
        debug!(
            collection = %collection,
            written,
            invalid = reports.len(),
            "Chunk persisted"
        );
        Ok(reports)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store(options: StoreOptions) -> DocumentStore {
        // A pinned single connection keeps every query on the same
        // in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DocumentStore::from_pool(pool, options).await.unwrap()
    }

    fn artist(id: u64, name: &str) -> Record {
        Record::new("artist")
            .with_child(Record::new("id").with_text(id.to_string()))
            .with_child(Record::new("name").with_text(name))
    }

    fn chunk(start_index: u64, records: Vec<Record>) -> Chunk {
        Chunk {
            start_index,
            records,
        }
    }

    #[tokio::test]
    async fn test_valid_records_are_persisted() {
        let store = memory_store(StoreOptions::default()).await;
        let records = vec![artist(1, "First"), artist(2, "Second"), artist(3, "Third")];

        let reports = store
            .process_chunk(chunk(0, records), Collection::Artists)
            .await
            .unwrap();

        assert!(reports.is_empty());
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 3);

        let body = store
            .get(Collection::Artists, "2")
            .await
            .unwrap()
            .expect("document 2 should exist");
        assert_eq!(body["id"], json!("2"));
        assert_eq!(body["name"], json!("Second"));
    }

    #[tokio::test]
    async fn test_chunk_replay_is_idempotent() {
        let store = memory_store(StoreOptions::default()).await;
        let records = vec![artist(1, "First"), artist(2, "Second")];

        store
            .process_chunk(chunk(0, records.clone()), Collection::Artists)
            .await
            .unwrap();
        let reports = store
            .process_chunk(chunk(0, records), Collection::Artists)
            .await
            .unwrap();

        assert!(reports.is_empty(), "replay must not produce reports");
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_within_chunk_is_reported_once() {
        let store = memory_store(StoreOptions::default()).await;
        let records = vec![artist(7, "Original"), artist(7, "Impostor")];

        let reports = store
            .process_chunk(chunk(0, records), Collection::Artists)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 1);
        assert_eq!(reports[0].id.as_deref(), Some("7"));
        assert!(reports[0].reason.contains("already exists"));

        // First occurrence wins
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 1);
        let body = store.get(Collection::Artists, "7").await.unwrap().unwrap();
        assert_eq!(body["name"], json!("Original"));
    }

    #[tokio::test]
    async fn test_record_without_identifier_is_reported() {
        let store = memory_store(StoreOptions {
            validate: false,
            ..StoreOptions::default()
        })
        .await;
        let records = vec![Record::new("artist").with_child(Record::new("name").with_text("X"))];

        let reports = store
            .process_chunk(chunk(5, records), Collection::Artists)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 5);
        assert_eq!(reports[0].id, None);
        assert!(reports[0].reason.contains("no identifier"));
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_schema_failure_is_reported_not_written() {
        let store = memory_store(StoreOptions::default()).await;
        // No name child, so the artists schema rejects it
        let nameless = Record::new("artist").with_child(Record::new("id").with_text("9"));
        let records = vec![artist(1, "Fine"), nameless];

        let reports = store
            .process_chunk(chunk(0, records), Collection::Artists)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 1);
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_validate_accepts_schema_violations() {
        let store = memory_store(StoreOptions {
            validate: false,
            ..StoreOptions::default()
        })
        .await;
        let nameless = Record::new("artist").with_child(Record::new("id").with_text("9"));

        let reports = store
            .process_chunk(chunk(0, vec![nameless]), Collection::Artists)
            .await
            .unwrap();

        assert!(reports.is_empty());
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bail_aborts_and_rolls_back_the_chunk() {
        let store = memory_store(StoreOptions {
            bail: true,
            ..StoreOptions::default()
        })
        .await;
        let nameless = Record::new("artist").with_child(Record::new("id").with_text("9"));
        let records = vec![artist(1, "Fine"), nameless];

        let err = store
            .process_chunk(chunk(0, records), Collection::Artists)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("index 1"), "got: {err}");
        assert!(err.to_string().contains("9"), "got: {err}");
        // The transaction never committed, so the valid record is gone too
        assert_eq!(store.count(Collection::Artists).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_images_collapse_in_stored_documents() {
        let store = memory_store(StoreOptions::default()).await;
        let record = artist(3, "Pictured").with_child(
            Record::new("images")
                .with_child(Record::new("image").with_attr("uri", "a.jpg"))
                .with_child(Record::new("image").with_attr("uri", "b.jpg")),
        );

        store
            .process_chunk(chunk(0, vec![record]), Collection::Artists)
            .await
            .unwrap();

        let body = store.get(Collection::Artists, "3").await.unwrap().unwrap();
        assert_eq!(body["image_count"], json!(2));
        assert!(body.get("images").is_none());
    }
}
