//! File-backed document store.
//!
//! One JSON file per document under `store/<collection>/<id>.json`.
//! Writes hold the collection lock (`store/<collection>.lock`) for the
//! read-modify-write; scans read without locking since every write is an
//! atomic rename.

use std::fs;
use std::path::PathBuf;

use ulid::Ulid;

use super::{Document, DocumentSnapshot, DocumentStore, Query};
use crate::error::{Error, Result};
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    storage: Storage,
}

impl LocalDocumentStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        validate_segment("collection", collection)?;
        validate_segment("document id", id)?;
        Ok(self.storage.document_file(collection, id))
    }

    fn read(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let path = self.path(collection, id)?;
        self.storage.read_json_opt(&path)
    }
}

impl DocumentStore for LocalDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentSnapshot>> {
        tracing::debug!(collection, id, "document get");
        Ok(self.read(collection, id)?.map(|data| DocumentSnapshot {
            id: id.to_string(),
            data,
        }))
    }

    fn set(&self, collection: &str, id: &str, data: Document) -> Result<()> {
        let path = self.path(collection, id)?;
        let _lock = self.storage.lock_collection(collection)?;
        self.storage.write_json(&path, &data)?;
        tracing::info!(collection, id, "document set");
        Ok(())
    }

    fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let path = self.path(collection, id)?;
        let _lock = self.storage.lock_collection(collection)?;
        let mut existing: Document =
            self.storage
                .read_json_opt(&path)?
                .ok_or_else(|| Error::DocumentNotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
        let changed: Vec<String> = fields.keys().cloned().collect();
        existing.extend(fields);
        self.storage.write_json(&path, &existing)?;
        tracing::info!(collection, id, fields = ?changed, "document merge");
        Ok(())
    }

    fn add(&self, collection: &str, data: Document) -> Result<String> {
        let id = Ulid::new().to_string().to_ascii_lowercase();
        self.set(collection, &id, data)?;
        Ok(id)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = self.path(collection, id)?;
        let _lock = self.storage.lock_collection(collection)?;
        let removed = self.storage.remove_file(&path)?;
        tracing::info!(collection, id, removed, "document delete");
        Ok(())
    }

    fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        validate_segment("collection", &query.collection)?;
        let dir = self.storage.collection_dir(&query.collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::Io(err)),
        };

        let mut docs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            // Skip in-flight temp files.
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            // A concurrent delete may remove the file between listing and reading.
            if let Some(data) = self.storage.read_json_opt::<Document>(&path)? {
                docs.push(DocumentSnapshot {
                    id: id.to_string(),
                    data,
                });
            }
        }

        tracing::debug!(collection = %query.collection, scanned = docs.len(), "document query");
        Ok(query.apply(docs))
    }
}

fn validate_segment(label: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid {label} '{value}'")))
    }
}
