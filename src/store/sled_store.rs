use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::filter;
use super::types::{Document, FindQuery, StoreError, StoreResult};
use super::DocumentStore;

// sled keeps its own default tree under this prefix.
const RESERVED_PREFIX: &str = "__sled";

/// Embedded document store: one sled tree per collection, documents stored as
/// JSON under a big-endian sequence key so iteration follows insertion order.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!(path = %path.display(), "opened document store");
        Ok(Self { db })
    }

    /// Throwaway store, removed when dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    // Does not create the collection; reads against a missing one see nothing.
    fn existing_tree(&self, collection: &str) -> StoreResult<Option<sled::Tree>> {
        validate_name(collection)?;
        let exists = self.db.tree_names().iter().any(|name| name.as_ref() == collection.as_bytes());
        if exists {
            Ok(Some(self.db.open_tree(collection)?))
        } else {
            Ok(None)
        }
    }
}

fn validate_name(collection: &str) -> StoreResult<()> {
    if collection.is_empty() || collection.starts_with(RESERVED_PREFIX) || collection.contains('\0') {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}

/// Put a 24-hex-digit `_id` first unless the document brought its own.
fn with_object_id(doc: Document, seq: u64) -> Document {
    if doc.contains_key("_id") {
        return doc;
    }
    let mut out = Map::with_capacity(doc.len() + 1);
    out.insert("_id".to_string(), Value::String(format!("{seq:024x}")));
    out.extend(doc);
    out
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .db
            .tree_names()
            .into_iter()
            .filter_map(|name| String::from_utf8(name.to_vec()).ok())
            .filter(|name| !name.starts_with(RESERVED_PREFIX))
            .collect();
        names.sort();
        Ok(names)
    }

    #[instrument(level = "debug", skip(self, query))]
    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let Some(tree) = self.existing_tree(collection)? else {
            return Ok(Vec::new());
        };

        let mut docs = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            let doc: Document = serde_json::from_slice(&bytes)?;
            if filter::matches(&doc, &query.filter)? {
                docs.push(doc);
            }
        }

        let options = &query.options;
        if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
            filter::sort_documents(&mut docs, sort)?;
        }
        if let Some(skip) = options.skip.filter(|s| *s > 0) {
            let skip = usize::try_from(skip).unwrap_or(usize::MAX).min(docs.len());
            docs.drain(..skip);
        }
        if let Some(limit) = options.limit.filter(|l| *l != 0) {
            docs.truncate(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX));
        }

        debug!(returned = docs.len(), "find complete");
        Ok(docs)
    }

    async fn count(&self, collection: &str) -> StoreResult<u64> {
        Ok(self.existing_tree(collection)?.map_or(0, |tree| tree.len() as u64))
    }

    #[instrument(level = "debug", skip(self, docs), fields(docs = docs.len()))]
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<usize> {
        validate_name(collection)?;
        let tree = self.db.open_tree(collection)?;
        let inserted = docs.len();
        for doc in docs {
            let seq = self.db.generate_id()?;
            let doc = with_object_id(doc, seq);
            tree.insert(seq.to_be_bytes(), serde_json::to_vec(&doc)?)?;
        }
        tree.flush_async().await?;
        Ok(inserted)
    }
}
