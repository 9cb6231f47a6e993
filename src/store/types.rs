use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: always a JSON object.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Backend(#[from] sled::Error),
    #[error("document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Cursor modifiers. Zero or absent `limit` / `skip` mean "not set".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindOptions {
    #[serde(default)]
    pub sort: Option<Document>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Document,
    pub options: FindOptions,
}

impl FindQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: Document) -> Self {
        Self { filter, options: FindOptions::default() }
    }
}
