pub mod filter;
pub mod sled_store;
pub mod types;

pub use sled_store::SledStore;
pub use types::*;

use async_trait::async_trait;

/// Collection-of-JSON-documents storage behind the passthrough API.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collections(&self) -> StoreResult<Vec<String>>;
    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>>;
    async fn count(&self, collection: &str) -> StoreResult<u64>;
    /// Returns how many documents were written.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<usize>;
}
