//! # Document Store Backend
//!
//! The abstract store the interpreter dispatches against. Implementations
//! own connectivity, timeouts and retries; callers get materialized
//! results, never partially-consumed cursors.

use serde_json::Value;

use super::errors::StoreResult;
use super::options::FindOptions;

/// Outcome of an insert operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct InsertOutcome {
    /// Identifiers assigned to the inserted documents, in input order
    pub inserted_ids: Vec<Value>,
}

/// Outcome of an update operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Outcome of a delete operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

/// Abstract document collection store.
///
/// Object-safe and synchronous; shared behind an `Arc` by all requests.
pub trait DocumentStore: Send + Sync {
    /// Find documents matching `filter`, with optional result shaping
    fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: Option<&FindOptions>,
    ) -> StoreResult<Vec<Value>>;

    /// First document matching `filter`, if any
    fn find_one(&self, collection: &str, filter: &Value) -> StoreResult<Option<Value>>;

    fn insert_one(&self, collection: &str, document: Value) -> StoreResult<InsertOutcome>;

    fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<InsertOutcome>;

    fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> StoreResult<UpdateOutcome>;

    fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> StoreResult<UpdateOutcome>;

    fn delete_one(&self, collection: &str, filter: &Value) -> StoreResult<DeleteOutcome>;

    fn delete_many(&self, collection: &str, filter: &Value) -> StoreResult<DeleteOutcome>;

    fn count(&self, collection: &str, filter: Option<&Value>) -> StoreResult<u64>;

    /// Distinct values of `field` across matching documents
    fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Option<&Value>,
    ) -> StoreResult<Vec<Value>>;

    /// Run an aggregation pipeline, returning the materialized result
    fn aggregate(&self, collection: &str, stages: &[Value]) -> StoreResult<Vec<Value>>;

    /// Drop a collection; true if it existed
    fn drop_collection(&self, collection: &str) -> StoreResult<bool>;

    /// Register an index, returning its name
    fn create_index(&self, collection: &str, spec: &Value) -> StoreResult<String>;

    /// Remove an index by name or by its spec object
    fn drop_index(&self, collection: &str, spec: &Value) -> StoreResult<()>;
}
