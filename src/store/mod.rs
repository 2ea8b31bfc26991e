//! # Document Store
//!
//! The abstract collection store the interpreter dispatches against,
//! plus the in-memory reference implementation used by tests, the
//! one-shot CLI and small deployments.

pub mod backend;
pub mod errors;
pub mod filter;
pub mod ident;
pub mod memory;
pub mod options;

pub use backend::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};
pub use errors::{StoreError, StoreResult};
pub use ident::DocId;
pub use memory::MemoryStore;
pub use options::FindOptions;
