//! # Operation Registry
//!
//! The closed whitelist of document-store operations.
//!
//! Every command routes through a statically known `OperationSpec`; there
//! is no dynamic method dispatch and no default handler, so operations
//! absent from the table fail closed with `OperationNotSupported`.

use super::errors::{InterpreterError, InterpreterResult};

/// Statically known operation variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    Find,
    FindOne,
    Count,
    Distinct,
    Aggregate,
    InsertOne,
    InsertMany,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    Drop,
    CreateIndex,
    DropIndex,
}

/// Broad capability class, used by the access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// find/findOne/count/distinct/aggregate
    Read,
    /// insert/update/delete
    Mutation,
    /// drop/createIndex/dropIndex
    Admin,
}

/// Kinds of positional arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Query filter object
    Filter,
    /// A single document
    Document,
    /// An array of documents
    DocumentList,
    /// Update specification (`$set`-style operators or replacement)
    Update,
    /// Options object (limit/skip/sort/projection)
    Options,
    /// A field name string
    FieldName,
    /// Aggregation pipeline (array of stages)
    Pipeline,
    /// Index specification object
    IndexSpec,
}

impl ArgKind {
    /// Whether a normalized value has the right shape for this slot
    pub fn admits(&self, value: &serde_json::Value) -> bool {
        match self {
            ArgKind::Filter | ArgKind::Document | ArgKind::Update | ArgKind::Options => {
                value.is_object()
            }
            ArgKind::DocumentList | ArgKind::Pipeline => value.is_array(),
            ArgKind::FieldName => value.is_string(),
            // Index specs are `{field: 1}` objects, or a name string when
            // dropping
            ArgKind::IndexSpec => value.is_object() || value.is_string(),
        }
    }

    /// Shape description for diagnostics
    pub fn expected(&self) -> &'static str {
        match self {
            ArgKind::Filter => "a filter object",
            ArgKind::Document => "a document object",
            ArgKind::DocumentList => "an array of documents",
            ArgKind::Update => "an update object",
            ArgKind::Options => "an options object",
            ArgKind::FieldName => "a field name string",
            ArgKind::Pipeline => "an array of pipeline stages",
            ArgKind::IndexSpec => "an index spec object or name",
        }
    }
}

/// Static registry entry: arity and argument shape contract
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    /// Canonical (display) name
    pub name: &'static str,
    pub code: OperationCode,
    pub class: OperationClass,
    pub min_args: usize,
    pub max_args: usize,
    /// Kind of each positional slot, `kinds[i]` for argument `i`
    pub kinds: &'static [ArgKind],
}

impl OperationSpec {
    /// Human-readable arity range for diagnostics
    pub fn expected_arity(&self) -> String {
        if self.min_args == self.max_args {
            format!("exactly {}", self.min_args)
        } else {
            format!("{} to {}", self.min_args, self.max_args)
        }
    }
}

/// The fixed operation table. Defined once at process start, immutable,
/// shared by all requests.
const OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "find",
        code: OperationCode::Find,
        class: OperationClass::Read,
        min_args: 0,
        max_args: 2,
        kinds: &[ArgKind::Filter, ArgKind::Options],
    },
    OperationSpec {
        name: "findOne",
        code: OperationCode::FindOne,
        class: OperationClass::Read,
        min_args: 0,
        max_args: 1,
        kinds: &[ArgKind::Filter],
    },
    OperationSpec {
        name: "count",
        code: OperationCode::Count,
        class: OperationClass::Read,
        min_args: 0,
        max_args: 1,
        kinds: &[ArgKind::Filter],
    },
    OperationSpec {
        name: "distinct",
        code: OperationCode::Distinct,
        class: OperationClass::Read,
        min_args: 1,
        max_args: 2,
        kinds: &[ArgKind::FieldName, ArgKind::Filter],
    },
    OperationSpec {
        name: "aggregate",
        code: OperationCode::Aggregate,
        class: OperationClass::Read,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::Pipeline],
    },
    OperationSpec {
        name: "insertOne",
        code: OperationCode::InsertOne,
        class: OperationClass::Mutation,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::Document],
    },
    OperationSpec {
        name: "insertMany",
        code: OperationCode::InsertMany,
        class: OperationClass::Mutation,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::DocumentList],
    },
    OperationSpec {
        name: "updateOne",
        code: OperationCode::UpdateOne,
        class: OperationClass::Mutation,
        min_args: 2,
        max_args: 2,
        kinds: &[ArgKind::Filter, ArgKind::Update],
    },
    OperationSpec {
        name: "updateMany",
        code: OperationCode::UpdateMany,
        class: OperationClass::Mutation,
        min_args: 2,
        max_args: 2,
        kinds: &[ArgKind::Filter, ArgKind::Update],
    },
    OperationSpec {
        name: "deleteOne",
        code: OperationCode::DeleteOne,
        class: OperationClass::Mutation,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::Filter],
    },
    OperationSpec {
        name: "deleteMany",
        code: OperationCode::DeleteMany,
        class: OperationClass::Mutation,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::Filter],
    },
    OperationSpec {
        name: "drop",
        code: OperationCode::Drop,
        class: OperationClass::Admin,
        min_args: 0,
        max_args: 0,
        kinds: &[],
    },
    OperationSpec {
        name: "createIndex",
        code: OperationCode::CreateIndex,
        class: OperationClass::Admin,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::IndexSpec],
    },
    OperationSpec {
        name: "dropIndex",
        code: OperationCode::DropIndex,
        class: OperationClass::Admin,
        min_args: 1,
        max_args: 1,
        kinds: &[ArgKind::IndexSpec],
    },
];

/// Read-only lookup over the operation table
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationRegistry;

impl OperationRegistry {
    /// Build the registry, validating the table.
    ///
    /// A malformed entry (arity range inverted, or fewer declared argument
    /// kinds than `max_args`) is a programming error and panics here at
    /// startup, never at request time.
    pub fn new() -> Self {
        for spec in OPERATIONS {
            assert!(
                spec.min_args <= spec.max_args && spec.kinds.len() == spec.max_args,
                "operation table entry '{}' is malformed",
                spec.name
            );
        }
        Self
    }

    /// Look up an operation by its lower-cased name
    pub fn lookup(&self, operation: &str) -> InterpreterResult<&'static OperationSpec> {
        OPERATIONS
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(operation))
            .ok_or_else(|| InterpreterError::OperationNotSupported(operation.to_string()))
    }
}
