//! # In-Memory Document Store
//!
//! Reference `DocumentStore` backed by a `RwLock`ed map of collections.
//! Serves tests, the one-shot CLI and small deployments; a networked
//! store implements the same trait without touching the interpreter.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::backend::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};
use super::errors::{StoreError, StoreResult};
use super::filter;
use super::ident::DocId;
use super::options::{parse_sort, sort_documents, FindOptions};

/// A named index registration. Indexes are declarative here; lookups
/// always scan.
#[derive(Debug, Clone)]
struct IndexDef {
    name: String,
    spec: Value,
}

#[derive(Debug, Default)]
struct CollectionData {
    documents: Vec<Value>,
    indexes: Vec<IndexDef>,
}

/// In-memory store: collection name -> ordered documents + indexes
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, CollectionData>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, CollectionData>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }

    fn matching(&self, collection: &str, filter_doc: &Value) -> StoreResult<Vec<Value>> {
        let data = self.read()?;
        let documents = data
            .get(collection)
            .map(|c| c.documents.as_slice())
            .unwrap_or_default();

        let mut matched = Vec::new();
        for doc in documents {
            if filter::matches(doc, filter_doc)? {
                matched.push(doc.clone());
            }
        }
        Ok(matched)
    }
}

/// Give the document an `_id` if it lacks one; documents must be objects
fn prepare_document(mut document: Value) -> StoreResult<(Value, Value)> {
    let obj = document.as_object_mut().ok_or_else(|| {
        StoreError::InvalidArgument("documents must be objects".to_string())
    })?;

    let id = match obj.get("_id") {
        Some(existing) => existing.clone(),
        None => {
            let id = DocId::generate().to_value();
            obj.insert("_id".to_string(), id.clone());
            id
        }
    };
    Ok((document, id))
}

/// Apply an update document; true if the document changed.
///
/// Update documents are either a full replacement (no `$` keys, `_id`
/// preserved) or a pure operator set (`$set`/`$unset`/`$inc`/`$push`).
fn apply_update(doc: &mut Value, update: &Value) -> StoreResult<bool> {
    let update_obj = update
        .as_object()
        .ok_or_else(|| StoreError::InvalidArgument("update must be an object".to_string()))?;

    let has_operators = update_obj.keys().any(|k| k.starts_with('$'));
    if !has_operators {
        // Replacement document; `_id` is immutable
        let mut replacement = update.clone();
        if let (Some(new_obj), Some(old_id)) =
            (replacement.as_object_mut(), doc.get("_id").cloned())
        {
            new_obj.insert("_id".to_string(), old_id);
        }
        let changed = *doc != replacement;
        *doc = replacement;
        return Ok(changed);
    }

    let before = doc.clone();
    for (op, operand) in update_obj {
        let fields = operand.as_object().ok_or_else(|| {
            StoreError::InvalidArgument(format!("'{}' expects an object", op))
        })?;

        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(doc, path, value.clone())?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    remove_path(doc, path);
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let delta = delta.as_f64().ok_or_else(|| {
                        StoreError::InvalidArgument("'$inc' expects a number".to_string())
                    })?;
                    let current = match filter::lookup_path(doc, path) {
                        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                        Some(_) => {
                            return Err(StoreError::InvalidArgument(format!(
                                "'$inc' target '{}' is not a number",
                                path
                            )));
                        }
                        None => 0.0,
                    };
                    let next = current + delta;
                    let next = if next.fract() == 0.0
                        && next.abs() < i64::MAX as f64
                    {
                        Value::from(next as i64)
                    } else {
                        serde_json::Number::from_f64(next)
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    };
                    set_path(doc, path, next)?;
                }
            }
            "$push" => {
                for (path, value) in fields {
                    match filter::lookup_path(doc, path) {
                        Some(Value::Array(_)) => {
                            if let Some(Value::Array(items)) = lookup_path_mut(doc, path) {
                                items.push(value.clone());
                            }
                        }
                        Some(_) => {
                            return Err(StoreError::InvalidArgument(format!(
                                "'$push' target '{}' is not an array",
                                path
                            )));
                        }
                        None => {
                            set_path(doc, path, Value::Array(vec![value.clone()]))?;
                        }
                    }
                }
            }
            other => {
                return Err(StoreError::InvalidArgument(format!(
                    "unknown update operator '{}'",
                    other
                )));
            }
        }
    }

    Ok(*doc != before)
}

/// Set a dotted path, creating intermediate objects
fn set_path(doc: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    let mut current = doc;
    let segments: Vec<&str> = path.split('.').collect();

    for (i, segment) in segments.iter().enumerate() {
        let obj = current.as_object_mut().ok_or_else(|| {
            StoreError::InvalidArgument(format!(
                "cannot set '{}' through a non-object value",
                path
            ))
        })?;

        if i == segments.len() - 1 {
            obj.insert(segment.to_string(), value);
            return Ok(());
        }
        current = obj
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    Ok(())
}

/// Remove a dotted path; missing segments are a no-op
fn remove_path(doc: &mut Value, path: &str) {
    let mut current = doc;
    let segments: Vec<&str> = path.split('.').collect();

    for (i, segment) in segments.iter().enumerate() {
        let Some(obj) = current.as_object_mut() else {
            return;
        };
        if i == segments.len() - 1 {
            obj.remove(*segment);
            return;
        }
        match obj.get_mut(*segment) {
            Some(next) => current = next,
            None => return,
        }
    }
}

fn lookup_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Mongo-style index name: `age_1_name_-1`
fn index_name(spec: &Value) -> StoreResult<String> {
    let keys = parse_sort(spec)
        .map_err(|_| StoreError::InvalidArgument("index spec must map fields to 1 or -1".to_string()))?;
    if keys.is_empty() {
        return Err(StoreError::InvalidArgument(
            "index spec must not be empty".to_string(),
        ));
    }
    Ok(keys
        .iter()
        .map(|k| format!("{}_{}", k.field, if k.ascending { "1" } else { "-1" }))
        .collect::<Vec<_>>()
        .join("_"))
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter_doc: &Value,
        options: Option<&FindOptions>,
    ) -> StoreResult<Vec<Value>> {
        let matched = self.matching(collection, filter_doc)?;
        Ok(match options {
            Some(options) => options.apply(matched),
            None => matched,
        })
    }

    fn find_one(&self, collection: &str, filter_doc: &Value) -> StoreResult<Option<Value>> {
        let data = self.read()?;
        let documents = data
            .get(collection)
            .map(|c| c.documents.as_slice())
            .unwrap_or_default();

        for doc in documents {
            if filter::matches(doc, filter_doc)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    fn insert_one(&self, collection: &str, document: Value) -> StoreResult<InsertOutcome> {
        let (document, id) = prepare_document(document)?;
        let mut data = self.write()?;
        data.entry(collection.to_string())
            .or_default()
            .documents
            .push(document);
        Ok(InsertOutcome {
            inserted_ids: vec![id],
        })
    }

    fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<InsertOutcome> {
        if documents.is_empty() {
            return Err(StoreError::InvalidArgument(
                "insertMany expects at least one document".to_string(),
            ));
        }

        let mut prepared = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let (document, id) = prepare_document(document)?;
            prepared.push(document);
            ids.push(id);
        }

        let mut data = self.write()?;
        data.entry(collection.to_string())
            .or_default()
            .documents
            .append(&mut prepared);
        Ok(InsertOutcome { inserted_ids: ids })
    }

    fn update_one(
        &self,
        collection: &str,
        filter_doc: &Value,
        update: &Value,
    ) -> StoreResult<UpdateOutcome> {
        let mut data = self.write()?;
        let Some(coll) = data.get_mut(collection) else {
            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
            });
        };

        for doc in coll.documents.iter_mut() {
            if filter::matches(doc, filter_doc)? {
                let modified = apply_update(doc, update)?;
                return Ok(UpdateOutcome {
                    matched: 1,
                    modified: modified as u64,
                });
            }
        }
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter_doc: &Value,
        update: &Value,
    ) -> StoreResult<UpdateOutcome> {
        let mut data = self.write()?;
        let Some(coll) = data.get_mut(collection) else {
            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
            });
        };

        let mut outcome = UpdateOutcome {
            matched: 0,
            modified: 0,
        };
        for doc in coll.documents.iter_mut() {
            if filter::matches(doc, filter_doc)? {
                outcome.matched += 1;
                outcome.modified += apply_update(doc, update)? as u64;
            }
        }
        Ok(outcome)
    }

    fn delete_one(&self, collection: &str, filter_doc: &Value) -> StoreResult<DeleteOutcome> {
        let mut data = self.write()?;
        let Some(coll) = data.get_mut(collection) else {
            return Ok(DeleteOutcome { deleted: 0 });
        };

        let mut position = None;
        for (i, doc) in coll.documents.iter().enumerate() {
            if filter::matches(doc, filter_doc)? {
                position = Some(i);
                break;
            }
        }
        match position {
            Some(i) => {
                coll.documents.remove(i);
                Ok(DeleteOutcome { deleted: 1 })
            }
            None => Ok(DeleteOutcome { deleted: 0 }),
        }
    }

    fn delete_many(&self, collection: &str, filter_doc: &Value) -> StoreResult<DeleteOutcome> {
        let mut data = self.write()?;
        let Some(coll) = data.get_mut(collection) else {
            return Ok(DeleteOutcome { deleted: 0 });
        };

        let mut kept = Vec::with_capacity(coll.documents.len());
        let mut deleted = 0;
        for doc in coll.documents.drain(..) {
            if filter::matches(&doc, filter_doc)? {
                deleted += 1;
            } else {
                kept.push(doc);
            }
        }
        coll.documents = kept;
        Ok(DeleteOutcome { deleted })
    }

    fn count(&self, collection: &str, filter_doc: Option<&Value>) -> StoreResult<u64> {
        let empty = Value::Object(serde_json::Map::new());
        let matched = self.matching(collection, filter_doc.unwrap_or(&empty))?;
        Ok(matched.len() as u64)
    }

    fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter_doc: Option<&Value>,
    ) -> StoreResult<Vec<Value>> {
        let empty = Value::Object(serde_json::Map::new());
        let matched = self.matching(collection, filter_doc.unwrap_or(&empty))?;

        let mut seen = Vec::new();
        for doc in &matched {
            let Some(value) = filter::lookup_path(doc, field) else {
                continue;
            };
            // Array fields contribute their elements, like store shells do
            let candidates: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for candidate in candidates {
                if !seen.contains(candidate) {
                    seen.push(candidate.clone());
                }
            }
        }
        Ok(seen)
    }

    fn aggregate(&self, collection: &str, stages: &[Value]) -> StoreResult<Vec<Value>> {
        let empty = Value::Object(serde_json::Map::new());
        let mut documents = self.matching(collection, &empty)?;

        for stage in stages {
            let obj = stage.as_object().filter(|o| o.len() == 1).ok_or_else(|| {
                StoreError::InvalidArgument(
                    "each pipeline stage must be a single-key object".to_string(),
                )
            })?;
            let (name, operand) = obj.iter().next().ok_or_else(|| {
                StoreError::Internal("empty pipeline stage".to_string())
            })?;

            match name.as_str() {
                "$match" => {
                    let mut kept = Vec::with_capacity(documents.len());
                    for doc in documents {
                        if filter::matches(&doc, operand)? {
                            kept.push(doc);
                        }
                    }
                    documents = kept;
                }
                "$sort" => {
                    let keys = parse_sort(operand)?;
                    sort_documents(&mut documents, &keys);
                }
                "$skip" => {
                    let n = operand.as_u64().ok_or_else(|| {
                        StoreError::InvalidArgument("'$skip' expects a non-negative integer".to_string())
                    })? as usize;
                    documents = documents.into_iter().skip(n).collect();
                }
                "$limit" => {
                    let n = operand.as_u64().ok_or_else(|| {
                        StoreError::InvalidArgument("'$limit' expects a non-negative integer".to_string())
                    })? as usize;
                    documents.truncate(n);
                }
                "$count" => {
                    let label = operand.as_str().ok_or_else(|| {
                        StoreError::InvalidArgument("'$count' expects a field name".to_string())
                    })?;
                    let mut result = serde_json::Map::with_capacity(1);
                    result.insert(label.to_string(), Value::from(documents.len() as u64));
                    documents = vec![Value::Object(result)];
                }
                other => {
                    return Err(StoreError::InvalidArgument(format!(
                        "unsupported pipeline stage '{}'",
                        other
                    )));
                }
            }
        }
        Ok(documents)
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<bool> {
        let mut data = self.write()?;
        Ok(data.remove(collection).is_some())
    }

    fn create_index(&self, collection: &str, spec: &Value) -> StoreResult<String> {
        let name = index_name(spec)?;
        let mut data = self.write()?;
        let coll = data.entry(collection.to_string()).or_default();

        if let Some(existing) = coll.indexes.iter().find(|i| i.name == name) {
            if &existing.spec != spec {
                return Err(StoreError::InvalidArgument(format!(
                    "index '{}' already exists with a different spec",
                    name
                )));
            }
            return Ok(name);
        }

        coll.indexes.push(IndexDef {
            name: name.clone(),
            spec: spec.clone(),
        });
        Ok(name)
    }

    fn drop_index(&self, collection: &str, spec: &Value) -> StoreResult<()> {
        let name = match spec {
            Value::String(name) => name.clone(),
            other => index_name(other)?,
        };

        let mut data = self.write()?;
        let coll = data
            .get_mut(collection)
            .ok_or_else(|| StoreError::IndexNotFound(name.clone()))?;

        let before = coll.indexes.len();
        coll.indexes.retain(|i| i.name != name);
        if coll.indexes.len() == before {
            return Err(StoreError::IndexNotFound(name));
        }
        Ok(())
    }
}
