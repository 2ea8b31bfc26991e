//! # Find Options
//!
//! Result-shaping options for read operations: sort, skip, limit and
//! projection, parsed from the shell-style options object
//! (`{sort: {age: -1}, limit: 10, skip: 5, projection: {name: 1}}`).

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::filter::{compare_values, lookup_path};

/// Sort key: field path plus direction
#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

/// Projection mode over a field list
#[derive(Debug, Clone)]
pub enum Projection {
    /// Keep only the listed fields (plus `_id` unless suppressed)
    Include { fields: Vec<String>, with_id: bool },
    /// Drop the listed fields
    Exclude { fields: Vec<String> },
}

/// Parsed find options
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: usize,
    pub limit: Option<usize>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    /// Parse an options object. Unknown keys are rejected so typos fail
    /// loudly instead of silently returning unshaped results.
    pub fn from_value(value: &Value) -> StoreResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            StoreError::InvalidArgument("options must be an object".to_string())
        })?;

        let mut options = FindOptions::default();
        for (key, val) in obj {
            match key.as_str() {
                "sort" => options.sort = parse_sort(val)?,
                "skip" => options.skip = parse_count(val, "skip")?,
                "limit" => options.limit = Some(parse_count(val, "limit")?),
                "projection" => options.projection = Some(parse_projection(val)?),
                other => {
                    return Err(StoreError::InvalidArgument(format!(
                        "unknown option '{}'",
                        other
                    )));
                }
            }
        }
        Ok(options)
    }

    /// Shape a materialized result set
    pub fn apply(&self, mut records: Vec<Value>) -> Vec<Value> {
        if !self.sort.is_empty() {
            sort_documents(&mut records, &self.sort);
        }

        let records: Vec<Value> = records
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        match &self.projection {
            None => records,
            Some(projection) => records
                .into_iter()
                .map(|r| project_document(r, projection))
                .collect(),
        }
    }
}

/// Stable multi-key document sort
pub fn sort_documents(records: &mut [Value], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        for key in keys {
            let ord = match (lookup_path(a, &key.field), lookup_path(b, &key.field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// `{field: 1 | -1, ...}` in declaration order
pub fn parse_sort(value: &Value) -> StoreResult<Vec<SortKey>> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::InvalidArgument("'sort' must be an object".to_string()))?;

    let mut keys = Vec::with_capacity(obj.len());
    for (field, direction) in obj {
        let ascending = match direction.as_i64() {
            Some(1) => true,
            Some(-1) => false,
            _ => {
                return Err(StoreError::InvalidArgument(format!(
                    "sort direction for '{}' must be 1 or -1",
                    field
                )));
            }
        };
        keys.push(SortKey {
            field: field.clone(),
            ascending,
        });
    }
    Ok(keys)
}

fn parse_count(value: &Value, name: &str) -> StoreResult<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| {
            StoreError::InvalidArgument(format!("'{}' must be a non-negative integer", name))
        })
}

/// `{field: 1}` inclusion or `{field: 0}` exclusion; mixing is rejected
/// except for suppressing `_id` alongside inclusions.
fn parse_projection(value: &Value) -> StoreResult<Projection> {
    let obj = value.as_object().ok_or_else(|| {
        StoreError::InvalidArgument("'projection' must be an object".to_string())
    })?;
    if obj.is_empty() {
        return Err(StoreError::InvalidArgument(
            "'projection' must not be empty".to_string(),
        ));
    }

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    let mut with_id = true;
    for (field, flag) in obj {
        let keep = match flag.as_i64() {
            Some(1) => true,
            Some(0) => false,
            _ => match flag.as_bool() {
                Some(b) => b,
                None => {
                    return Err(StoreError::InvalidArgument(format!(
                        "projection flag for '{}' must be 0 or 1",
                        field
                    )));
                }
            },
        };
        if field == "_id" {
            with_id = keep;
        } else if keep {
            included.push(field.clone());
        } else {
            excluded.push(field.clone());
        }
    }

    match (included.is_empty(), excluded.is_empty()) {
        (false, true) => Ok(Projection::Include {
            fields: included,
            with_id,
        }),
        (true, false) => Ok(Projection::Exclude { fields: excluded }),
        (true, true) => Ok(Projection::Include {
            // Only `_id` was mentioned
            fields: Vec::new(),
            with_id,
        }),
        (false, false) => Err(StoreError::InvalidArgument(
            "projection cannot mix inclusion and exclusion".to_string(),
        )),
    }
}

fn project_document(record: Value, projection: &Projection) -> Value {
    let Value::Object(obj) = record else {
        return record;
    };

    let filtered: serde_json::Map<String, Value> = match projection {
        Projection::Include { fields, with_id } => obj
            .into_iter()
            .filter(|(k, _)| fields.contains(k) || (*with_id && k == "_id"))
            .collect(),
        Projection::Exclude { fields } => obj
            .into_iter()
            .filter(|(k, _)| !fields.contains(k))
            .collect(),
    };
    Value::Object(filtered)
}
