//! # Dispatcher
//!
//! Drives a command through the full pipeline:
//! parse -> access check -> normalize -> arity/shape check -> store call,
//! and folds the outcome into the uniform envelope.
//!
//! Failures at any stage short-circuit; no state is re-entered. The store
//! call is never retried here; retries belong to the store collaborator.

use std::sync::Arc;

use serde_json::Value;

use crate::observability::Logger;
use crate::store::{DocumentStore, FindOptions};

use super::command::{self, ParsedCommand};
use super::envelope::ResultEnvelope;
use super::errors::{InterpreterError, InterpreterResult};
use super::literal;
use super::policy::{AccessPolicy, CallerContext};
use super::registry::{OperationCode, OperationRegistry, OperationSpec};

/// The command interpreter.
///
/// Holds the process-wide registry and policy plus the injected store
/// handle; safe to share across requests.
pub struct Interpreter {
    store: Arc<dyn DocumentStore>,
    registry: OperationRegistry,
    policy: AccessPolicy,
}

impl Interpreter {
    /// Build an interpreter over the given store.
    ///
    /// Validates the operation table; a misconfigured table panics here,
    /// at startup, never at request time.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            registry: OperationRegistry::new(),
            policy: AccessPolicy::new(),
        }
    }

    /// Interpret one raw command. Every call returns exactly one envelope.
    pub fn interpret(&self, raw: &str, ctx: &CallerContext) -> ResultEnvelope {
        Logger::trace("COMMAND_RECEIVED", &[("length", &raw.len().to_string())]);

        match self.run(raw, ctx) {
            Ok((parsed, output)) => {
                Logger::info(
                    "COMMAND_EXECUTED",
                    &[
                        ("collection", parsed.collection.as_str()),
                        ("operation", parsed.operation.as_str()),
                    ],
                );
                ResultEnvelope::pass(output)
            }
            Err(err) => {
                let event = if matches!(err, InterpreterError::AccessDenied(_)) {
                    "COMMAND_DENIED"
                } else {
                    "COMMAND_FAILED"
                };
                Logger::warn(event, &[("kind", err.kind()), ("stage", err.stage())]);
                ResultEnvelope::fail(&err)
            }
        }
    }

    fn run(&self, raw: &str, ctx: &CallerContext) -> InterpreterResult<(ParsedCommand, Value)> {
        let parsed = command::parse(raw)?;

        // The access gate runs before the literal is touched and before
        // resolution errors surface, so identity collections are denied
        // even for unknown operations.
        let spec = self.registry.lookup(&parsed.operation).ok();
        self.policy.check_access(&parsed.collection, spec, ctx)?;

        let args = literal::normalize_arguments(&parsed.argument_literal)?;
        let spec = spec.ok_or_else(|| {
            InterpreterError::OperationNotSupported(parsed.operation.clone())
        })?;
        check_arity(spec, &args)?;

        let output = self.dispatch(&parsed.collection, spec, args)?;
        Ok((parsed, output))
    }

    /// Invoke the store capability for the resolved operation.
    ///
    /// Multi-record reads are materialized before the envelope is built.
    fn dispatch(
        &self,
        collection: &str,
        spec: &'static OperationSpec,
        args: Vec<Value>,
    ) -> InterpreterResult<Value> {
        let store = self.store.as_ref();

        match spec.code {
            OperationCode::Find => {
                let options = match args.get(1) {
                    Some(value) => Some(
                        FindOptions::from_value(value)
                            .map_err(|err| argument_error(spec, 2, &err.to_string()))?,
                    ),
                    None => None,
                };
                let filter = filter_or_empty(&args, 0);
                let documents = store.find(collection, &filter, options.as_ref())?;
                Ok(Value::Array(documents))
            }
            OperationCode::FindOne => {
                let filter = filter_or_empty(&args, 0);
                Ok(store.find_one(collection, &filter)?.unwrap_or(Value::Null))
            }
            OperationCode::Count => {
                let count = store.count(collection, args.first())?;
                Ok(Value::from(count))
            }
            OperationCode::Distinct => {
                let field = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| argument_error(spec, 1, "expected a field name string"))?;
                let values = store.distinct(collection, field, args.get(1))?;
                Ok(Value::Array(values))
            }
            OperationCode::Aggregate => {
                let stages = args
                    .first()
                    .and_then(Value::as_array)
                    .ok_or_else(|| argument_error(spec, 1, "expected an array of stages"))?;
                let documents = store.aggregate(collection, stages)?;
                Ok(Value::Array(documents))
            }
            OperationCode::InsertOne => {
                let mut args = args.into_iter();
                let document = args.next().unwrap_or(Value::Null);
                let outcome = store.insert_one(collection, document)?;
                outcome_value(&outcome)
            }
            OperationCode::InsertMany => {
                let documents = match args.into_iter().next() {
                    Some(Value::Array(documents)) => documents,
                    _ => return Err(argument_error(spec, 1, "expected an array of documents")),
                };
                let outcome = store.insert_many(collection, documents)?;
                outcome_value(&outcome)
            }
            OperationCode::UpdateOne | OperationCode::UpdateMany => {
                let mut args = args.into_iter();
                let filter = args.next().unwrap_or(Value::Null);
                let update = args.next().unwrap_or(Value::Null);
                let outcome = if spec.code == OperationCode::UpdateOne {
                    store.update_one(collection, &filter, &update)?
                } else {
                    store.update_many(collection, &filter, &update)?
                };
                outcome_value(&outcome)
            }
            OperationCode::DeleteOne | OperationCode::DeleteMany => {
                let filter = filter_or_empty(&args, 0);
                let outcome = if spec.code == OperationCode::DeleteOne {
                    store.delete_one(collection, &filter)?
                } else {
                    store.delete_many(collection, &filter)?
                };
                outcome_value(&outcome)
            }
            OperationCode::Drop => {
                let dropped = store.drop_collection(collection)?;
                Ok(Value::Bool(dropped))
            }
            OperationCode::CreateIndex => {
                let index_spec = args.into_iter().next().unwrap_or(Value::Null);
                let name = store.create_index(collection, &index_spec)?;
                Ok(Value::String(name))
            }
            OperationCode::DropIndex => {
                let index_spec = args.into_iter().next().unwrap_or(Value::Null);
                store.drop_index(collection, &index_spec)?;
                Ok(Value::Bool(true))
            }
        }
    }
}

/// Check argument count and per-slot shapes against the registry contract
fn check_arity(spec: &'static OperationSpec, args: &[Value]) -> InterpreterResult<()> {
    if args.len() < spec.min_args || args.len() > spec.max_args {
        return Err(InterpreterError::ArityMismatch {
            operation: spec.name,
            expected: spec.expected_arity(),
            actual: args.len(),
        });
    }

    for (i, arg) in args.iter().enumerate() {
        let kind = &spec.kinds[i];
        if !kind.admits(arg) {
            return Err(argument_error(
                spec,
                i + 1,
                &format!("expected {}", kind.expected()),
            ));
        }
    }
    Ok(())
}

fn argument_error(spec: &OperationSpec, index: usize, reason: &str) -> InterpreterError {
    InterpreterError::InvalidLiteral {
        position: None,
        reason: format!("argument {} of {}: {}", index, spec.name, reason),
    }
}

/// Optional filter argument, defaulting to match-all
fn filter_or_empty(args: &[Value], index: usize) -> Value {
    args.get(index)
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

fn outcome_value<T: serde::Serialize>(outcome: &T) -> InterpreterResult<Value> {
    serde_json::to_value(outcome).map_err(|err| InterpreterError::StoreFailure(err.to_string()))
}
