//! # Result Envelope
//!
//! The uniform `{status, output}` response returned for every interpreted
//! command. Always fully populated; on failure `output` carries a
//! human-readable diagnostic, never a stack trace or raw store error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::InterpreterError;

/// Envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStatus {
    Pass,
    Fail,
}

/// The uniform result of an interpreted command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: EnvelopeStatus,
    pub output: Value,
}

impl ResultEnvelope {
    /// Successful envelope wrapping the operation output
    pub fn pass(output: Value) -> Self {
        Self {
            status: EnvelopeStatus::Pass,
            output,
        }
    }

    /// Failure envelope from an interpreter error.
    ///
    /// The text carries the error kind and message; the failing stage is
    /// available separately for logging.
    pub fn fail(err: &InterpreterError) -> Self {
        Self {
            status: EnvelopeStatus::Fail,
            output: Value::String(format!("{}: {}", err.kind(), err)),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == EnvelopeStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pass_envelope_serialization() {
        let envelope = ResultEnvelope::pass(json!([{"a": 1}]));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["status"], "Pass");
        assert_eq!(value["output"][0]["a"], 1);
    }

    #[test]
    fn test_fail_envelope_names_kind() {
        let err = InterpreterError::OperationNotSupported("shutdown".to_string());
        let envelope = ResultEnvelope::fail(&err);

        assert_eq!(envelope.status, EnvelopeStatus::Fail);
        let text = envelope.output.as_str().unwrap();
        assert!(text.starts_with("OperationNotSupported:"));
        assert!(text.contains("shutdown"));
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = ResultEnvelope::pass(json!({"count": 3}));
        let text = serde_json::to_string(&envelope).unwrap();
        let back: ResultEnvelope = serde_json::from_str(&text).unwrap();

        assert!(back.is_pass());
        assert_eq!(back.output["count"], 3);
    }
}
