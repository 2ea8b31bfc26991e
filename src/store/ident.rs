//! # Opaque Document Identifiers
//!
//! Store-assigned identifiers in their 24-hex-digit string form.
//!
//! A `DocId` is semantically opaque: ordered and equality-comparable,
//! never arithmetic. Inside document data it is carried as the single-key
//! object `{"$oid": "<24 hex>"}` so it round-trips losslessly through
//! `serde_json::Value` and never compares equal to a plain string of the
//! same characters.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::StoreError;

/// Wire key used for the tagged representation
pub const OID_KEY: &str = "$oid";

/// An opaque 24-hex-digit document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(String);

impl DocId {
    /// Wrap an existing identifier string.
    ///
    /// Fails unless the input is exactly 24 hex digits.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        if is_doc_id_hex(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(StoreError::InvalidArgument(format!(
                "'{}' is not a valid document identifier",
                s
            )))
        }
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut hex = String::with_capacity(24);
        for b in bytes {
            hex.push_str(&format!("{:02x}", b));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tagged JSON representation: `{"$oid": "..."}`
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(OID_KEY.to_string(), Value::String(self.0.clone()));
        Value::Object(map)
    }

    /// Recover an identifier from its tagged representation
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        let raw = obj.get(OID_KEY)?.as_str()?;
        Self::parse(raw).ok()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True if `s` is exactly 24 hex digits (either case)
pub fn is_doc_id_hex(s: &str) -> bool {
    s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit())
}
