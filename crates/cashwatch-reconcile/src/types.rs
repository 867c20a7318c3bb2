//! Record types and identity.

use cashwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Cashtag placeholder the agent emits for tokens mentioned without a ticker.
pub const UNKNOWN_CASHTAG: &str = "unknown_cashtag";

/// Timestamp given to stored entries written before timestamps existed.
pub const UNRECORDED_TIMESTAMP: &str = "unknown";

/// A single observation parsed from the agent's output. Not yet timestamped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub cashtag: Option<String>,
    pub contract_address: Option<String>,
}

impl Candidate {
    pub fn new(cashtag: Option<&str>, contract_address: Option<&str>) -> Self {
        Self {
            cashtag: cashtag.map(str::to_string),
            contract_address: contract_address.map(str::to_string),
        }
    }

    /// Both identity fields absent. Such observations carry no information.
    pub fn is_noise(&self) -> bool {
        self.cashtag.is_none() && self.contract_address.is_none()
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            cashtag: self.cashtag.clone(),
            contract_address: self.contract_address.clone(),
        }
    }

    /// Convert one element of the agent's JSON array.
    ///
    /// The element must be an object whose `cashtag` and `contract_address`
    /// are strings or null. A missing key reads as null, but an object with
    /// neither key is rejected as malformed.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Parse(format!("expected object, got {}", value)))?;

        if !obj.contains_key("cashtag") && !obj.contains_key("contract_address") {
            return Err(Error::Parse(
                "object has neither cashtag nor contract_address".into(),
            ));
        }

        Ok(Self {
            cashtag: optional_string(obj.get("cashtag"), "cashtag")?,
            contract_address: optional_string(obj.get("contract_address"), "contract_address")?,
        })
    }
}

fn optional_string(value: Option<&serde_json::Value>, field: &str) -> Result<Option<String>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::Parse(format!(
            "{} must be a string or null, got {}",
            field, other
        ))),
    }
}

/// A persisted record. Field order here is the on-disk field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub cashtag: Option<String>,
    pub contract_address: Option<String>,
    /// First-observation time. Never rewritten once persisted.
    pub timestamp: String,
}

impl Record {
    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            cashtag: self.cashtag.clone(),
            contract_address: self.contract_address.clone(),
        }
    }

    pub fn is_noise(&self) -> bool {
        self.cashtag.is_none() && self.contract_address.is_none()
    }

    pub fn from_candidate(candidate: &Candidate, timestamp: &str) -> Self {
        Self {
            cashtag: candidate.cashtag.clone(),
            contract_address: candidate.contract_address.clone(),
            timestamp: timestamp.to_string(),
        }
    }

    /// Convert one element of the stored JSON array.
    ///
    /// Identity fields follow [`Candidate::from_value`]. A missing or null
    /// `timestamp` becomes [`UNRECORDED_TIMESTAMP`].
    pub fn from_stored(value: &serde_json::Value) -> Result<Self> {
        let candidate = Candidate::from_value(value)?;
        let timestamp = match value.get("timestamp") {
            None | Some(serde_json::Value::Null) => UNRECORDED_TIMESTAMP.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(Error::Parse(format!(
                    "timestamp must be a string, got {}",
                    other
                )))
            }
        };
        Ok(Self::from_candidate(&candidate, &timestamp))
    }
}

/// Deduplication key: exact equality on both fields, absence included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub cashtag: Option<String>,
    pub contract_address: Option<String>,
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})",
            self.cashtag.as_deref().unwrap_or("null"),
            self.contract_address.as_deref().unwrap_or("null")
        )
    }
}
