use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::LifecycleError;

/// Gateway-assigned payment identifier. Opaque: the format depends on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self, LifecycleError> {
        let id = id.into();
        validate("PaymentId", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway-assigned refund identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefundId(String);

impl RefundId {
    pub fn new(id: impl Into<String>) -> Result<Self, LifecycleError> {
        let id = id.into();
        validate("RefundId", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(kind: &str, id: &str) -> Result<(), LifecycleError> {
    if id.is_empty() || id.len() > 64 {
        return Err(LifecycleError::Validation(format!(
            "{kind} must be 1..=64 chars, got {} chars",
            id.len()
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LifecycleError::Validation(format!(
            "{kind} contains invalid characters: {id}"
        )));
    }
    Ok(())
}
