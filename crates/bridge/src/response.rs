//! JSON envelope returned at the bridge boundary.

use crate::error::BridgeError;
use carbonchain_core::{ErrorKind, IdempotencyKey};
use serde::{Deserialize, Serialize};

/// Error half of a [`BridgeResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    /// Present when the write may have committed; resend the command with this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<IdempotencyKey>,
}

impl From<&BridgeError> for ErrorBody {
    fn from(err: &BridgeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            idempotency_key: err.idempotency_key(),
        }
    }
}

/// Serializes as `{"ok": value}` or `{"error": {"kind", "message", "retryable"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeResponse<T> {
    Ok(T),
    Error(ErrorBody),
}

impl<T> BridgeResponse<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, BridgeResponse::Ok(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            BridgeResponse::Ok(_) => None,
            BridgeResponse::Error(body) => Some(body.kind),
        }
    }
}

impl<T: Serialize> BridgeResponse<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T> From<crate::error::Result<T>> for BridgeResponse<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => BridgeResponse::Ok(value),
            Err(err) => BridgeResponse::Error(ErrorBody::from(&err)),
        }
    }
}
