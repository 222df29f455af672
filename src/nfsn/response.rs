//! Provider response decoding.
//!
//! The API answers with an object, an array of objects, or nothing at all, and
//! reports application failures as an `error`/`debug` pair inside an otherwise
//! successful response. [`ApiResponse`] makes those shapes explicit.

use crate::error::{NfsnError, Result};
use crate::record::ResourceRecord;
use serde_json::{Map, Value};

/// Decoded provider response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Empty body, `null`, `[]` or `{}`.
    Empty,
    /// Embedded application error.
    Error { code: String, debug: Option<String> },
    /// Non-empty array of objects.
    List(Vec<Value>),
    /// Single object.
    Object(Map<String, Value>),
}

impl ApiResponse {
    /// Decode a raw response body. Only non-empty bodies are parsed as JSON.
    pub fn from_body(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(ApiResponse::Empty);
        }
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ApiResponse::Empty),
            Value::String(s) if s.is_empty() => Ok(ApiResponse::Empty),
            Value::Array(items) if items.is_empty() => Ok(ApiResponse::Empty),
            Value::Object(map) if map.is_empty() => Ok(ApiResponse::Empty),
            Value::Array(items) => match items.first().and_then(error_payload) {
                Some((code, debug)) => Ok(ApiResponse::Error { code, debug }),
                None => Ok(ApiResponse::List(items)),
            },
            Value::Object(map) => match error_payload_in(&map) {
                Some((code, debug)) => Ok(ApiResponse::Error { code, debug }),
                None => Ok(ApiResponse::Object(map)),
            },
            other => Err(NfsnError::Parse(format!(
                "unexpected response shape: {}",
                other
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ApiResponse::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ApiResponse::Error { .. })
    }

    /// Report an embedded application error on the log without failing.
    ///
    /// "No record" is an empty list, not an error, so callers decide from the
    /// response shape what happened.
    pub fn validate(&self) {
        match self {
            ApiResponse::Empty => tracing::debug!("Empty response received"),
            ApiResponse::Error { code, debug: detail } => {
                tracing::error!(
                    code = %code,
                    debug = detail.as_deref().unwrap_or(""),
                    "Provider reported an application error"
                );
            }
            ApiResponse::List(_) | ApiResponse::Object(_) => {}
        }
    }

    /// Escalate an embedded application error into [`NfsnError::Application`].
    pub fn into_result(self) -> Result<Self> {
        match self {
            ApiResponse::Error { code, debug } => Err(NfsnError::Application { code, debug }),
            other => Ok(other),
        }
    }

    /// Resource records carried by the response. A single object is one
    /// record; empty and error responses yield none.
    pub fn records(&self) -> Result<Vec<ResourceRecord>> {
        match self {
            ApiResponse::List(items) => items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).map_err(NfsnError::from))
                .collect(),
            ApiResponse::Object(map) => {
                let record: ResourceRecord = serde_json::from_value(Value::Object(map.clone()))?;
                Ok(vec![record])
            }
            ApiResponse::Empty | ApiResponse::Error { .. } => Ok(Vec::new()),
        }
    }
}

fn error_payload(value: &Value) -> Option<(String, Option<String>)> {
    value.as_object().and_then(error_payload_in)
}

fn error_payload_in(map: &Map<String, Value>) -> Option<(String, Option<String>)> {
    let code = match map.get("error")? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let debug = match map.get("debug") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    Some((code, debug))
}
