//! Exchange envelope: `{id, operation, arguments}` in, `{id, result}` or
//! `{id, error}` out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExchangeError;

/// Caller-supplied exchange id (a string or an integer).
///
/// Opaque to the server; only echoed back on the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One intake message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub id: RequestId,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSuccess {
    pub id: RequestId,
    pub result: Value,
}

/// Error response. `id` is `null` when it could not be recovered from the
/// intake message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeFailure {
    pub id: Option<RequestId>,
    pub error: ExchangeError,
}

/// Terminal outcome of one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExchangeResponse {
    Success(ExchangeSuccess),
    Failure(ExchangeFailure),
}

/// Result produced by an operation handler.
pub type HandlerResult = Result<Value, ExchangeError>;

impl ExchangeRequest {
    /// Decode one intake message.
    ///
    /// On failure the id is returned alongside the error whenever it could
    /// be recovered, so the caller can still correlate the response.
    pub fn decode(raw: &[u8]) -> Result<Self, (Option<RequestId>, ExchangeError)> {
        let parsed: Value = serde_json::from_slice(raw)
            .map_err(|e| (None, ExchangeError::decode(format!("invalid JSON: {e}"))))?;

        let Some(object) = parsed.as_object() else {
            return Err((None, ExchangeError::decode("exchange must be a JSON object")));
        };

        let id = match object.get("id") {
            Some(raw_id) => match serde_json::from_value::<RequestId>(raw_id.clone()) {
                Ok(id) => id,
                Err(_) => {
                    return Err((
                        None,
                        ExchangeError::decode("'id' must be a string or an integer"),
                    ));
                }
            },
            None => return Err((None, ExchangeError::decode("missing 'id'"))),
        };

        let operation = match object.get("operation") {
            Some(Value::String(op)) if !op.is_empty() => op.clone(),
            Some(Value::String(_)) => {
                return Err((Some(id), ExchangeError::decode("'operation' must not be empty")));
            }
            Some(_) => {
                return Err((Some(id), ExchangeError::decode("'operation' must be a string")));
            }
            None => return Err((Some(id), ExchangeError::decode("missing 'operation'"))),
        };

        let arguments = object.get("arguments").cloned().filter(|v| !v.is_null());

        Ok(Self {
            id,
            operation,
            arguments,
        })
    }
}

impl ExchangeResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success(ExchangeSuccess { id, result })
    }

    pub fn failure(id: Option<RequestId>, error: ExchangeError) -> Self {
        Self::Failure(ExchangeFailure { id, error })
    }

    pub fn from_result(id: RequestId, result: HandlerResult) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(error) => Self::failure(Some(id), error),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success(s) => Some(&s.id),
            Self::Failure(f) => f.id.as_ref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Serialize for the wire. Falls back to a hand-built internal error if
    /// the result value itself cannot be serialized.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"id":null,"error":{{"category":"internal","message":"failed to serialize response: {}","code":-32603}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
