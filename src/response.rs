//! Normalizing server answers into [`ApiResult`]s.
//!
//! Every answer that carries an HTTP status ends up as a JSON object with an
//! `http_response_code` member. Failed calls additionally carry an `error`
//! string; which statuses count as failures is up to the
//! [`ResponseClassifier`] used for the call.

use std::convert::TryFrom;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Member injected into every result.
pub const HTTP_RESPONSE_CODE_KEY: &str = "http_response_code";
/// Member carrying the failure description.
pub const ERROR_KEY: &str = "error";
/// Error text for 2xx bodies that are not a JSON object.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON server response";

/// Decoded response of an API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiResult(Map<String, Value>);

impl ApiResult {
    /// An empty result carrying only the status.
    pub fn status(status: StatusCode) -> Self {
        let mut map = Map::new();
        map.insert(HTTP_RESPONSE_CODE_KEY.to_string(), status.as_u16().into());
        ApiResult(map)
    }

    /// A failed result with the given message.
    pub fn error<T: Into<String>>(message: T, status: StatusCode) -> Self {
        let mut result = ApiResult::status(status);
        result.0.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        result
    }

    /// Decodes a 2xx body.
    ///
    /// Bodies that are not a JSON object become an [`INVALID_JSON_MESSAGE`]
    /// error. A `http_response_code` member sent by the server is replaced
    /// by the transport status.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut map)) => {
                map.insert(HTTP_RESPONSE_CODE_KEY.to_string(), status.as_u16().into());
                ApiResult(map)
            }
            _ => ApiResult::error(INVALID_JSON_MESSAGE, status),
        }
    }

    pub fn http_response_code(&self) -> Option<u16> {
        self.0
            .get(HTTP_RESPONSE_CODE_KEY)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }

    /// The `error` member, if the call failed.
    pub fn error_message(&self) -> Option<&str> {
        self.0.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    /// True for the answer of a conditional listing whose content did not change.
    pub fn is_not_modified(&self) -> bool {
        !self.is_error() && self.http_response_code() == Some(StatusCode::NOT_MODIFIED.as_u16())
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Reads the result into a typed structure. Unknown members, including
    /// `http_response_code`, are ignored unless `T` asks for them.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(Value::Object(self.0.clone()))
    }
}

impl From<ApiResult> for Value {
    fn from(result: ApiResult) -> Self {
        Value::Object(result.0)
    }
}

/// Turns a non-2xx status into the result handed back to the caller.
pub trait ResponseClassifier {
    fn classify(&self, status: StatusCode) -> ApiResult;
}

impl<F> ResponseClassifier for F
where
    F: Fn(StatusCode) -> ApiResult,
{
    fn classify(&self, status: StatusCode) -> ApiResult {
        self(status)
    }
}

/// Default classifier: every non-2xx status is an error named after its
/// status line, e.g. `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusError;

impl ResponseClassifier for StatusError {
    fn classify(&self, status: StatusCode) -> ApiResult {
        let line = match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        };
        ApiResult::error(line, status)
    }
}

/// Treats `304 Not Modified` as an unchanged, successful result and defers
/// every other status to [`StatusError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotModified;

impl ResponseClassifier for NotModified {
    fn classify(&self, status: StatusCode) -> ApiResult {
        if status == StatusCode::NOT_MODIFIED {
            ApiResult::status(status)
        } else {
            StatusError.classify(status)
        }
    }
}
