//! Request input for the unauthenticated account routes.
//!
//! Fields arrive as one flat key-value set gathered from the query string and
//! a form-urlencoded or JSON body. Body keys win over query keys.

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode, Uri, header::CONTENT_TYPE},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

use super::message;

/// Input that could not be decoded.
#[derive(Debug)]
pub struct InputError {
    message: String,
}

impl InputError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Respond with `{"error": message}`.
    pub fn with_status(self, status: StatusCode) -> Response {
        message(status, &self.message)
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

fn insert_pairs(fields: &mut Map<String, Value>, encoded: &[u8]) {
    for (key, value) in form_urlencoded::parse(encoded) {
        fields.insert(key.into_owned(), Value::String(value.into_owned()));
    }
}

/// Merge query and body into `T`.
///
/// A form-urlencoded content type selects form decoding; any other body is
/// read as a JSON object, and an empty body contributes no fields.
///
/// # Errors
/// Returns an error for a body that is not a JSON object, or for values that
/// are not scalars.
pub fn parse_input<T: DeserializeOwned>(
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, InputError> {
    let mut fields = Map::new();

    if let Some(query) = uri.query() {
        insert_pairs(&mut fields, query.as_bytes());
    }

    if is_form(headers) {
        insert_pairs(&mut fields, body);
    } else if !body.iter().all(u8::is_ascii_whitespace) {
        let object: Map<String, Value> = serde_json::from_slice(body).map_err(|err| {
            debug!("rejected JSON body: {err}");
            InputError::new(format!("Invalid JSON body: {err}"))
        })?;
        fields.extend(object);
    }

    serde_json::from_value(Value::Object(fields)).map_err(|err| {
        debug!("rejected input fields: {err}");
        InputError::new(format!("Invalid input: {err}"))
    })
}
