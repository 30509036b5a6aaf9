//! HTTP handlers and the pieces they share: bearer token extraction, response
//! envelopes and error mapping.

pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod register;
pub use self::register::register;

pub mod logout;
pub use self::logout::logout;

pub mod unregister;
pub use self::unregister::unregister;

pub mod me;
pub use self::me::me;

pub mod input;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::account::{AccountError, AccountService, AuthContext, FieldErrors, Session, User};

pub(crate) const UNAUTHENTICATED: &str = "Unauthenticated.";
pub(crate) const UNAUTHORISED: &str = "Unauthorised";
pub(crate) const NOT_FOUND: &str = "Not found.";
pub(crate) const INTERNAL_ERROR: &str = "Internal server error.";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidationErrorBody {
    pub error: FieldErrors,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionEnvelope {
    pub success: Session,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserEnvelope {
    pub success: User,
}

pub(crate) fn message(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorMessage {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn validation_failed(status: StatusCode, errors: FieldErrors) -> Response {
    (status, Json(ValidationErrorBody { error: errors })).into_response()
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => validation_failed(StatusCode::BAD_REQUEST, errors),
            Self::Authentication => message(StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            Self::NotFound => message(StatusCode::NOT_FOUND, NOT_FOUND),
            Self::Internal(err) => {
                error!("Request failed: {err:#}");
                message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}

/// Resolve the request's bearer token into the calling user, or the 401 response to send.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    service: &AccountService,
) -> Result<AuthContext, Response> {
    service
        .authenticate(extract_bearer_token(headers))
        .await
        .map_err(IntoResponse::into_response)
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

pub async fn root() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
