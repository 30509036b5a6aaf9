use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    ErrorMessage, SessionEnvelope, UNAUTHORISED, input::parse_input, message, validation_failed,
};
use crate::account::{AccountError, AccountService, LoginRequest};

#[utoipa::path(
    post,
    path = "/login",
    params(LoginRequest),
    request_body(
        content = LoginRequest,
        description = "JSON or form-urlencoded; body keys override query parameters",
        content_type = "application/json"
    ),
    responses(
        (status = 202, description = "Logged in, new token issued", body = SessionEnvelope, content_type = "application/json"),
        (status = 401, description = "Invalid input or bad credentials", body = ErrorMessage),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Login reports every failure as 401, undecodable and malformed input included.
    let request: LoginRequest = match parse_input(&uri, &headers, &body) {
        Ok(request) => request,
        Err(err) => return err.with_status(StatusCode::UNAUTHORIZED),
    };

    match service.login(request).await {
        Ok(session) => (
            StatusCode::ACCEPTED,
            Json(SessionEnvelope { success: session }),
        )
            .into_response(),
        Err(AccountError::Validation(errors)) => validation_failed(StatusCode::UNAUTHORIZED, errors),
        Err(AccountError::Authentication) => message(StatusCode::UNAUTHORIZED, UNAUTHORISED),
        Err(err) => err.into_response(),
    }
}
