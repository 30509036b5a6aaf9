use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use super::{SessionEnvelope, ValidationErrorBody, input::parse_input};
use crate::account::{AccountService, RegisterRequest};

#[utoipa::path(
    post,
    path = "/register",
    params(RegisterRequest),
    request_body(
        content = RegisterRequest,
        description = "JSON or form-urlencoded; body keys override query parameters",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Registration successful", body = SessionEnvelope, content_type = "application/json"),
        (status = 400, description = "Invalid input, email taken, password confirmation mismatch or undecodable body", body = ValidationErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request: RegisterRequest = match parse_input(&uri, &headers, &body) {
        Ok(request) => request,
        Err(err) => return err.with_status(StatusCode::BAD_REQUEST),
    };

    match service.register(request).await {
        Ok(session) => (
            StatusCode::CREATED,
            Json(SessionEnvelope { success: session }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
