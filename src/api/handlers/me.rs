use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use super::{ErrorMessage, UserEnvelope, require_auth};
use crate::account::AccountService;

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserEnvelope, content_type = "application/json"),
        (status = 401, description = "Missing, unknown or revoked token", body = ErrorMessage),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(headers: HeaderMap, service: Extension<Arc<AccountService>>) -> impl IntoResponse {
    match require_auth(&headers, &service).await {
        Ok(context) => (
            StatusCode::OK,
            Json(UserEnvelope {
                success: service.me(&context),
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}
