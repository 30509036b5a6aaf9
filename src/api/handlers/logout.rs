use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use super::{ErrorMessage, require_auth};
use crate::account::AccountService;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Presented token revoked"),
        (status = 401, description = "Missing, unknown or revoked token", body = ErrorMessage),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, service: Extension<Arc<AccountService>>) -> impl IntoResponse {
    let context = match require_auth(&headers, &service).await {
        Ok(context) => context,
        Err(response) => return response,
    };

    match service.logout(&context).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
