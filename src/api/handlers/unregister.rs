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
    path = "/unregister",
    responses(
        (status = 200, description = "Account and all of its tokens deleted"),
        (status = 401, description = "Missing, unknown or revoked token", body = ErrorMessage),
        (status = 404, description = "Account already deleted", body = ErrorMessage),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn unregister(
    headers: HeaderMap,
    service: Extension<Arc<AccountService>>,
) -> impl IntoResponse {
    let context = match require_auth(&headers, &service).await {
        Ok(context) => context,
        Err(response) => return response,
    };

    match service.unregister(&context).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
