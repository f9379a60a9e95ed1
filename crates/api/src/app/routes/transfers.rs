use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Responds with the debit event, the canonical record of the transfer.
pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateTransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_input(rejection.body_text()),
    };

    match services.transfer(request).await {
        Ok(debit) => (StatusCode::CREATED, Json(debit)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
