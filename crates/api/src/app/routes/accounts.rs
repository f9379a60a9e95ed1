use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_input(rejection.body_text()),
    };

    match services.create_account(body.balance).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(dto::AccountResponse::from(account)),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_account(id).await {
        Ok(account) => Json(dto::AccountResponse::from(account)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Raw ledger view of one account, oldest event first.
pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.list_transfers(id).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
