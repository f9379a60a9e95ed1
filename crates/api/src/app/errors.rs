use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tally_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        EngineError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        EngineError::InsufficientFunds(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds", msg)
        }
        EngineError::Store(e) => {
            tracing::error!(error = %e, "ledger store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal storage error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed request bodies and path parameters are invalid input.
pub fn invalid_input(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", message)
}
