use axum::{
    Router,
    routing::{get, post},
};

pub mod accounts;
pub mod system;
pub mod transfers;

/// Router for every ledger endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/:id", get(accounts::get_account))
        .route("/accounts/:id/transfers", get(accounts::list_transfers))
        .route("/transfers", post(transfers::create_transfer))
}
