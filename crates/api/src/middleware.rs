use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Log every request as `"{method} {uri}"`, then its status and latency.
pub async fn request_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info!("{method} {uri}");

    let started = Instant::now();
    let res = next.run(req).await;

    tracing::debug!(
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{method} {uri} completed"
    );
    res
}
