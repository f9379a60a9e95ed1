use anyhow::Context;

use tally_infra::LedgerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tally_observability::init();

    let config = LedgerConfig::from_env().context("invalid configuration")?;
    let services = tally_api::app::services::build_services(&config)
        .await
        .context("failed to build ledger services")?;
    let app = tally_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
