use anyhow::Context;

use demandlens_api::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    demandlens_observability::init();

    let config = ApiConfig::from_env().context("invalid pipeline configuration")?;
    let bind_addr = config.bind_addr.clone();
    let app = demandlens_api::app::build_app(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
