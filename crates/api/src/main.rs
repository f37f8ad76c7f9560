use stockroom_infra::EngineConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let bind_addr = std::env::var("STOCKROOM_BIND_ADDR").unwrap_or_else(|_| {
        tracing::warn!("STOCKROOM_BIND_ADDR not set; using {DEFAULT_BIND_ADDR}");
        DEFAULT_BIND_ADDR.to_string()
    });

    let config = EngineConfig::from_env();
    tracing::info!(?config, "engine configuration");

    let app = stockroom_api::app::build_app(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
