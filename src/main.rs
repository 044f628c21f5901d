use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vertex_relay::api::VertexClient;
use vertex_relay::{Config, RelayState, relay_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Arc::new(Config::load()?);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        project = %cfg.project,
        region = %cfg.region,
        model_name = %cfg.model_name,
        vertex_endpoint = %cfg.vertex_endpoint.as_ref().map(|u| u.as_str()).unwrap_or("<regional>"),
        static_token = cfg.vertex_access_token.is_some(),
        secret_len = cfg.auth_token.len(),
        loglevel = %cfg.loglevel,
    );

    let client = VertexClient::new(&cfg)?;
    let state = RelayState::new(cfg.clone(), Arc::new(client));
    let app = relay_router(state);

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
