//! Binary entrypoint for the tessera HTTP server.
//!
//! Configuration comes from `TESSERA_*` environment variables, see
//! [`EngineConfig::from_env`].

use tessera_server::config::EngineConfig;
use tessera_server::router::build_router;
use tessera_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::from_env();
    let port = config.port;
    let state = AppState::new(config)?;
    tracing::info!(models = state.engine.registry().len(), "models opened");

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("tessera server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
