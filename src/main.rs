use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use beacon_server::config::{generate_config_template, Config};
use beacon_server::routes;
use beacon_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "beacon_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "beacon_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("beacon server v{} starting", env!("CARGO_PKG_VERSION"));

    // Build application state: one relay core instance, shared by all handlers
    let app_state = AppState::new(
        Duration::from_secs(config.heartbeat_interval_secs),
        Duration::from_secs(config.room_grace_period_secs),
    );

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
