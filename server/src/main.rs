use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_server::config::ServerConfig;
use parlor_server::engine::chat_engine::ChatEngine;
use parlor_server::web::app_state::AppState;
use parlor_server::web::router::build_router;

#[derive(Parser)]
#[command(name = "parlor-server", about = "Minimal real-time group chat server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "parlor.toml")]
    config: String,

    /// Override the listen address from the config file.
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config);
    let address = cli.address.unwrap_or_else(|| config.server.address.clone());

    // All chat state lives in this one engine for the process lifetime;
    // restart clears history and presence.
    let engine = Arc::new(ChatEngine::new(config.to_chat_settings()));
    let app_state = Arc::new(AppState { engine });

    let app = build_router(app_state, &config.server.static_dir);

    info!("Parlor server starting — listening on {}", address);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("failed to bind listener");

    axum::serve(listener, app).await.expect("server error");
}
