use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heartlink::{
    api,
    broadcast::{self, ReplicationHub},
    catalog::{PromptCatalog, SystemRng},
    config::ServerConfig,
    gateway::InMemoryGateway,
    state::AppState,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heartlink=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Heartlink...");

    let config = ServerConfig::from_env();
    tracing::info!(
        "{} rounds per game, {} players to start",
        config.max_rounds,
        config.min_players
    );

    let hub = Arc::new(ReplicationHub::new(config.channel_capacity));
    let gateway = Arc::new(InMemoryGateway::new(hub.clone()));

    // Spawn background task for dropping channels of abandoned rooms
    broadcast::spawn_channel_janitor(hub, config.prune_interval);

    let addr = config.bind_addr;
    let state = Arc::new(AppState::with_parts(
        config,
        gateway,
        PromptCatalog::builtin(),
        Box::new(SystemRng),
    ));

    let app = api::router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
