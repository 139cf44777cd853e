mod auth;
mod clients;
mod config;
mod creations;
mod db;
mod errors;
mod generate;
mod models;
mod quota;
mod routes;
mod state;
mod upload;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::clients::assets::AssetClient;
use crate::clients::chat::ChatClient;
use crate::clients::identity::IdentityClient;
use crate::clients::image_gen::ImageGenClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (errors on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Artifex API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;

    // Upstream clients, all built from explicit config (no global singletons)
    let chat = ChatClient::new(config.chat_api_url.clone(), config.chat_api_key.clone());
    info!("Chat client initialized (model: {})", clients::chat::MODEL);

    let image_gen = ImageGenClient::new(config.image_api_url.clone(), config.image_api_key.clone())?;
    info!("Image generation client initialized");

    let assets = AssetClient::new(
        config.asset_api_url.clone(),
        config.asset_cloud_name.clone(),
        config.asset_api_key.clone(),
        config.asset_api_secret.clone(),
    );
    info!("Asset host client initialized");

    let identity = IdentityClient::new(
        config.identity_api_url.clone(),
        config.identity_api_key.clone(),
    );
    info!("Identity client initialized");

    // Build app state
    let state = AppState {
        db,
        chat,
        image_gen,
        assets,
        identity,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
