//! Picshare API Server
//!
//! Main entry point for the Picshare backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picshare_api::{AppState, create_router};
use picshare_core::media::build_media_store;
use picshare_core::post::{CompensationPolicy, PostService};
use picshare_core::upload::UploadPolicy;
use picshare_db::{PostRepository, connect};
use picshare_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picshare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database).await?;
    info!("Connected to database");

    // Create media store
    let media = build_media_store(&config.media).context("Failed to configure media store")?;
    info!(
        provider = media.provider_name(),
        folder = config.media.folder.as_deref().unwrap_or(""),
        "Media store configured"
    );

    // Create post service
    let posts = PostService::new(
        Arc::new(PostRepository::new(db)),
        media,
        config.upload.temp_dir.clone(),
    )
    .with_upload_policy(UploadPolicy::from_config(&config.upload))
    .with_compensation(CompensationPolicy::from_config(&config.media));

    // Create router
    let state = AppState {
        posts: Arc::new(posts),
    };
    let app = create_router(state, &config.cors, &config.upload);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
