//! WormGPT - a chaotic earthworm chat companion
//!
//! A Rust backend holding one conversation session behind a JSON/SSE API,
//! with text and image generation delegated to a Gemini-style provider.

mod api;
mod config;
mod llm;
mod persona;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{GeminiGateway, GenerationGateway, LoggingGateway};
use runtime::ConversationStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wormgpt=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!("No API key configured. Set GEMINI_API_KEY; generation calls will fail.");
    }

    let gemini: Arc<dyn GenerationGateway> = Arc::new(GeminiGateway::new(config.gemini_settings())?);
    let gateway = Arc::new(LoggingGateway::new(gemini));
    tracing::info!(
        gateway = %config.base_url,
        text_model = %gateway.text_model(),
        image_model = %gateway.image_model(),
        "Generation gateway initialized"
    );

    let store = ConversationStore::new(gateway);
    tracing::info!(session_id = %store.session_id(), "Session created");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(store))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("WormGPT server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
