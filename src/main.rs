use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use twotruths::{
    audio::{AudioSink, SilentAudio},
    facts::{FactService, LlmFactSource},
    llm,
    state::AppState,
    types::GameConfig,
    ws,
};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:7312";

#[tokio::main]
async fn main() {
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
                .unwrap_or_else(|_| "twotruths=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Two Truths and a Lie...");

    // Initialize LLM providers
    let llm_config = llm::LlmConfig::from_env();
    let facts = match llm_config.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            FactService::new(Arc::new(LlmFactSource::new(
                manager,
                llm_config.fact_language.clone(),
                llm_config.max_tokens,
                llm_config.timeout,
            )))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. Only the built-in fact set will be used.",
                e
            );
            FactService::fallback_only()
        }
    };

    let config = GameConfig::from_env();
    let mut state = AppState::with_services(facts, config);
    if std::env::var("AUDIO").is_ok_and(|v| v.trim().eq_ignore_ascii_case("off")) {
        tracing::info!("Audio disabled");
        let silent: Arc<dyn AudioSink> = Arc::new(SilentAudio);
        state = state.with_audio(silent);
    }
    let state = Arc::new(state);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
        .trim()
        .parse()
        .unwrap_or_else(|e| {
            tracing::warn!("Invalid LISTEN_ADDR ({}), using {}", e, DEFAULT_LISTEN_ADDR);
            SocketAddr::from(([0, 0, 0, 0], 7312))
        });
    tracing::info!("Listening on ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
