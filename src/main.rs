//! Chat streaming API server
//!
//! Run with: cargo run -- --config config.toml

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use rag_chat_backend::config::AppConfig;
use rag_chat_backend::handlers::{create_router, AppState};
use rag_chat_backend::infrastructure::llm::{LlmClient, OpenAiClient};
use rag_chat_backend::infrastructure::retrieval::{Retriever, StaticRetriever};
use rag_chat_backend::infrastructure::storage::connect_stores;
use rag_chat_backend::shared::logging::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "rag-chat-backend", version, about)]
struct Args {
    /// TOML config file (defaults to ./config.toml when present)
    #[arg(short, long, env = "RAG_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep session state in process memory, skip Redis
    #[arg(long)]
    no_redis: bool,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_redis {
        config.redis.enabled = false;
    }

    tracing::info!(
        redis = %config.redis.redacted_url(),
        redis_enabled = config.redis.enabled,
        model = %config.openai.model_name,
        "Starting chat streaming server"
    );

    let stores = connect_stores(&config.redis).await;

    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAiClient::from_config(&config.openai).context("Failed to build LLM client")?);
    let retriever: Arc<dyn Retriever> = match &config.retrieval.fixture_path {
        Some(path) => Arc::new(StaticRetriever::from_path(path)),
        None => Arc::new(StaticRetriever::sample()),
    };

    let state = AppState::new(stores, llm, retriever, config.server.stream_buffer);
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
