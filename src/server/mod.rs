//! Web server module
//!
//! Serves the consultation UI, accepts uploads and exposes generated audio.

pub mod http;
pub mod uploads;

use anyhow::{Result, Context};
use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::consultation::Consultation;
use crate::security::{CredentialSet, Provider};

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialSet>,
    pub consultation: Arc<Consultation>,
}

impl ServerState {
    pub fn new(config: Config, credentials: Arc<CredentialSet>, consultation: Consultation) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            consultation: Arc::new(consultation),
        }
    }
}

/// All routes with their middleware
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.server.max_upload_bytes();
    let uploads = ServeDir::new(&state.config.server.upload_dir);

    Router::new()
        .route("/", get(index_page))
        .route("/api/upload", post(http::upload_handler))
        .route("/api/status", get(http::status_handler))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(config: Config, host: &str, port: u16) -> Result<()> {
    let credentials = Arc::new(CredentialSet::from_env());

    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.server.upload_dir.display()))?;

    let consultation = Consultation::from_config(credentials.clone(), &config)?;
    let state = ServerState::new(config, credentials.clone(), consultation);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let app = router(state.clone());

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     Arogya Consultation Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("✓ Server binding to: {}", addr);
    println!("✓ Uploads: {}", state.config.server.upload_dir.display());

    if credentials.is_configured(Provider::Groq) {
        println!("✓ Vision model: {}", state.config.models.vision);
    } else {
        println!("⚠ {} not set: diagnoses will explain how to configure it", Provider::Groq.env_var());
    }
    if credentials.is_configured(Provider::ElevenLabs) {
        println!("✓ Voice: ElevenLabs");
    } else {
        println!("⚠ Voice: Google TTS ({} not set)", Provider::ElevenLabs.env_var());
    }

    println!();
    println!("🚀 Listening on http://{}", addr);
    println!();

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Embedded single-page UI
async fn index_page() -> Html<&'static str> {
    Html(include_str!("index.html"))
}
