//! Arogya - voice and image consultation assistant

use arogya::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    // Initialize logging (INFO by default, override with RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    cli::run().await
}
