//! KAVACH Gateway: voice authenticity analysis and honeypot engagement over HTTP.

mod error;
mod routes;
mod wire;

use kavach_core::{HoneypotEngine, KavachConfig, SessionStore, VoiceAnalyzer};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = KavachConfig::load()?;
    let gateway = config.build_gateway()?;
    let timeout = config.inference_timeout();

    tracing::info!(
        app = %config.app_name,
        llm_mode = ?config.llm_mode,
        fast_model = %config.fast_model,
        reasoning_model = %config.reasoning_model,
        timeout_secs = timeout.as_secs(),
        "starting gateway"
    );

    let state = Arc::new(AppState {
        app_name: config.app_name.clone(),
        voice: VoiceAnalyzer::new(Arc::clone(&gateway), timeout),
        honeypot: HoneypotEngine::new(gateway, Arc::new(SessionStore::new()), timeout)
            .with_conflict_policy(config.session_conflict_policy),
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("KAVACH gateway listening on {}", addr);
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
