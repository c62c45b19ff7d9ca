mod config;
mod llm;
mod readiness;
mod routes;
mod services;
mod session;
mod sessions;
mod state;
mod store;
mod typewriter;

use std::sync::Arc;

use crate::services::relay::{BriefRelay, WebhookRelay};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let app_config = config::AppConfig::from_env();

    // Initialize LLM client (non-fatal: chat degrades if config missing).
    let llm: Option<Arc<dyn llm::LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured, chat will apologize");
            None
        }
    };

    // Relay is also non-fatal: submissions error clearly without it.
    let relay: Option<Arc<dyn BriefRelay>> = match &app_config.relay_webhook_url {
        Some(url) => match WebhookRelay::new(url.clone()) {
            Ok(webhook) => Some(Arc::new(webhook)),
            Err(e) => {
                tracing::warn!(error = %e, "relay client build failed, submissions disabled");
                None
            }
        },
        None => None,
    };

    let port = app_config.port;
    let state = state::AppState::new(app_config, llm, relay);
    state.store.load_backup().await;

    // Spawn background sweeps.
    let _session_sweep = services::autosubmit::spawn_session_sweep(state.clone());
    let _store_sweep = services::autosubmit::spawn_store_sweep(state.clone());

    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "concierge listening");
    axum::serve(listener, app).await.expect("server failed");
}
