use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use robo_core::llm::openai::OpenAiClient;

mod pages;
mod routes;
mod sessions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = robo_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if settings.openai_api_key.is_none() {
        // Reported again per request; the pages still render without it.
        tracing::warn!("OPENAI_API_KEY missing; recommendations will fail until it is set");
    }

    let llm = OpenAiClient::from_settings(&settings)?;
    tracing::info!(
        model = llm.model(),
        timeout_secs = settings.openai_timeout_secs,
        max_retries = settings.openai_max_retries,
        session_idle_ttl_secs = settings.session_idle_ttl_secs,
        "recommendation client configured"
    );

    let state = routes::AppState {
        sessions: sessions::SessionStore::new(Duration::from_secs(settings.session_idle_ttl_secs)),
        llm: Arc::new(llm),
    };
    let app = routes::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "robo advisor listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &robo_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
