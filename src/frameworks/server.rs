// Framework bootstrap for the hazard server runtime.

use crate::domain::SystemClock;
use crate::frameworks::config;
use crate::interface_adapters::clients::ScoringClient;
use crate::interface_adapters::net::{
    create_session_handler, delete_session_handler, spawn_session_serializer, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionRegistry, SessionSettings};

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state().await?;
    // Start the web server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{session_id}", delete(delete_session_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let scoring_base_url = config::scoring_service_url();
    let scoring_timeout = config::scoring_apply_timeout();
    let scoring_client = ScoringClient::new(scoring_base_url.clone(), scoring_timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize scoring client: {e}")))?;
    tracing::debug!(
        scoring_base_url = %scoring_base_url,
        scoring_timeout_ms = scoring_timeout.as_millis(),
        "scoring client configured"
    );

    // Setup the session registry.
    // This owns the set of active hazard session loops.
    let session_registry = Arc::new(SessionRegistry::new(
        SessionSettings {
            input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
            update_broadcast_capacity: config::UPDATE_BROADCAST_CAPACITY,
            scoring_channel_capacity: config::SCORING_CHANNEL_CAPACITY,
            tick_interval: config::TICK_INTERVAL,
            start_countdown: config::START_COUNTDOWN,
        },
        Arc::new(scoring_client),
        Arc::new(SystemClock),
    ));

    // Create the default training session and spawn its hazard loop.
    // Keep it pinned so it never gets deleted.
    let default_session_id = config::DEFAULT_SESSION_ID.to_string();
    let training = session_registry
        .create_session(
            default_session_id.clone(),
            config::default_training_zone(),
            true,
        )
        .await
        .map_err(|e| {
            std::io::Error::other(format!("failed to initialize default session: {e:?}"))
        })?;
    spawn_session_serializer(&training);

    Ok(Arc::new(AppState {
        session_registry,
        default_session_id: Arc::from(default_session_id.as_str()),
    }))
}
