//! HTTP server setup and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::bootstrap;
use crate::config::{AppConfig, SampleMode};
use crate::engine::EngineConnection;
use crate::logging::{Startup, StartupStep};
use crate::webhooks;
use crate::AppState;

/// Sample version (from Cargo.toml).
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything `main` needs to serve and later shut down a sample.
#[derive(Debug)]
pub struct App {
    pub router: Router,
    pub state: AppState,
    /// Remote engine channel, kept alive for the token refresh.
    pub engine: Option<EngineConnection>,
}

/// Create the application with all routes and middleware.
pub async fn create_app(config: AppConfig, mode: SampleMode) -> anyhow::Result<App> {
    let startup = Startup::begin(
        mode,
        &config.application.name,
        VERSION,
        &config.temporal.kuflow_queue,
    );

    let step = startup.step(StartupStep::KuFlowClient);
    let client = bootstrap::kuflow_client(&config)?;
    step.done(format!("🔑 {}", client.endpoint()));

    // Resumes workflows left open by a previous run
    let step = startup.step(StartupStep::Worker);
    let worker = bootstrap::worker(&config, mode, &client).await?;
    match &worker {
        Some(worker) => step.done(format!(
            "⚡ {} on '{}' ({:?} history, {} open)",
            worker.workflow_types().join(", "),
            worker.task_queue(),
            config.worker.event_log,
            worker.active_count()
        )),
        None => step.done("⚡ Skipped (webhook-driven sample)"),
    }

    let step = startup.step(StartupStep::Engine);
    let engine = if !mode.uses_engine() {
        step.done("🔌 Not used");
        None
    } else if config.temporal.target.is_some() {
        let connection = match EngineConnection::connect(&config.temporal, &client).await {
            Ok(connection) => connection,
            Err(e) => {
                startup.failed(StartupStep::Engine, &e);
                return Err(anyhow::anyhow!("Engine connection failed:\n\n{e}"));
            }
        };
        step.done(format!("🔌 {}", connection.target()));
        Some(connection)
    } else {
        step.done("🔌 Embedded");
        None
    };

    let step = startup.step(StartupStep::Webhooks);
    let handler = bootstrap::webhook_handler(&config, mode, &client, worker.as_ref())?;
    if mode == SampleMode::EmailWorker && config.email.relay_url.is_none() {
        startup.warn(
            StartupStep::Webhooks,
            "No mail relay configured; emails will only be logged",
        );
    }
    step.done(format!("📬 POST /webhooks → {}", handler.name()));

    let state = AppState {
        config: Arc::new(config),
        mode,
        webhooks: handler,
        worker,
    };

    let step = startup.step(StartupStep::Router);
    let router = router(state.clone());
    step.done("🌐 Routes + middleware configured");

    startup.ready();

    Ok(App {
        router,
        state,
        engine,
    })
}

/// Routes and middleware over an existing state.
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_secs);

    Router::new()
        .merge(health_router())
        .merge(webhooks::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: String,
    /// Workflows not yet closed on the embedded worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_workflows: Option<usize>,
}

fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        mode: state.mode.to_string(),
        active_workflows: state.worker.as_ref().map(durable_kuflow::EmbeddedWorker::active_count),
    })
}
