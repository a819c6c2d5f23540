//! KuFlow samples - Main Entry Point
//!
//! Runs one of the sample workers and serves the KuFlow webhook endpoint.

use std::time::Duration;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use kuflow_samples::config::{AppConfig, SampleMode};
use kuflow_samples::logging::init_tracing;
use kuflow_samples::server::create_app;

// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "kuflow-samples")]
#[command(about = "KuFlow sample workers")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    sample: Sample,

    /// Config file path (without extension picks yaml or toml).
    #[arg(short, long, global = true, env = "KUFLOW_SAMPLES_CONFIG")]
    config: Option<String>,

    /// Log level, overrides logging.level.
    #[arg(long, global = true, env = "KUFLOW_SAMPLES_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Sample {
    /// Loan approval workflow with currency conversion.
    LoanWorker,
    /// Email notification workflow.
    EmailWorker,
    /// UI.Vision RPA robot workflow.
    #[command(name = "uivision-worker")]
    UIVisionWorker,
    /// Loan approval driven by webhooks, without a workflow engine.
    RestLoan,
}

impl From<Sample> for SampleMode {
    fn from(sample: Sample) -> Self {
        match sample {
            Sample::LoanWorker => Self::LoanWorker,
            Sample::EmailWorker => Self::EmailWorker,
            Sample::UIVisionWorker => Self::UIVisionWorker,
            Sample::RestLoan => Self::RestLoan,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mode = SampleMode::from(args.sample);

    let config = AppConfig::load(args.config.as_deref(), mode)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, config.logging.format);

    tracing::info!(
        "Starting {} v{} ({})",
        config.application.name,
        env!("CARGO_PKG_VERSION"),
        mode
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.worker.shutdown_grace_secs);

    let app = create_app(config, mode).await?;
    tracing::info!("Application initialized");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = &app.state.worker {
        worker.shutdown(grace).await;
    }
    drop(app.engine);

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
