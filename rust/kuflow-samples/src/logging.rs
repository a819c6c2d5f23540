//! Tracing setup and the startup log of a sample.
//!
//! `create_app` wires a sample in five fixed [`StartupStep`]s. Each step is
//! logged as `[n/5] Label - detail` with the sample mode, the step key and
//! how long it took, so a slow or failing step is visible in both the plain
//! and the JSON output.

use std::fmt::Display;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, SampleMode};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

/// Steps run by `create_app`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    KuFlowClient,
    Worker,
    Engine,
    Webhooks,
    Router,
}

impl StartupStep {
    pub const ALL: [Self; 5] = [
        Self::KuFlowClient,
        Self::Worker,
        Self::Engine,
        Self::Webhooks,
        Self::Router,
    ];

    /// Position of the step, starting at 1.
    #[must_use]
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).map_or(0, |i| i + 1)
    }

    /// Key used in the `step` field.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::KuFlowClient => "kuflow_client",
            Self::Worker => "worker",
            Self::Engine => "engine",
            Self::Webhooks => "webhooks",
            Self::Router => "router",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::KuFlowClient => "KuFlow Client",
            Self::Worker => "Worker",
            Self::Engine => "Engine",
            Self::Webhooks => "Webhooks",
            Self::Router => "Router",
        }
    }
}

/// Startup log of one sample.
#[derive(Debug)]
pub struct Startup {
    mode: SampleMode,
    started: Instant,
}

impl Startup {
    /// Log the banner and start timing the startup.
    #[must_use]
    pub fn begin(mode: SampleMode, application: &str, version: &str, task_queue: &str) -> Self {
        tracing::info!("═══════════════════════════════════════════════════");
        tracing::info!(%mode, version, task_queue, "  🚀 {application} v{version}");
        tracing::info!("  Sample: {mode} | Queue: {task_queue}");
        tracing::info!("═══════════════════════════════════════════════════");

        Self {
            mode,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn step(&self, step: StartupStep) -> StepTimer {
        tracing::debug!(mode = %self.mode, step = step.key(), "Startup step started");
        StepTimer {
            mode: self.mode,
            step,
            started: Instant::now(),
        }
    }

    /// Non-fatal problem found while running `step`.
    pub fn warn(&self, step: StartupStep, message: &str) {
        tracing::warn!(mode = %self.mode, step = step.key(), "⚠️  {message}");
    }

    /// The sample could not start; `step` is where it stopped.
    pub fn failed(self, step: StartupStep, error: &dyn Display) {
        tracing::error!(
            mode = %self.mode,
            step = step.key(),
            duration_ms = elapsed_ms(self.started),
            error = %error,
            "Startup failed"
        );
    }

    /// Every step finished.
    pub fn ready(self) {
        tracing::info!(
            mode = %self.mode,
            duration_ms = elapsed_ms(self.started),
            "✅ {} ready",
            self.mode
        );
    }
}

/// Times one [`StartupStep`].
#[derive(Debug)]
pub struct StepTimer {
    mode: SampleMode,
    step: StartupStep,
    started: Instant,
}

impl StepTimer {
    /// Log the step as finished with a short description of its result.
    pub fn done(self, detail: impl Display) {
        tracing::info!(
            mode = %self.mode,
            step = self.step.key(),
            duration_ms = elapsed_ms(self.started),
            "[{}/{}] {} - {detail}",
            self.step.number(),
            StartupStep::ALL.len(),
            self.step.label()
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
