//! KuFlow sample workers.
//!
//! One binary, four samples:
//!
//! - **loan-worker**: loan approval workflow with currency conversion
//! - **email-worker**: collects email data in a task and sends the mail
//! - **uivision-worker**: runs a UI.Vision RPA macro and logs its output
//! - **rest-loan**: the loan approval driven by webhooks alone
//!
//! Every sample listens for KuFlow webhooks on `POST /webhooks`. Worker
//! samples run their workflow on an embedded engine
//! ([`durable_kuflow::EmbeddedWorker`]); the webhook starts a workflow when
//! a process starts and signals it when one of its tasks is completed.
//!
//! # Modules
//!
//! - [`config`]: layered configuration and validation
//! - [`activities`]: KuFlow, currency, datasource, email and UI.Vision activities
//! - [`workflows`]: the loan, email and UI.Vision workflows
//! - [`webhooks`]: the webhook endpoint and the REST loan handler
//! - [`engine`]: webhook bridge and remote engine connection
//! - [`bootstrap`]: builds clients, registries and the worker from config
//! - [`server`]: router and middleware
//!
//! # Example
//!
//! ```rust,ignore
//! use kuflow_samples::config::{AppConfig, SampleMode};
//! use kuflow_samples::server::create_app;
//!
//! let config = AppConfig::load(None, SampleMode::LoanWorker)?;
//! let app = create_app(config, SampleMode::LoanWorker).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app.router).await?;
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod activities;
pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod logging;
pub mod server;
pub mod webhooks;
pub mod workflows;

use std::sync::Arc;

use durable_kuflow::EmbeddedWorker;

use config::{AppConfig, SampleMode};
use webhooks::WebhookHandler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Sample being run.
    pub mode: SampleMode,
    /// Receives every parsed webhook event.
    pub webhooks: Arc<dyn WebhookHandler>,
    /// Embedded worker, absent in `rest-loan` mode.
    pub worker: Option<EmbeddedWorker>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("mode", &self.mode)
            .field("webhooks", &self.webhooks.name())
            .field("worker", &self.worker)
            .finish()
    }
}
