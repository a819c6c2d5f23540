//! Builds the sample's components from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use durable_kuflow::activities::ActivityRegistry;
use durable_kuflow::{EmbeddedWorker, EventLog};
use kuflow_rest::KuFlowRestClient;

use crate::activities::{
    register_kuflow_activities, register_loan_activities, CurrencyConverter, EmailActivity,
    EmailRenderer, HttpRelayTransport, LogTransport, MailTransport, UIVisionActivity,
    UIVisionSettings,
};
use crate::config::{AppConfig, EventLogKind, SampleMode, WorkerConfig};
use crate::engine::EngineBridge;
use crate::webhooks::{RestLoanHandler, WebhookHandler};
use crate::workflows::{
    self, SampleEngineWorkerEmailWorkflow, SampleEngineWorkerLoanWorkflow, UIVisionSampleWorkflow,
};

/// KuFlow REST client from `kuflow.api`.
pub fn kuflow_client(config: &AppConfig) -> anyhow::Result<KuFlowRestClient> {
    let api = &config.kuflow.api;
    let mut builder = KuFlowRestClient::builder()
        .endpoint(api.endpoint.clone())
        .timeout(Duration::from_secs(api.timeout_secs));
    if let Some(client_id) = &api.client_id {
        builder = builder.client_id(client_id.clone());
    }
    if let Some(client_secret) = &api.client_secret {
        builder = builder.client_secret(client_secret.clone());
    }
    builder.build().context("Failed to build KuFlow client")
}

pub fn currency_converter(config: &AppConfig) -> anyhow::Result<CurrencyConverter> {
    CurrencyConverter::new(
        config.currency.api_base.clone(),
        Duration::from_secs(config.currency.timeout_secs),
    )
}

/// Workflow history store selected by `worker.event_log`.
pub async fn event_log(config: &WorkerConfig) -> anyhow::Result<Arc<dyn EventLog>> {
    match config.event_log {
        EventLogKind::Memory => {
            Ok(Arc::new(durable_kuflow::backends::InMemoryEventLog::new()) as Arc<dyn EventLog>)
        }
        #[cfg(feature = "sqlite-backend")]
        EventLogKind::Sqlite => {
            let log = durable_kuflow::backends::SqliteEventLog::new(config.history_path.clone())
                .await
                .with_context(|| {
                    format!("Failed to open workflow history at {}", config.history_path.display())
                })?;
            Ok(Arc::new(log) as Arc<dyn EventLog>)
        }
        #[cfg(not(feature = "sqlite-backend"))]
        EventLogKind::Sqlite => anyhow::bail!(
            "worker.event_log = sqlite requires the sqlite-backend feature"
        ),
    }
}

/// Workflow type run by `mode`, `None` for `rest-loan`.
#[must_use]
pub fn workflow_type(mode: SampleMode) -> Option<&'static str> {
    match mode {
        SampleMode::LoanWorker => Some(workflows::loan::WORKFLOW_TYPE),
        SampleMode::EmailWorker => Some(workflows::email::WORKFLOW_TYPE),
        SampleMode::UIVisionWorker => Some(workflows::uivision::WORKFLOW_TYPE),
        SampleMode::RestLoan => None,
    }
}

/// Email activity with the HTTP relay when `email.relay_url` is set, the
/// log transport otherwise.
pub fn email_activity(config: &AppConfig) -> anyhow::Result<EmailActivity> {
    let renderer = EmailRenderer::new().context("Failed to register email templates")?;
    let transport: Arc<dyn MailTransport> = match &config.email.relay_url {
        Some(url) => Arc::new(HttpRelayTransport::new(
            url.clone(),
            Duration::from_secs(config.server.timeout_secs),
        )?),
        None => {
            tracing::warn!("email.relay_url is not set, emails are logged instead of sent");
            Arc::new(LogTransport)
        }
    };
    Ok(EmailActivity::new(
        config.email.from.clone(),
        Arc::new(renderer),
        transport,
    ))
}

/// Activities needed by the workflow of `mode`.
pub fn activity_registry(
    config: &AppConfig,
    mode: SampleMode,
    client: &KuFlowRestClient,
) -> anyhow::Result<ActivityRegistry> {
    let mut registry = ActivityRegistry::new();
    register_kuflow_activities(&mut registry, client);

    match mode {
        SampleMode::LoanWorker => register_loan_activities(&mut registry, currency_converter(config)?),
        SampleMode::EmailWorker => registry.register(email_activity(config)?),
        SampleMode::UIVisionWorker => registry.register(UIVisionActivity::new(
            UIVisionSettings::from_config(&config.uivision)?,
            client.clone(),
        )),
        SampleMode::RestLoan => {}
    }

    Ok(registry)
}

/// Embedded worker running the workflow of `mode`.
pub async fn worker(
    config: &AppConfig,
    mode: SampleMode,
    client: &KuFlowRestClient,
) -> anyhow::Result<Option<EmbeddedWorker>> {
    if !mode.uses_engine() {
        return Ok(None);
    }

    let builder = EmbeddedWorker::builder(config.temporal.kuflow_queue.clone())
        .event_log(event_log(&config.worker).await?)
        .activities(activity_registry(config, mode, client)?)
        .max_concurrent(config.worker.max_concurrent)
        .retain_closed(config.worker.retain_closed);

    let worker = match mode {
        SampleMode::LoanWorker => builder.workflow(SampleEngineWorkerLoanWorkflow),
        SampleMode::EmailWorker => builder.workflow(SampleEngineWorkerEmailWorkflow),
        SampleMode::UIVisionWorker => builder.workflow(UIVisionSampleWorkflow),
        SampleMode::RestLoan => return Ok(None),
    }
    .build();

    let resumed = worker
        .recover()
        .await
        .context("Failed to resume open workflows")?;
    tracing::info!(resumed = resumed.len(), "Embedded worker ready");

    Ok(Some(worker))
}

/// Handler for `POST /webhooks`: the engine bridge when a worker runs, the
/// REST loan handler otherwise.
pub fn webhook_handler(
    config: &AppConfig,
    mode: SampleMode,
    client: &KuFlowRestClient,
    worker: Option<&EmbeddedWorker>,
) -> anyhow::Result<Arc<dyn WebhookHandler>> {
    match (worker, workflow_type(mode)) {
        (Some(worker), Some(workflow_type)) => {
            Ok(Arc::new(EngineBridge::new(worker.clone(), workflow_type)))
        }
        _ => Ok(Arc::new(RestLoanHandler::new(
            client.clone(),
            currency_converter(config)?,
        ))),
    }
}
