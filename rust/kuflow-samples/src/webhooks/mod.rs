//! `POST /webhooks` endpoint.
//!
//! KuFlow posts an event whenever a process or a task changes state. The
//! payload is parsed once here and handed to the [`WebhookHandler`] of the
//! running sample: the engine bridge in worker modes, the REST loan handler
//! otherwise.

pub mod loan;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use durable_kuflow::WorkflowError;
use kuflow_rest::{parse_webhook_event, KuFlowError, WebhookEvent};
use serde::Serialize;
use thiserror::Error;

use crate::activities::currency::CurrencyError;
use crate::AppState;

pub use loan::RestLoanHandler;

/// Reacts to KuFlow webhook events.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError>;
}

/// Why a webhook could not be processed.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    KuFlow(#[from] KuFlowError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Invalid task data: {0}")]
    InvalidTaskData(String),

    #[error("No workflow for process {0}")]
    UnknownWorkflow(String),
}

impl WebhookError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::UnknownWorkflow(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned with non-2xx answers.
#[derive(Debug, Serialize)]
pub struct WebhookErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match status {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal_error",
        };
        let body = Json(WebhookErrorResponse {
            error,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// Create the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks", post(handle_webhook))
}

async fn handle_webhook(State(state): State<AppState>, payload: String) -> Result<StatusCode, WebhookError> {
    tracing::info!(payload = %payload, "Event");

    let event = parse_webhook_event(&payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    if let Err(e) = state.webhooks.handle(&event).await {
        tracing::error!(
            handler = state.webhooks.name(),
            event_id = event.id(),
            event_type = event.event_type(),
            error = %e,
            "Webhook event failed"
        );
        return Err(e);
    }
    Ok(StatusCode::OK)
}
