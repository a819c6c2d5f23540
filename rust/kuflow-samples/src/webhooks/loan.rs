//! Loan approval driven directly by webhooks.
//!
//! Same business rules as the loan workflow, but every step reacts to a
//! KuFlow event instead of running inside a workflow:
//!
//! | event                               | reaction                                  |
//! |-------------------------------------|-------------------------------------------|
//! | process `RUNNING`                   | create `LOAN_APPLICATION`                 |
//! | `LOAN_APPLICATION` task `COMPLETED` | convert to EUR; ask approval or notify    |
//! | `APPROVE_LOAN` task `COMPLETED`     | notify granted or rejected                |
//!
//! Notifying assigns the notification task to the process initiator and
//! completes the process.

use async_trait::async_trait;
use kuflow_rest::models::{
    ProcessItem, ProcessItemCreateParams, ProcessItemTaskAssignParams, ProcessItemTaskState,
    ProcessState,
};
use kuflow_rest::webhook::{ProcessItemTaskStateChangedData, ProcessStateChangedData};
use kuflow_rest::{KuFlowRestClient, WebhookEvent};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{WebhookError, WebhookHandler};
use crate::activities::currency::{parse_decimal, CurrencyConverter};
use crate::workflows::loan::{
    APPROVAL_THRESHOLD_EUR, TASK_APPROVE_LOAN, TASK_LOAN_APPLICATION, TASK_NOTIFICATION_GRANTED,
    TASK_NOTIFICATION_REJECTION,
};

/// Webhook-driven loan approval.
#[derive(Debug, Clone)]
pub struct RestLoanHandler {
    client: KuFlowRestClient,
    converter: CurrencyConverter,
}

impl RestLoanHandler {
    #[must_use]
    pub fn new(client: KuFlowRestClient, converter: CurrencyConverter) -> Self {
        Self { client, converter }
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        match event {
            WebhookEvent::ProcessStateChanged { data, .. } => self.on_process_state_changed(data).await,
            WebhookEvent::ProcessItemTaskStateChanged { data, .. } => {
                self.on_task_state_changed(data).await
            }
            WebhookEvent::Unknown { id, event_type } => {
                tracing::debug!(event_id = %id, event_type = %event_type, "Ignoring event");
                Ok(())
            }
        }
    }

    async fn on_process_state_changed(&self, data: &ProcessStateChangedData) -> Result<(), WebhookError> {
        if data.process_state == ProcessState::Running {
            self.client
                .create_process_item(&ProcessItemCreateParams::task(
                    data.process_id,
                    TASK_LOAN_APPLICATION,
                ))
                .await?;
            tracing::info!(process_id = %data.process_id, "Loan application requested");
        }
        Ok(())
    }

    async fn on_task_state_changed(
        &self,
        data: &ProcessItemTaskStateChangedData,
    ) -> Result<(), WebhookError> {
        if data.process_item_task_state != ProcessItemTaskState::Completed {
            return Ok(());
        }
        match data.process_item_definition_code.as_str() {
            TASK_LOAN_APPLICATION => self.on_loan_application_completed(data).await,
            TASK_APPROVE_LOAN => self.on_approve_loan_completed(data).await,
            _ => Ok(()),
        }
    }

    async fn on_loan_application_completed(
        &self,
        data: &ProcessItemTaskStateChangedData,
    ) -> Result<(), WebhookError> {
        let application = self.client.retrieve_process_item(data.process_item_id).await?;
        let currency = application.task_value_as_string("CURRENCY").unwrap_or_default();
        let amount = application.task_value_as_string("AMOUNT");
        let amount_eur = self.convert_to_euros(&currency, amount.as_deref()).await?;

        if amount_eur > Decimal::from(APPROVAL_THRESHOLD_EUR) {
            self.client
                .create_process_item(&approve_loan_params(&application, amount_eur))
                .await?;
            tracing::info!(process_id = %data.process_id, %amount_eur, "Loan approval requested");
            return Ok(());
        }

        self.notify(data.process_id, TASK_NOTIFICATION_GRANTED).await
    }

    async fn on_approve_loan_completed(
        &self,
        data: &ProcessItemTaskStateChangedData,
    ) -> Result<(), WebhookError> {
        let approval = self.client.retrieve_process_item(data.process_item_id).await?;
        let code = if approval.task_value_as_string("APPROVAL").as_deref() == Some("YES") {
            TASK_NOTIFICATION_GRANTED
        } else {
            TASK_NOTIFICATION_REJECTION
        };
        self.notify(data.process_id, code).await
    }

    /// Create the notification task, hand it to the process initiator and
    /// complete the process.
    async fn notify(&self, process_id: Uuid, code: &str) -> Result<(), WebhookError> {
        let notification = self
            .client
            .create_process_item(&ProcessItemCreateParams::task(process_id, code))
            .await?;

        let process = self.client.retrieve_process(process_id).await?;
        match process.initiator_id {
            Some(initiator_id) => {
                self.client
                    .assign_process_item_task(
                        notification.id,
                        &ProcessItemTaskAssignParams::owner(initiator_id),
                    )
                    .await?;
            }
            None => tracing::warn!(%process_id, "Process has no initiator, notification left unassigned"),
        }

        self.client.complete_process(process_id).await?;
        tracing::info!(%process_id, notification = code, "Loan process completed");
        Ok(())
    }

    async fn convert_to_euros(&self, currency: &str, amount: Option<&str>) -> Result<Decimal, WebhookError> {
        let amount_text = amount.unwrap_or("0");
        let amount = parse_decimal(amount_text)
            .ok_or_else(|| WebhookError::InvalidTaskData(format!("AMOUNT '{amount_text}'")))?;
        if currency == "EUR" {
            return Ok(amount);
        }

        let converted = self.converter.convert(&amount.to_string(), currency, "EUR").await?;
        parse_decimal(&converted)
            .ok_or_else(|| WebhookError::InvalidTaskData(format!("converted amount '{converted}'")))
    }
}

fn approve_loan_params(application: &ProcessItem, amount_eur: Decimal) -> ProcessItemCreateParams {
    let field = |key: &str| {
        serde_json::Value::from(application.task_value_as_string(key).unwrap_or_default())
    };
    let data = [
        ("FIRST_NAME".to_string(), field("FIRST_NAME")),
        ("LAST_NAME".to_string(), field("LAST_NAME")),
        ("AMOUNT".to_string(), serde_json::Value::from(amount_eur.to_string())),
    ]
    .into_iter()
    .collect();

    ProcessItemCreateParams::task(application.process_id, TASK_APPROVE_LOAN).with_data(data)
}

#[async_trait]
impl WebhookHandler for RestLoanHandler {
    fn name(&self) -> &'static str {
        "rest-loan"
    }

    /// Forbidden and conflict answers from KuFlow mean the process moved on
    /// (completed, cancelled or already advanced); those events are dropped.
    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        match self.dispatch(event).await {
            Err(WebhookError::KuFlow(e)) if e.status() == Some(403) => {
                tracing::error!(
                    error = %e,
                    "The resource cannot be accessed, the process may be completed or cancelled. We ignore this event. Id: {}",
                    event.id()
                );
                Ok(())
            }
            Err(WebhookError::KuFlow(e)) if e.status() == Some(409) => {
                tracing::error!(
                    error = %e,
                    "Invalid state of resource. We ignore this event. Id: {}",
                    event.id()
                );
                Ok(())
            }
            other => other,
        }
    }
}
