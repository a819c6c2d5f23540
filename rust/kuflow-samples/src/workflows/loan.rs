//! Loan approval workflow.

use std::collections::HashMap;

use async_trait::async_trait;
use durable_kuflow::activities::ActivityOptions;
use durable_kuflow::error::{WorkflowError, WorkflowResult};
use durable_kuflow::worker::WorkflowContext;
use durable_kuflow::workflow::Workflow;
use kuflow_rest::models::{JsonPatchOperation, ProcessItem, ProcessItemCreateParams};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{create_task_and_wait, WorkflowRequest, WorkflowResponse};
use crate::activities::currency::{parse_decimal, ConvertRequest, ConvertResponse, CONVERT};
use crate::activities::KuFlowActivities;

pub const WORKFLOW_TYPE: &str = "SampleEngineWorkerLoanWorkflow";

pub const TASK_LOAN_APPLICATION: &str = "LOAN_APPLICATION";
pub const TASK_APPROVE_LOAN: &str = "APPROVE_LOAN";
pub const TASK_NOTIFICATION_GRANTED: &str = "NOTIFICATION_GRANTED";
pub const TASK_NOTIFICATION_REJECTION: &str = "NOTIFICATION_REJECTION";

/// Loans above this amount in EUR need an explicit approval.
pub const APPROVAL_THRESHOLD_EUR: i64 = 5_000;

/// Loan application process.
///
/// 1. The applicant fills the `LOAN_APPLICATION` form; first and last name
///    are copied to the process metadata.
/// 2. The amount is converted to EUR.
/// 3. Above [`APPROVAL_THRESHOLD_EUR`] an `APPROVE_LOAN` task asks a manager,
///    who authorizes by answering `YES`.
/// 4. The initiator receives a `NOTIFICATION_GRANTED` or
///    `NOTIFICATION_REJECTION` task.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleEngineWorkerLoanWorkflow;

#[async_trait]
impl Workflow for SampleEngineWorkerLoanWorkflow {
    fn workflow_type(&self) -> &'static str {
        WORKFLOW_TYPE
    }

    async fn run(&self, ctx: WorkflowContext, input: Value) -> WorkflowResult<Value> {
        let request: WorkflowRequest = serde_json::from_value(input)?;
        let process_id = request.process_id;
        tracing::info!(%process_id, "Started loan process");

        let options = ActivityOptions::default();
        let kuflow = KuFlowActivities::new(&ctx, options.clone());

        let application = create_task_and_wait(
            &ctx,
            &kuflow,
            ProcessItemCreateParams::task(process_id, TASK_LOAN_APPLICATION),
        )
        .await?;
        update_process_metadata(&kuflow, &application).await?;

        let currency = application.task_value_as_string("CURRENCY").unwrap_or_default();
        let amount = application.task_value_as_string("AMOUNT");
        let amount_eur = convert_to_euros(&ctx, &options, &currency, amount.as_deref()).await?;

        let mut authorized = true;
        if amount_eur > Decimal::from(APPROVAL_THRESHOLD_EUR) {
            let approval = create_task_and_wait(
                &ctx,
                &kuflow,
                approve_loan_params(process_id, &application, amount_eur),
            )
            .await?;
            authorized = approval.task_value_as_string("APPROVAL").as_deref() == Some("YES");
        }

        let process = kuflow.retrieve_process(process_id).await?;
        let code = if authorized {
            TASK_NOTIFICATION_GRANTED
        } else {
            TASK_NOTIFICATION_REJECTION
        };
        let mut notification = ProcessItemCreateParams::task(process_id, code).with_id(ctx.new_uuid());
        match process.initiator_id {
            Some(initiator_id) => notification = notification.with_owner_id(initiator_id),
            None => tracing::warn!(%process_id, "Process has no initiator, notification left unassigned"),
        }
        kuflow.create_process_item(&notification).await?;

        tracing::info!(%process_id, %amount_eur, authorized, "Finished loan process");
        WorkflowResponse::new(format!("Complete process {process_id}")).into_value()
    }
}

async fn update_process_metadata(
    kuflow: &KuFlowActivities<'_>,
    application: &ProcessItem,
) -> WorkflowResult<()> {
    let first_name = application.task_value_as_string("FIRST_NAME").unwrap_or_default();
    let last_name = application.task_value_as_string("LAST_NAME").unwrap_or_default();

    kuflow
        .patch_process_metadata(
            application.process_id,
            vec![
                JsonPatchOperation::add("/FIRST_NAME", first_name),
                JsonPatchOperation::add("/LAST_NAME", last_name),
            ],
        )
        .await?;
    Ok(())
}

fn approve_loan_params(
    process_id: uuid::Uuid,
    application: &ProcessItem,
    amount_eur: Decimal,
) -> ProcessItemCreateParams {
    let data: HashMap<String, Value> = [
        ("FIRST_NAME", application.task_value_as_string("FIRST_NAME")),
        ("LAST_NAME", application.task_value_as_string("LAST_NAME")),
        ("AMOUNT", Some(amount_eur.to_string())),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), Value::from(value.unwrap_or_default())))
    .collect();

    ProcessItemCreateParams::task(process_id, TASK_APPROVE_LOAN).with_data(data)
}

/// Amount in EUR; a missing amount counts as zero.
async fn convert_to_euros(
    ctx: &WorkflowContext,
    options: &ActivityOptions,
    currency: &str,
    amount: Option<&str>,
) -> WorkflowResult<Decimal> {
    let amount_text = amount.unwrap_or("0");
    let amount = parse_decimal(amount_text)
        .ok_or_else(|| WorkflowError::Other(anyhow::anyhow!("Invalid loan amount '{amount_text}'")))?;
    if currency == "EUR" {
        return Ok(amount);
    }

    let response: ConvertResponse = ctx
        .execute_activity(
            CONVERT,
            &ConvertRequest {
                amount: amount.to_string(),
                from: currency.to_string(),
                to: "EUR".to_string(),
            },
            options,
        )
        .await?;

    parse_decimal(&response.amount).ok_or_else(|| {
        WorkflowError::Other(anyhow::anyhow!(
            "Invalid converted amount '{}'",
            response.amount
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuflow_rest::models::{JsonValue, ProcessItemTask, ProcessItemTaskState, ProcessItemType};
    use uuid::Uuid;

    fn application(values: &[(&str, Value)]) -> ProcessItem {
        ProcessItem {
            id: Uuid::now_v7(),
            item_type: ProcessItemType::Task,
            process_id: Uuid::now_v7(),
            owner_id: None,
            process_item_definition_code: Some(TASK_LOAN_APPLICATION.to_string()),
            task: Some(ProcessItemTask {
                state: ProcessItemTaskState::Completed,
                data: Some(JsonValue::from_value(
                    values
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), v.clone()))
                        .collect(),
                )),
            }),
        }
    }

    #[test]
    fn test_approve_loan_data() {
        let item = application(&[
            ("FIRST_NAME", Value::from("Ada")),
            ("LAST_NAME", Value::from("Lovelace")),
        ]);
        let params = approve_loan_params(item.process_id, &item, Decimal::new(600_050, 2));

        assert_eq!(params.process_item_definition_code, TASK_APPROVE_LOAN);
        let data = params.task.and_then(|t| t.data).unwrap();
        assert_eq!(data.value["FIRST_NAME"], "Ada");
        assert_eq!(data.value["LAST_NAME"], "Lovelace");
        assert_eq!(data.value["AMOUNT"], "6000.50");
    }
}
