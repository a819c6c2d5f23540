//! Email notification workflow.

use async_trait::async_trait;
use durable_kuflow::activities::ActivityOptions;
use durable_kuflow::error::WorkflowResult;
use durable_kuflow::worker::WorkflowContext;
use durable_kuflow::workflow::Workflow;
use kuflow_rest::models::{ProcessItem, ProcessItemCreateParams, ProcessItemTaskAppendLogParams};
use serde_json::Value;
use uuid::Uuid;

use super::{create_task_and_wait, WorkflowRequest, WorkflowResponse};
use crate::activities::email::{Email, SendMailRequest, EMAIL_TEMPLATE, SEND_MAIL};
use crate::activities::KuFlowActivities;

pub const WORKFLOW_TYPE: &str = "SampleEngineWorkerEmailWorkflow";

pub const TASK_FILL_INFO: &str = "FILL_INFO";
pub const TASK_SEND_EMAIL: &str = "SEND_EMAIL";

pub const FIELD_EMAIL_RECIPIENT: &str = "EMAIL_RECIPIENT";
pub const FIELD_EMAIL_SUBJECT: &str = "EMAIL_SUBJECT";
pub const FIELD_EMAIL_BODY: &str = "EMAIL_BODY";

/// Collects recipient, subject and body in a `FILL_INFO` task, then sends
/// the mail from a `SEND_EMAIL` task claimed by the worker itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleEngineWorkerEmailWorkflow;

#[async_trait]
impl Workflow for SampleEngineWorkerEmailWorkflow {
    fn workflow_type(&self) -> &'static str {
        WORKFLOW_TYPE
    }

    async fn run(&self, ctx: WorkflowContext, input: Value) -> WorkflowResult<Value> {
        let request: WorkflowRequest = serde_json::from_value(input)?;
        let process_id = request.process_id;
        tracing::info!(%process_id, "Started email process");

        let options = ActivityOptions::default();
        let kuflow = KuFlowActivities::new(&ctx, options.clone());
        let kuflow_waiting = KuFlowActivities::new(&ctx, ActivityOptions::long_running());

        let fill_info = create_task_and_wait(
            &ctx,
            &kuflow_waiting,
            ProcessItemCreateParams::task(process_id, TASK_FILL_INFO),
        )
        .await?;

        let send_email_id = ctx.new_uuid();
        kuflow
            .create_process_item(
                &ProcessItemCreateParams::task(process_id, TASK_SEND_EMAIL).with_id(send_email_id),
            )
            .await?;
        kuflow.claim_process_item_task(send_email_id).await?;

        let email = email_from(&fill_info);
        kuflow
            .append_process_item_task_log(
                send_email_id,
                ProcessItemTaskAppendLogParams::info(format!("Sending email to {}", email.to)),
            )
            .await?;

        let _: Value = ctx
            .execute_activity(SEND_MAIL, &SendMailRequest { email }, &options)
            .await?;

        kuflow
            .append_process_item_task_log(send_email_id, ProcessItemTaskAppendLogParams::info("Email sent!"))
            .await?;
        kuflow.complete_process_item_task(send_email_id).await?;

        let process = kuflow.complete_process(process_id).await?;
        tracing::info!(%process_id, "Finished email process");
        WorkflowResponse::new(completed_message(process.id)).into_value()
    }
}

fn completed_message(process_id: Uuid) -> String {
    format!("Completed process {process_id}")
}

/// Mail built from the `FILL_INFO` form.
fn email_from(fill_info: &ProcessItem) -> Email {
    let field = |key: &str| fill_info.task_value_as_string(key).unwrap_or_default();
    Email::new(EMAIL_TEMPLATE, field(FIELD_EMAIL_RECIPIENT))
        .with_variable("subject", field(FIELD_EMAIL_SUBJECT))
        .with_variable("body", field(FIELD_EMAIL_BODY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuflow_rest::models::{JsonValue, ProcessItemTask, ProcessItemTaskState, ProcessItemType};

    #[test]
    fn test_email_from_fill_info() {
        let item = ProcessItem {
            id: Uuid::now_v7(),
            item_type: ProcessItemType::Task,
            process_id: Uuid::now_v7(),
            owner_id: None,
            process_item_definition_code: Some(TASK_FILL_INFO.to_string()),
            task: Some(ProcessItemTask {
                state: ProcessItemTaskState::Completed,
                data: Some(JsonValue::from_value(
                    [
                        (FIELD_EMAIL_RECIPIENT.to_string(), Value::from("ops@example.com")),
                        (FIELD_EMAIL_SUBJECT.to_string(), Value::from("Weekly report")),
                    ]
                    .into_iter()
                    .collect(),
                )),
            }),
        };

        let email = email_from(&item);
        assert_eq!(email.template, "email");
        assert_eq!(email.to, "ops@example.com");
        assert_eq!(email.variables["subject"], "Weekly report");
        assert_eq!(email.variables["body"], "");
    }
}
