//! UI.Vision robot workflow.

use std::time::Duration;

use async_trait::async_trait;
use durable_kuflow::activities::ActivityOptions;
use durable_kuflow::error::WorkflowResult;
use durable_kuflow::worker::WorkflowContext;
use durable_kuflow::workflow::Workflow;
use kuflow_rest::models::ProcessItemCreateParams;
use serde_json::Value;

use super::{WorkflowRequest, WorkflowResponse};
use crate::activities::uivision::{ExecuteUIVisionMacroRequest, EXECUTE_MACRO};
use crate::activities::KuFlowActivities;

pub const WORKFLOW_TYPE: &str = "UIVisionSampleWorkflow";

pub const TASK_ROBOT_RESULTS: &str = "ROBOT_RESULTS";

/// Creates a `ROBOT_RESULTS` task, claims it for the worker, runs the macro
/// and completes the task. The macro log ends up in the task log.
#[derive(Debug, Clone, Copy, Default)]
pub struct UIVisionSampleWorkflow;

/// Robot runs get more time per attempt than plain API calls.
fn activity_options() -> ActivityOptions {
    ActivityOptions::default().with_start_to_close_timeout(Duration::from_secs(15 * 60))
}

#[async_trait]
impl Workflow for UIVisionSampleWorkflow {
    fn workflow_type(&self) -> &'static str {
        WORKFLOW_TYPE
    }

    async fn run(&self, ctx: WorkflowContext, input: Value) -> WorkflowResult<Value> {
        let request: WorkflowRequest = serde_json::from_value(input)?;
        let process_id = request.process_id;

        let options = activity_options();
        let kuflow = KuFlowActivities::new(&ctx, options.clone());

        let process_item_id = ctx.new_uuid();
        kuflow
            .create_process_item(
                &ProcessItemCreateParams::task(process_id, TASK_ROBOT_RESULTS).with_id(process_item_id),
            )
            .await?;
        kuflow.claim_process_item_task(process_item_id).await?;

        let _: Value = ctx
            .execute_activity(
                EXECUTE_MACRO,
                &ExecuteUIVisionMacroRequest { process_item_id },
                &options,
            )
            .await?;

        kuflow.complete_process_item_task(process_item_id).await?;

        tracing::info!(%process_id, "UI.Vision process finished");
        WorkflowResponse::new(format!("Complete process {process_id}")).into_value()
    }
}
