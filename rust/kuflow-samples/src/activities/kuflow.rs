//! KuFlow REST operations exposed as activities.
//!
//! Workflows never call the REST client directly: every call goes through
//! an activity so it gets the workflow's timeouts and retry policy and is
//! recorded in the workflow history. [`KuFlowActivities`] is the typed stub
//! workflows use to schedule them.

use async_trait::async_trait;
use durable_kuflow::activities::{Activity, ActivityContext, ActivityOptions, ActivityResult};
use durable_kuflow::error::WorkflowResult;
use durable_kuflow::worker::WorkflowContext;
use kuflow_rest::models::{
    JsonPatchOperation, Process, ProcessItem, ProcessItemCreateParams,
    ProcessItemTaskAppendLogParams, ProcessItemTaskAssignParams,
};
use kuflow_rest::KuFlowRestClient;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kuflow_failure;

/// Request naming a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub process_id: Uuid,
}

/// Request naming a process item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemRequest {
    pub process_item_id: Uuid,
}

/// Input of `KuFlow_Engine_patchProcessMetadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetadataPatchRequest {
    pub process_id: Uuid,
    pub json_patch: Vec<JsonPatchOperation>,
}

/// Input of `KuFlow_Engine_assignProcessItemTask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskAssignRequest {
    pub process_item_id: Uuid,
    #[serde(flatten)]
    pub params: ProcessItemTaskAssignParams,
}

/// Input of `KuFlow_Engine_appendProcessItemTaskLog`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskAppendLogRequest {
    pub process_item_id: Uuid,
    pub log: ProcessItemTaskAppendLogParams,
}

/// The KuFlow operations available as activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KuFlowOperation {
    RetrieveProcess,
    CompleteProcess,
    PatchProcessMetadata,
    CreateProcessItem,
    RetrieveProcessItem,
    ClaimProcessItemTask,
    CompleteProcessItemTask,
    AssignProcessItemTask,
    AppendProcessItemTaskLog,
}

impl KuFlowOperation {
    /// Every operation, in registration order.
    pub const ALL: [Self; 9] = [
        Self::RetrieveProcess,
        Self::CompleteProcess,
        Self::PatchProcessMetadata,
        Self::CreateProcessItem,
        Self::RetrieveProcessItem,
        Self::ClaimProcessItemTask,
        Self::CompleteProcessItemTask,
        Self::AssignProcessItemTask,
        Self::AppendProcessItemTaskLog,
    ];

    /// Activity name of the operation.
    #[must_use]
    pub fn activity_name(self) -> &'static str {
        match self {
            Self::RetrieveProcess => "KuFlow_Engine_retrieveProcess",
            Self::CompleteProcess => "KuFlow_Engine_completeProcess",
            Self::PatchProcessMetadata => "KuFlow_Engine_patchProcessMetadata",
            Self::CreateProcessItem => "KuFlow_Engine_createProcessItem",
            Self::RetrieveProcessItem => "KuFlow_Engine_retrieveProcessItem",
            Self::ClaimProcessItemTask => "KuFlow_Engine_claimProcessItemTask",
            Self::CompleteProcessItemTask => "KuFlow_Engine_completeProcessItemTask",
            Self::AssignProcessItemTask => "KuFlow_Engine_assignProcessItemTask",
            Self::AppendProcessItemTaskLog => "KuFlow_Engine_appendProcessItemTaskLog",
        }
    }
}

/// One KuFlow operation backed by the REST client.
#[derive(Debug, Clone)]
pub struct KuFlowActivity {
    operation: KuFlowOperation,
    client: KuFlowRestClient,
}

impl KuFlowActivity {
    #[must_use]
    pub fn new(operation: KuFlowOperation, client: KuFlowRestClient) -> Self {
        Self { operation, client }
    }

    /// One activity per operation, sharing `client`.
    #[must_use]
    pub fn all(client: &KuFlowRestClient) -> Vec<Self> {
        KuFlowOperation::ALL
            .into_iter()
            .map(|op| Self::new(op, client.clone()))
            .collect()
    }

    async fn call(&self, input: serde_json::Value) -> Result<ActivityResult, ActivityResult> {
        let name = self.operation.activity_name();
        let client = &self.client;

        let output = match self.operation {
            KuFlowOperation::RetrieveProcess => {
                let req: ProcessRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .retrieve_process(req.process_id)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::CompleteProcess => {
                let req: ProcessRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .complete_process(req.process_id)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::PatchProcessMetadata => {
                let req: ProcessMetadataPatchRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .patch_process_metadata(req.process_id, &req.json_patch)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::CreateProcessItem => {
                let req: ProcessItemCreateParams = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .create_process_item(&req)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::RetrieveProcessItem => {
                let req: ProcessItemRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .retrieve_process_item(req.process_item_id)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::ClaimProcessItemTask => {
                let req: ProcessItemRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .claim_process_item_task(req.process_item_id)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::CompleteProcessItemTask => {
                let req: ProcessItemRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .complete_process_item_task(req.process_item_id)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::AssignProcessItemTask => {
                let req: ProcessItemTaskAssignRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .assign_process_item_task(req.process_item_id, &req.params)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
            KuFlowOperation::AppendProcessItemTaskLog => {
                let req: ProcessItemTaskAppendLogRequest = ActivityResult::parse_input(input)?;
                ActivityResult::success(
                    client
                        .append_process_item_task_log(req.process_item_id, &req.log)
                        .await
                        .map_err(|e| kuflow_failure(name, &e))?,
                )
            }
        };
        Ok(output)
    }
}

#[async_trait]
impl Activity for KuFlowActivity {
    fn name(&self) -> &'static str {
        self.operation.activity_name()
    }

    async fn execute(&self, ctx: &ActivityContext, input: serde_json::Value) -> ActivityResult {
        tracing::debug!(
            activity = self.name(),
            activity_id = %ctx.activity_id,
            attempt = ctx.attempt,
            "Calling KuFlow"
        );
        match self.call(input).await {
            Ok(result) | Err(result) => result,
        }
    }
}

/// Typed stub for scheduling KuFlow activities from a workflow.
#[derive(Debug, Clone)]
pub struct KuFlowActivities<'a> {
    ctx: &'a WorkflowContext,
    options: ActivityOptions,
}

impl<'a> KuFlowActivities<'a> {
    #[must_use]
    pub fn new(ctx: &'a WorkflowContext, options: ActivityOptions) -> Self {
        Self { ctx, options }
    }

    async fn run<I, O>(&self, operation: KuFlowOperation, input: &I) -> WorkflowResult<O>
    where
        I: Serialize + Sync,
        O: serde::de::DeserializeOwned,
    {
        self.ctx
            .execute_activity(operation.activity_name(), input, &self.options)
            .await
    }

    pub async fn retrieve_process(&self, process_id: Uuid) -> WorkflowResult<Process> {
        self.run(KuFlowOperation::RetrieveProcess, &ProcessRequest { process_id })
            .await
    }

    pub async fn complete_process(&self, process_id: Uuid) -> WorkflowResult<Process> {
        self.run(KuFlowOperation::CompleteProcess, &ProcessRequest { process_id })
            .await
    }

    pub async fn patch_process_metadata(
        &self,
        process_id: Uuid,
        json_patch: Vec<JsonPatchOperation>,
    ) -> WorkflowResult<Process> {
        self.run(
            KuFlowOperation::PatchProcessMetadata,
            &ProcessMetadataPatchRequest {
                process_id,
                json_patch,
            },
        )
        .await
    }

    pub async fn create_process_item(
        &self,
        params: &ProcessItemCreateParams,
    ) -> WorkflowResult<ProcessItem> {
        self.run(KuFlowOperation::CreateProcessItem, params).await
    }

    pub async fn retrieve_process_item(&self, process_item_id: Uuid) -> WorkflowResult<ProcessItem> {
        self.run(
            KuFlowOperation::RetrieveProcessItem,
            &ProcessItemRequest { process_item_id },
        )
        .await
    }

    pub async fn claim_process_item_task(&self, process_item_id: Uuid) -> WorkflowResult<ProcessItem> {
        self.run(
            KuFlowOperation::ClaimProcessItemTask,
            &ProcessItemRequest { process_item_id },
        )
        .await
    }

    pub async fn complete_process_item_task(
        &self,
        process_item_id: Uuid,
    ) -> WorkflowResult<ProcessItem> {
        self.run(
            KuFlowOperation::CompleteProcessItemTask,
            &ProcessItemRequest { process_item_id },
        )
        .await
    }

    pub async fn assign_process_item_task(
        &self,
        process_item_id: Uuid,
        owner_id: Uuid,
    ) -> WorkflowResult<ProcessItem> {
        self.run(
            KuFlowOperation::AssignProcessItemTask,
            &ProcessItemTaskAssignRequest {
                process_item_id,
                params: ProcessItemTaskAssignParams::owner(owner_id),
            },
        )
        .await
    }

    pub async fn append_process_item_task_log(
        &self,
        process_item_id: Uuid,
        log: ProcessItemTaskAppendLogParams,
    ) -> WorkflowResult<ProcessItem> {
        self.run(
            KuFlowOperation::AppendProcessItemTaskLog,
            &ProcessItemTaskAppendLogRequest {
                process_item_id,
                log,
            },
        )
        .await
    }
}
