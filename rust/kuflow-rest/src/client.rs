//! HTTP client for the KuFlow REST API.

use std::time::Duration;

use reqwest::{header, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{KuFlowError, KuFlowResult};
use crate::models::{
    Authentication, AuthenticationCreateParams, AuthenticationType, JsonPatchOperation, Process,
    ProcessItem, ProcessItemCreateParams, ProcessItemTaskAppendLogParams,
    ProcessItemTaskAssignParams,
};
use crate::webhook::{self, WebhookEvent};

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.kuflow.com/v2024-06-14";

const JSON_PATCH: &str = "application/json-patch+json";

/// Builder for [`KuFlowRestClient`].
#[derive(Clone)]
pub struct KuFlowRestClientBuilder {
    endpoint: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Duration,
}

impl Default for KuFlowRestClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for KuFlowRestClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuFlowRestClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KuFlowRestClientBuilder {
    /// API endpoint including the version segment.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Application client id.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Application client secret.
    #[must_use]
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`KuFlowError::Configuration`] when credentials are missing or
    /// the endpoint is not an absolute http(s) URL.
    pub fn build(self) -> KuFlowResult<KuFlowRestClient> {
        let client_id = self
            .client_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| KuFlowError::Configuration("client id is required".to_string()))?;
        let client_secret = self
            .client_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| KuFlowError::Configuration("client secret is required".to_string()))?;

        let parsed = url::Url::parse(&self.endpoint).map_err(|e| {
            KuFlowError::Configuration(format!("invalid endpoint '{}': {e}", self.endpoint))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KuFlowError::Configuration(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("kuflow-samples-rust/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(KuFlowRestClient {
            http,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }
}

/// Async client for the KuFlow REST API.
///
/// Requests authenticate with HTTP Basic using the application credentials.
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct KuFlowRestClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for KuFlowRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuFlowRestClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl KuFlowRestClient {
    /// Start building a client.
    #[must_use]
    pub fn builder() -> KuFlowRestClientBuilder {
        KuFlowRestClientBuilder::default()
    }

    /// Endpoint the client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.endpoint))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> KuFlowResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = KuFlowError::from_response(status, &body);
            tracing::debug!(status = status.as_u16(), path = %url, error = %err, "KuFlow request failed");
            return Err(err);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> KuFlowResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// `GET /processes/{id}`
    pub async fn retrieve_process(&self, id: Uuid) -> KuFlowResult<Process> {
        self.send(self.request(Method::GET, &format!("/processes/{id}")))
            .await
    }

    /// `POST /processes/{id}/~complete`
    pub async fn complete_process(&self, id: Uuid) -> KuFlowResult<Process> {
        self.send(self.request(Method::POST, &format!("/processes/{id}/~complete")))
            .await
    }

    /// `PATCH /processes/{id}/metadata` with a JSON Patch document.
    pub async fn patch_process_metadata(
        &self,
        id: Uuid,
        operations: &[JsonPatchOperation],
    ) -> KuFlowResult<Process> {
        let body = serde_json::to_vec(operations)?;
        let request = self
            .request(Method::PATCH, &format!("/processes/{id}/metadata"))
            .header(header::CONTENT_TYPE, JSON_PATCH)
            .body(body);
        self.send(request).await
    }

    /// `POST /process-items`
    pub async fn create_process_item(
        &self,
        params: &ProcessItemCreateParams,
    ) -> KuFlowResult<ProcessItem> {
        self.post("/process-items", params).await
    }

    /// `GET /process-items/{id}`
    pub async fn retrieve_process_item(&self, id: Uuid) -> KuFlowResult<ProcessItem> {
        self.send(self.request(Method::GET, &format!("/process-items/{id}")))
            .await
    }

    /// `POST /process-items/{id}/~task-claim`
    pub async fn claim_process_item_task(&self, id: Uuid) -> KuFlowResult<ProcessItem> {
        self.send(self.request(Method::POST, &format!("/process-items/{id}/~task-claim")))
            .await
    }

    /// `POST /process-items/{id}/~task-complete`
    pub async fn complete_process_item_task(&self, id: Uuid) -> KuFlowResult<ProcessItem> {
        self.send(self.request(Method::POST, &format!("/process-items/{id}/~task-complete")))
            .await
    }

    /// `POST /process-items/{id}/~task-assign`
    pub async fn assign_process_item_task(
        &self,
        id: Uuid,
        params: &ProcessItemTaskAssignParams,
    ) -> KuFlowResult<ProcessItem> {
        self.post(&format!("/process-items/{id}/~task-assign"), params)
            .await
    }

    /// `POST /process-items/{id}/~task-append-log`
    pub async fn append_process_item_task_log(
        &self,
        id: Uuid,
        params: &ProcessItemTaskAppendLogParams,
    ) -> KuFlowResult<ProcessItem> {
        self.post(&format!("/process-items/{id}/~task-append-log"), params)
            .await
    }

    /// `POST /authentications`
    pub async fn create_authentication(
        &self,
        params: &AuthenticationCreateParams,
    ) -> KuFlowResult<Authentication> {
        self.post("/authentications", params).await
    }

    /// Request a fresh workflow-engine token.
    pub async fn create_engine_token(&self) -> KuFlowResult<Authentication> {
        self.create_authentication(&AuthenticationCreateParams {
            auth_type: AuthenticationType::EngineToken,
            tenant_id: None,
        })
        .await
    }

    /// Parse a webhook request body, see [`webhook::parse_webhook_event`].
    pub fn parse_webhook_event(&self, payload: &str) -> KuFlowResult<WebhookEvent> {
        webhook::parse_webhook_event(payload)
    }
}
