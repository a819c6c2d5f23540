//! Async client for the KuFlow REST API.
//!
//! Covers the operations the sample workers need: processes, process items
//! and their tasks, engine authentications, and webhook event parsing.
//!
//! ```rust,ignore
//! use kuflow_rest::KuFlowRestClient;
//!
//! let client = KuFlowRestClient::builder()
//!     .client_id("my-app")
//!     .client_secret("secret")
//!     .build()?;
//! let process = client.retrieve_process(process_id).await?;
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod webhook;

pub use client::{KuFlowRestClient, KuFlowRestClientBuilder, DEFAULT_ENDPOINT};
pub use error::{KuFlowError, KuFlowResult};
pub use webhook::{parse_webhook_event, WebhookEvent};
