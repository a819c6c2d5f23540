//! Workflow engine plumbing.
//!
//! Workflows run on the embedded [`durable_kuflow::EmbeddedWorker`]; the
//! [`EngineBridge`] turns KuFlow webhook events into workflow starts and
//! signals. When `temporal.target` is set an authenticated gRPC
//! [`EngineConnection`] to the remote engine is opened as well.

pub mod bridge;
pub mod connection;

pub use bridge::EngineBridge;
pub use connection::{BearerTokenInterceptor, EngineConnection, EngineToken};
