//! Remote engine channel setup with the engine token from KuFlow.

mod common;

use axum::http::{Method, StatusCode};
use kuflow_samples::bootstrap::kuflow_client;
use kuflow_samples::config::{ConfigurationError, SampleMode, TemporalConfig};
use kuflow_samples::engine::EngineConnection;
use kuflow_samples::server::create_app;
use tonic::service::Interceptor;

use common::{test_config, MockKuFlow};

fn temporal(target: &str) -> TemporalConfig {
    TemporalConfig {
        target: Some(target.to_string()),
        namespace: Some("kuflow-samples".to_string()),
        ..TemporalConfig::default()
    }
}

#[tokio::test]
async fn test_connect_fetches_engine_token() {
    let (kuflow, kuflow_url) = MockKuFlow::start().await;
    let client = kuflow_client(&test_config(&kuflow_url, "http://127.0.0.1:1")).unwrap();

    let connection = EngineConnection::connect(&temporal("127.0.0.1:7233"), &client)
        .await
        .unwrap();

    assert_eq!(connection.target(), "https://127.0.0.1:7233");
    assert_eq!(connection.namespace(), Some("kuflow-samples"));
    assert_eq!(connection.token().get().as_deref(), Some("engine-token-1"));

    let auth = kuflow
        .requests()
        .into_iter()
        .find(|r| r.path == "/authentications")
        .unwrap();
    assert_eq!(auth.method, Method::POST);
    assert_eq!(auth.body["type"], "ENGINE_TOKEN");

    let mut interceptor =
        kuflow_samples::engine::BearerTokenInterceptor::new(connection.token().clone());
    let request = interceptor.call(tonic::Request::new(())).unwrap();
    assert_eq!(
        request.metadata().get("authorization").unwrap(),
        "Bearer engine-token-1"
    );
}

#[tokio::test]
async fn test_rejected_credentials_fail_connect() {
    let (kuflow, kuflow_url) = MockKuFlow::start().await;
    kuflow.fail(Method::POST, "/authentications", StatusCode::UNAUTHORIZED);
    let client = kuflow_client(&test_config(&kuflow_url, "http://127.0.0.1:1")).unwrap();

    let err = EngineConnection::connect(&temporal("127.0.0.1:7233"), &client)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::ConnectionFailed { .. }));
}

#[tokio::test]
async fn test_app_opens_engine_connection_when_targeted() {
    let (_kuflow, kuflow_url) = MockKuFlow::start().await;
    let mut config = test_config(&kuflow_url, "http://127.0.0.1:1");
    config.temporal = temporal("engine.example.com:443");

    let app = create_app(config.clone(), SampleMode::LoanWorker).await.unwrap();
    let engine = app.engine.as_ref().unwrap();
    assert_eq!(engine.target(), "https://engine.example.com:443");

    // The webhook-only sample never talks to the engine
    let app = create_app(config, SampleMode::RestLoan).await.unwrap();
    assert!(app.engine.is_none());
    assert!(app.state.worker.is_none());
}
