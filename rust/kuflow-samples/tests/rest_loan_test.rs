//! Webhook-driven loan sample against mocked KuFlow and currency APIs.

mod common;

use axum::http::{Method, StatusCode};
use axum_test::TestServer;
use kuflow_samples::config::SampleMode;
use kuflow_samples::server::create_app;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{process_state_changed, task_completed, test_config, MockCurrency, MockKuFlow};

struct Harness {
    server: TestServer,
    kuflow: MockKuFlow,
    currency: MockCurrency,
    process_id: Uuid,
    initiator_id: Uuid,
}

async fn harness() -> Harness {
    let (kuflow, kuflow_url) = MockKuFlow::start().await;
    let (currency, currency_url) = MockCurrency::start().await;
    let app = create_app(test_config(&kuflow_url, &currency_url), SampleMode::RestLoan)
        .await
        .unwrap();

    let process_id = Uuid::new_v4();
    let initiator_id = Uuid::new_v4();
    kuflow.add_process(process_id, Some(initiator_id));

    Harness {
        server: TestServer::new(app.router).unwrap(),
        kuflow,
        currency,
        process_id,
        initiator_id,
    }
}

/// Create a completed `code` task holding `values`, as the user would leave it.
fn completed_task(h: &Harness, code: &str, values: Value) -> Uuid {
    let item_id = Uuid::new_v4();
    h.kuflow.add_item(item_id, h.process_id, code, values);
    item_id
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "rest-loan");
    assert!(body.get("active_workflows").is_none());
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let h = harness().await;
    let response = h.server.post("/webhooks").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_running_process_requests_application() {
    let h = harness().await;
    h.server
        .post("/webhooks")
        .json(&process_state_changed(h.process_id, "RUNNING"))
        .await
        .assert_status_ok();

    let items = h.kuflow.items_with_code("LOAN_APPLICATION");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["processId"], json!(h.process_id));
    assert_eq!(items[0]["type"], "TASK");
}

#[tokio::test]
async fn test_other_process_states_are_ignored() {
    let h = harness().await;
    h.server
        .post("/webhooks")
        .json(&process_state_changed(h.process_id, "COMPLETED"))
        .await
        .assert_status_ok();
    assert!(h.kuflow.requests().is_empty());
}

#[tokio::test]
async fn test_small_loan_is_granted() {
    let h = harness().await;
    let application = completed_task(
        &h,
        "LOAN_APPLICATION",
        json!({"FIRST_NAME": "Ada", "LAST_NAME": "Lovelace", "CURRENCY": "EUR", "AMOUNT": "5000"}),
    );

    h.server
        .post("/webhooks")
        .json(&task_completed(h.process_id, application, "LOAN_APPLICATION"))
        .await
        .assert_status_ok();

    // 5000 is not above the threshold
    assert!(h.kuflow.items_with_code("APPROVE_LOAN").is_empty());
    let granted = h.kuflow.items_with_code("NOTIFICATION_GRANTED");
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0]["ownerId"], json!(h.initiator_id));
    assert_eq!(h.kuflow.process(h.process_id)["state"], "COMPLETED");
    assert!(h.currency.calls().is_empty());
}

#[tokio::test]
async fn test_large_loan_asks_for_approval() {
    let h = harness().await;
    let application = completed_task(
        &h,
        "LOAN_APPLICATION",
        json!({"FIRST_NAME": "Ada", "LAST_NAME": "Lovelace", "CURRENCY": "USD", "AMOUNT": "20000"}),
    );

    h.server
        .post("/webhooks")
        .json(&task_completed(h.process_id, application, "LOAN_APPLICATION"))
        .await
        .assert_status_ok();

    assert_eq!(h.currency.calls(), vec!["usd.json".to_string()]);
    let approvals = h.kuflow.items_with_code("APPROVE_LOAN");
    assert_eq!(approvals.len(), 1);
    let data = &approvals[0]["task"]["data"]["value"];
    assert_eq!(data["FIRST_NAME"], "Ada");
    assert_eq!(data["LAST_NAME"], "Lovelace");
    assert!(data["AMOUNT"].as_str().unwrap().starts_with("10000"));
    assert_eq!(h.kuflow.process(h.process_id)["state"], "RUNNING");
}

#[tokio::test]
async fn test_approval_decides_notification() {
    let h = harness().await;
    let approval = completed_task(&h, "APPROVE_LOAN", json!({"APPROVAL": "NO"}));

    h.server
        .post("/webhooks")
        .json(&task_completed(h.process_id, approval, "APPROVE_LOAN"))
        .await
        .assert_status_ok();

    assert!(h.kuflow.items_with_code("NOTIFICATION_GRANTED").is_empty());
    let rejected = h.kuflow.items_with_code("NOTIFICATION_REJECTION");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["ownerId"], json!(h.initiator_id));
    assert_eq!(h.kuflow.process(h.process_id)["state"], "COMPLETED");

    let h = harness().await;
    let approval = completed_task(&h, "APPROVE_LOAN", json!({"APPROVAL": "YES"}));
    h.server
        .post("/webhooks")
        .json(&task_completed(h.process_id, approval, "APPROVE_LOAN"))
        .await
        .assert_status_ok();
    assert_eq!(h.kuflow.items_with_code("NOTIFICATION_GRANTED").len(), 1);
}

#[tokio::test]
async fn test_forbidden_and_conflict_are_ignored() {
    for status in [StatusCode::FORBIDDEN, StatusCode::CONFLICT] {
        let h = harness().await;
        h.kuflow.fail(Method::POST, "/process-items", status);

        h.server
            .post("/webhooks")
            .json(&process_state_changed(h.process_id, "RUNNING"))
            .await
            .assert_status_ok();
        assert_eq!(h.kuflow.count(&Method::POST, "/process-items"), 1);
    }
}

#[tokio::test]
async fn test_other_failures_surface() {
    let h = harness().await;
    h.kuflow
        .fail(Method::POST, "/process-items", StatusCode::INTERNAL_SERVER_ERROR);

    let response = h
        .server
        .post("/webhooks")
        .json(&process_state_changed(h.process_id, "RUNNING"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "internal_error");
}

#[tokio::test]
async fn test_unsupported_currency_surfaces() {
    let h = harness().await;
    let application = completed_task(
        &h,
        "LOAN_APPLICATION",
        json!({"CURRENCY": "JPY", "AMOUNT": "100"}),
    );

    h.server
        .post("/webhooks")
        .json(&task_completed(h.process_id, application, "LOAN_APPLICATION"))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.kuflow.items_with_code("NOTIFICATION_GRANTED").is_empty());
}
