//! In-process mocks of the KuFlow and currency APIs shared by the
//! integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kuflow_samples::config::AppConfig;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Configuration pointing every outgoing call at the mocks.
pub fn test_config(kuflow_url: &str, currency_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.kuflow.api.endpoint = kuflow_url.to_string();
    config.kuflow.api.client_id = Some("sample-app".to_string());
    config.kuflow.api.client_secret = Some("sample-secret".to_string());
    config.kuflow.api.timeout_secs = 5;
    config.currency.api_base = format!("{currency_url}/currencies");
    config.currency.timeout_secs = 5;
    config
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    processes: HashMap<Uuid, Value>,
    items: HashMap<Uuid, Value>,
    logs: Vec<(Uuid, String, String)>,
    requests: Vec<Recorded>,
    failures: HashMap<(Method, String), StatusCode>,
}

/// Stateful KuFlow API: process items created through it can be read back,
/// claimed, assigned and completed.
#[derive(Clone, Default)]
pub struct MockKuFlow {
    state: Arc<Mutex<MockState>>,
}

impl MockKuFlow {
    pub async fn start() -> (Self, String) {
        let mock = Self::default();
        let router = Router::new().fallback(handle).with_state(mock.clone());
        let url = spawn(router).await;
        (mock, url)
    }

    pub fn add_process(&self, id: Uuid, initiator_id: Option<Uuid>) {
        let mut process = json!({"id": id, "state": "RUNNING", "metadata": {"value": {}}});
        if let Some(initiator_id) = initiator_id {
            process["initiatorId"] = json!(initiator_id);
        }
        self.state.lock().processes.insert(id, process);
    }

    /// A task the user already completed with `values`.
    pub fn add_item(&self, id: Uuid, process_id: Uuid, code: &str, values: Value) {
        let item = json!({
            "id": id,
            "type": "TASK",
            "processId": process_id,
            "processItemDefinitionCode": code,
            "task": {"state": "COMPLETED", "data": {"valid": true, "value": values}},
        });
        self.state.lock().items.insert(id, item);
    }

    /// Answer every `method path` request with `status`.
    pub fn fail(&self, method: Method, path: &str, status: StatusCode) {
        self.state
            .lock()
            .failures
            .insert((method, path.to_string()), status);
    }

    pub fn process(&self, id: Uuid) -> Value {
        self.state.lock().processes.get(&id).cloned().unwrap_or(Value::Null)
    }

    pub fn item(&self, id: Uuid) -> Value {
        self.state.lock().items.get(&id).cloned().unwrap_or(Value::Null)
    }

    pub fn items_with_code(&self, code: &str) -> Vec<Value> {
        self.state
            .lock()
            .items
            .values()
            .filter(|item| item["processItemDefinitionCode"] == code)
            .cloned()
            .collect()
    }

    /// Fill the task form as a user would.
    pub fn set_task_data(&self, id: Uuid, values: Value) {
        if let Some(item) = self.state.lock().items.get_mut(&id) {
            item["task"]["data"] = json!({"valid": true, "value": values});
        }
    }

    pub fn logs(&self, id: Uuid) -> Vec<(String, String)> {
        self.state
            .lock()
            .logs
            .iter()
            .filter(|(item, _, _)| *item == id)
            .map(|(_, level, message)| (level.clone(), message.clone()))
            .collect()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().requests.clone()
    }

    pub fn count(&self, method: &Method, path_suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == *method && r.path.ends_with(path_suffix))
            .count()
    }

    /// Wait until an item with `code` exists and return its id.
    pub async fn wait_for_item(&self, code: &str) -> Uuid {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(item) = self.items_with_code(code).first() {
                    return item["id"].as_str().and_then(|id| id.parse().ok()).unwrap();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("no {code} item was created"))
    }
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"status": status.as_u16(), "code": "MOCK", "message": message})),
    )
        .into_response()
}

async fn handle(State(mock): State<MockKuFlow>, method: Method, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut state = mock.state.lock();
    state.requests.push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body: body.clone(),
    });
    if let Some(status) = state.failures.get(&(method.clone(), path.clone())) {
        return api_error(*status, "Injected failure");
    }

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    // Unknown or malformed ids fall back to the nil id, which is never stored.
    let id = segments
        .get(1)
        .and_then(|s| s.parse::<Uuid>().ok())
        .unwrap_or_default();

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["processes", _]) => match state.processes.get(&id) {
            Some(process) => Json(process.clone()).into_response(),
            None => api_error(StatusCode::NOT_FOUND, "Process not found"),
        },
        ("POST", ["processes", _, "~complete"]) => {
            match state.processes.get_mut(&id) {
                Some(process) => {
                    process["state"] = json!("COMPLETED");
                    Json(process.clone()).into_response()
                }
                None => api_error(StatusCode::NOT_FOUND, "Process not found"),
            }
        }
        ("PATCH", ["processes", _, "metadata"]) => {
            match state.processes.get_mut(&id) {
                Some(process) => {
                    for op in body.as_array().into_iter().flatten() {
                        let key = op["path"].as_str().unwrap_or_default().trim_start_matches('/');
                        process["metadata"]["value"][key] = op["value"].clone();
                    }
                    Json(process.clone()).into_response()
                }
                None => api_error(StatusCode::NOT_FOUND, "Process not found"),
            }
        }
        ("POST", ["process-items"]) => {
            let item_id = body["id"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .unwrap_or_else(Uuid::new_v4);
            let mut item = json!({
                "id": item_id,
                "type": body["type"],
                "processId": body["processId"],
                "processItemDefinitionCode": body["processItemDefinitionCode"],
                "task": {"state": "READY"},
            });
            if !body["ownerId"].is_null() {
                item["ownerId"] = body["ownerId"].clone();
            }
            if !body["task"]["data"].is_null() {
                item["task"]["data"] = body["task"]["data"].clone();
            }
            state.items.insert(item_id, item.clone());
            (StatusCode::CREATED, Json(item)).into_response()
        }
        ("GET", ["process-items", _]) => match state.items.get(&id) {
            Some(item) => Json(item.clone()).into_response(),
            None => api_error(StatusCode::NOT_FOUND, "Process item not found"),
        },
        ("POST", ["process-items", _, action]) => {
            let item_id = id;
            if *action == "~task-append-log" {
                let level = body["level"].as_str().unwrap_or_default().to_string();
                let message = body["message"].as_str().unwrap_or_default().to_string();
                state.logs.push((item_id, level, message));
            }
            let Some(item) = state.items.get_mut(&item_id) else {
                return api_error(StatusCode::NOT_FOUND, "Process item not found");
            };
            match *action {
                "~task-claim" => item["task"]["state"] = json!("CLAIMED"),
                "~task-complete" => item["task"]["state"] = json!("COMPLETED"),
                "~task-assign" => item["ownerId"] = body["ownerId"].clone(),
                _ => {}
            }
            Json(item.clone()).into_response()
        }
        ("POST", ["authentications"]) => Json(json!({
            "id": Uuid::new_v4(),
            "type": "ENGINE_TOKEN",
            "engineToken": {
                "token": "engine-token-1",
                "expiredAt": (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
            },
        }))
        .into_response(),
        _ => api_error(StatusCode::NOT_FOUND, "No such resource"),
    }
}

/// Exchange-rate API serving fixed rates to EUR.
#[derive(Clone, Default)]
pub struct MockCurrency {
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCurrency {
    pub async fn start() -> (Self, String) {
        let mock = Self::default();
        let router = Router::new()
            .route("/currencies/{file}", get(rates))
            .with_state(mock.clone());
        let url = spawn(router).await;
        (mock, url)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

async fn rates(State(mock): State<MockCurrency>, Path(file): Path<String>) -> Response {
    mock.calls.lock().push(file.clone());
    let mut table = Map::new();
    match file.as_str() {
        "usd.json" => table.insert("usd".to_string(), json!({"eur": 0.5})),
        "gbp.json" => table.insert("gbp".to_string(), json!({"eur": 1.25})),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(Value::Object(table)).into_response()
}

/// `PROCESS.STATE_CHANGED` webhook body.
pub fn process_state_changed(process_id: Uuid, state: &str) -> Value {
    json!({
        "id": format!("evt-{}", Uuid::new_v4()),
        "version": "2024-06-14",
        "type": "PROCESS.STATE_CHANGED",
        "timestamp": "2024-06-14T10:00:00Z",
        "data": {"processId": process_id, "processState": state},
    })
}

/// `PROCESS_ITEM.TASK_STATE_CHANGED` webhook body for a completed task.
pub fn task_completed(process_id: Uuid, process_item_id: Uuid, code: &str) -> Value {
    json!({
        "id": format!("evt-{}", Uuid::new_v4()),
        "version": "2024-06-14",
        "type": "PROCESS_ITEM.TASK_STATE_CHANGED",
        "timestamp": "2024-06-14T10:05:00Z",
        "data": {
            "processId": process_id,
            "processItemId": process_item_id,
            "processItemType": "TASK",
            "processItemDefinitionCode": code,
            "processItemTaskState": "COMPLETED",
        },
    })
}
