use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::Value;

pub const API_KEY: &str = "tstmt_integration";
pub const RUN_UID: &str = "a0b1c2d3";

/// Knobs for the mock reporter service
#[derive(Clone, Default)]
pub struct MockBehavior {
    pub fail_reports: bool,
    pub fail_finish: bool,
    pub create_delay: Option<Duration>,
}

/// Requests the mock reporter has accepted
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub created: Vec<Value>,
    pub results: Vec<(String, Value)>,
    pub finished: Vec<(String, Value)>,
}

#[derive(Clone)]
pub struct MockReporter {
    behavior: MockBehavior,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockReporter {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().expect("mock reporter poisoned").clone()
    }

    /// Serve on an ephemeral port from a dedicated runtime thread; returns the base URL
    pub fn spawn(&self) -> String {
        let app = router(self.clone());
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock reporter");
                tx.send(listener.local_addr().expect("mock address"))
                    .expect("send mock address");
                axum::serve(listener, app).await.expect("serve mock reporter");
            });
        });

        let addr = rx.recv().expect("mock reporter address");
        format!("http://{}/api/reporter", addr)
    }
}

fn router(mock: MockReporter) -> Router {
    Router::new()
        .route("/api/reporter", post(create_run))
        .route("/api/reporter/:uid", put(finish_run))
        .route("/api/reporter/:uid/testrun", post(report_result))
        .with_state(mock)
}

fn authorized(query: &HashMap<String, String>) -> bool {
    query.get("api_key").map(String::as_str) == Some(API_KEY)
}

async fn create_run(
    State(mock): State<MockReporter>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if let Some(delay) = mock.behavior.create_delay {
        tokio::time::sleep(delay).await;
    }
    if !authorized(&query) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    mock.recorded.lock().expect("mock reporter poisoned").created.push(body);
    (
        StatusCode::OK,
        format!(
            r#"{{"uid":"{}","url":"https://app.testomat.io/projects/demo/runs/{}"}}"#,
            RUN_UID, RUN_UID
        ),
    )
}

async fn report_result(
    State(mock): State<MockReporter>,
    Path(uid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if !authorized(&query) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }
    if mock.behavior.fail_reports {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
    }

    mock.recorded
        .lock()
        .expect("mock reporter poisoned")
        .results
        .push((uid, body));
    (StatusCode::OK, r#"{"status":"ok"}"#.to_string())
}

async fn finish_run(
    State(mock): State<MockReporter>,
    Path(uid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if !authorized(&query) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }
    if mock.behavior.fail_finish {
        return (StatusCode::NOT_FOUND, "Run not found".to_string());
    }

    mock.recorded
        .lock()
        .expect("mock reporter poisoned")
        .finished
        .push((uid, body));
    (StatusCode::OK, r#"{"status":"finished"}"#.to_string())
}
