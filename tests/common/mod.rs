//! In-process fake of the appliance REST API.
//!
//! Serves the endpoints the tool uses on an ephemeral port, records every
//! request it receives, and plays back a scripted sequence of task statuses
//! for `GET /api/appliance/update`.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use vcsa_maint::Config;

pub const USERNAME: &str = "administrator@vsphere.local";
pub const PASSWORD: &str = "VMware1!";
pub const SESSION_ID: &str = "b00db39f948d13ea1e59b4d6fce11e8a";

/// `Basic` credentials for USERNAME:PASSWORD.
const BASIC_AUTH: &str = "Basic YWRtaW5pc3RyYXRvckB2c3BoZXJlLmxvY2FsOlZNd2FyZTEh";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub session: Option<String>,
    pub body: Option<Value>,
}

pub struct FakeState {
    pub pending: Vec<Value>,
    pub accounts: BTreeMap<String, Value>,
    /// Statuses returned by successive `GET /appliance/update`; the last one repeats.
    pub task_statuses: VecDeque<&'static str>,
    pub precheck: Value,
    pub validation: Value,
    pub logged_out: bool,
    pub requests: Vec<RecordedRequest>,
}

impl Default for FakeState {
    fn default() -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(
            "root".to_string(),
            json!({
                "fullname": "root",
                "roles": ["superAdmin"],
                "enabled": true,
                "has_password": true,
                "password_expires_at": "2024-04-14T00:00:00.000Z",
                "max_days_between_password_change": 90
            }),
        );
        accounts.insert(
            "ops user".to_string(),
            json!({ "fullname": "Ops", "roles": ["operator"], "enabled": true }),
        );

        Self {
            pending: vec![
                json!({
                    "version": "8.0.2.00100",
                    "name": "VC-8.0U2a",
                    "update_type": "FIX",
                    "severity": "CRITICAL",
                    "priority": "HIGH",
                    "release_date": "2023-10-26T00:00:00.000Z",
                    "reboot_required": true,
                    "size": 6512,
                    "knowledge_base": "https://kb.example/95010"
                }),
                json!({
                    "version": "8.0.2.00300",
                    "name": "VC-8.0U2c",
                    "update_type": "SECURITY",
                    "severity": "IMPORTANT",
                    "priority": "MEDIUM",
                    "reboot_required": true,
                    "size": 6600
                }),
            ],
            accounts,
            task_statuses: VecDeque::from(vec!["SUCCEEDED"]),
            precheck: json!({
                "check_time": "2024-03-01T10:00:00.000Z",
                "estimated_time_to_install": 45,
                "reboot_required": true,
                "issues": { "info": [], "warnings": [], "errors": [] },
                "questions": []
            }),
            validation: json!({ "info": [], "warnings": [], "errors": [] }),
            logged_out: false,
            requests: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeAppliance {
    pub url: String,
    pub state: Shared,
}

impl FakeAppliance {
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    pub async fn start_with(state: FakeState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake appliance");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake appliance crashed");
        });
        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Config pointing at this appliance with a short poll interval.
    pub fn config(&self) -> Config {
        let mut config = Config::new(&self.url, USERNAME, PASSWORD);
        config.poll_interval = Duration::from_millis(10);
        config
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests matching `method` whose path ends with `suffix`.
    pub fn requests_to(&self, method: Method, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.ends_with(suffix))
            .collect()
    }

    pub fn set_task_statuses(&self, statuses: &[&'static str]) {
        self.state.lock().unwrap().task_statuses = statuses.iter().copied().collect();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/session", post(login).delete(logout))
        .route("/api/appliance/update", get(update_state))
        .route("/api/appliance/update/pending", get(list_pending))
        .route(
            "/api/appliance/update/pending/{version}",
            get(get_pending).post(pending_action),
        )
        .route("/api/appliance/update/staged", get(staged))
        .route("/api/appliance/update/policy", get(policy))
        .route("/api/appliance/local-accounts", get(list_accounts))
        .route(
            "/api/appliance/local-accounts/{username}",
            get(get_account).patch(update_account),
        )
        .with_state(state)
}

fn error(status: StatusCode, error_type: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error_type": error_type,
            "messages": [{ "id": "fake.error", "default_message": message, "args": [] }]
        })),
    )
        .into_response()
}

/// Record the request and check its session header.
fn record(
    state: &Shared,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), Response> {
    let session = headers
        .get("vmware-api-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(body).ok()
    };

    let mut guard = state.lock().unwrap();
    guard.requests.push(RecordedRequest {
        method,
        path,
        query,
        session: session.clone(),
        body,
    });

    if guard.logged_out || session.as_deref() != Some(SESSION_ID) {
        return Err(error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Session is not valid",
        ));
    }
    Ok(())
}

async fn login(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut guard = state.lock().unwrap();
    guard.requests.push(RecordedRequest {
        method: Method::POST,
        path: "/api/session".to_string(),
        query: HashMap::new(),
        session: None,
        body: None,
    });

    if auth.as_deref() != Some(BASIC_AUTH) {
        return error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Authentication required.",
        );
    }
    guard.logged_out = false;
    (StatusCode::CREATED, Json(json!(SESSION_ID))).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = record(
        &state,
        Method::DELETE,
        "/api/session".to_string(),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    state.lock().unwrap().logged_out = true;
    StatusCode::NO_CONTENT.into_response()
}

async fn update_state(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        "/api/appliance/update".to_string(),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }

    let mut guard = state.lock().unwrap();
    let status = if guard.task_statuses.len() > 1 {
        guard.task_statuses.pop_front()
    } else {
        guard.task_statuses.front().copied()
    };

    let body = match status {
        Some("FAILED") => json!({
            "state": "UPDATES_PENDING",
            "version": "8.0.1.00000",
            "task": {
                "status": "FAILED",
                "error": { "messages": [{ "id": "stage.fail", "default_message": "Download checksum mismatch", "args": [] }] }
            }
        }),
        Some(status) => json!({
            "state": "STAGE_IN_PROGRESS",
            "version": "8.0.1.00000",
            "task": { "status": status, "progress": { "total": 100, "completed": 50 } }
        }),
        None => json!({ "state": "UP_TO_DATE", "version": "8.0.1.00000" }),
    };
    Json(body).into_response()
}

async fn list_pending(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        "/api/appliance/update/pending".to_string(),
        query,
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    Json(Value::Array(state.lock().unwrap().pending.clone())).into_response()
}

fn find_pending(state: &Shared, version: &str) -> Option<Value> {
    state
        .lock()
        .unwrap()
        .pending
        .iter()
        .find(|p| p["version"] == version)
        .cloned()
}

async fn get_pending(
    State(state): State<Shared>,
    Path(version): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        format!("/api/appliance/update/pending/{}", version),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    match find_pending(&state, &version) {
        Some(mut info) => {
            info["staged"] = json!(false);
            info["contents"] = json!([]);
            Json(info).into_response()
        }
        None => error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("Version {} not found", version),
        ),
    }
}

async fn pending_action(
    State(state): State<Shared>,
    Path(version): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let action = query.get("action").cloned().unwrap_or_default();
    if let Err(resp) = record(
        &state,
        Method::POST,
        format!("/api/appliance/update/pending/{}", version),
        query,
        &headers,
        &body,
    ) {
        return resp;
    }
    if find_pending(&state, &version).is_none() {
        return error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("Version {} not found", version),
        );
    }

    let guard = state.lock().unwrap();
    match action.as_str() {
        "precheck" => Json(guard.precheck.clone()).into_response(),
        "validate" => Json(guard.validation.clone()).into_response(),
        "stage" | "install" => StatusCode::NO_CONTENT.into_response(),
        _ => error(
            StatusCode::BAD_REQUEST,
            "INVALID_ARGUMENT",
            &format!("Unknown action '{}'", action),
        ),
    }
}

async fn staged(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        "/api/appliance/update/staged".to_string(),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    Json(json!({
        "version": "8.0.2.00100",
        "name": "VC-8.0U2a",
        "update_type": "FIX",
        "staging_complete": true,
        "reboot_required": true
    }))
    .into_response()
}

async fn policy(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        "/api/appliance/update/policy".to_string(),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    Json(json!({
        "default_URL": "https://vapp-updates.example/vcsa",
        "auto_stage": false,
        "manual_control": true,
        "certificate_check": true,
        "check_schedule": [{ "day": "SUNDAY", "hour": 1, "minute": 0 }]
    }))
    .into_response()
}

async fn list_accounts(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        "/api/appliance/local-accounts".to_string(),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    let names: Vec<String> = state.lock().unwrap().accounts.keys().cloned().collect();
    Json(names).into_response()
}

async fn get_account(
    State(state): State<Shared>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(
        &state,
        Method::GET,
        format!("/api/appliance/local-accounts/{}", username),
        HashMap::new(),
        &headers,
        &Bytes::new(),
    ) {
        return resp;
    }
    match state.lock().unwrap().accounts.get(&username) {
        Some(account) => Json(account.clone()).into_response(),
        None => error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("User {} not found", username),
        ),
    }
}

async fn update_account(
    State(state): State<Shared>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(resp) = record(
        &state,
        Method::PATCH,
        format!("/api/appliance/local-accounts/{}", username),
        HashMap::new(),
        &headers,
        &body,
    ) {
        return resp;
    }

    let patch: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", "Invalid body"),
    };

    let mut guard = state.lock().unwrap();
    let Some(account) = guard.accounts.get_mut(&username) else {
        return error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("User {} not found", username),
        );
    };
    if patch.get("password_expires") == Some(&json!(false)) {
        if let Some(obj) = account.as_object_mut() {
            obj.remove("password_expires_at");
        }
    }
    if let (Some(obj), Some(fields)) = (account.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            if key != "password_expires" {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
    StatusCode::NO_CONTENT.into_response()
}
