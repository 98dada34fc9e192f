//!
//! lcagate HTTP server
//! -------------------
//! Axum-based HTTP API that applies the RBAC core at every entry point.
//!
//! Responsibilities:
//! - Session management with a simple cookie model backed by `identity`.
//! - Login/logout endpoints backed by the local auth provider.
//! - Admin-gated user management with the self-deletion guard.
//! - Dataset and report endpoints demonstrating route guards, ownership
//!   stamping and ownership-scoped listing.
//! - Audit logging of every guard decision.

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::identity::{AuthProvider, LocalAuthProvider, LoginRequest, Principal, SessionManager, UserStore};
use crate::rbac::{
    filter_visible, stamp_owner, AccessConfig, AccessMode, Decision, Evaluator, Predicate, Role,
    TargetRef,
};
use crate::store::{Dataset, Report, ResourceStore};

pub mod audit;
pub mod guard;

use guard::{require, GuardContext, Requirement};

const SESSION_COOKIE: &str = "lcagate_session";

/// Shared server state injected into all handlers.
///
/// Holds the user registry, the in-memory resource collections, the
/// evaluator with its immutable rule table, and the session manager.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub resources: Arc<ResourceStore>,
    pub evaluator: Arc<Evaluator>,
    pub sm: SessionManager,
}

impl AppState {
    /// Resolve the caller's principal from the session cookie; anonymous when
    /// the cookie is absent, expired or revoked.
    pub fn principal_for(&self, headers: &HeaderMap) -> Principal {
        parse_cookie(headers, SESSION_COOKIE)
            .and_then(|token| self.sm.validate(&token))
            .unwrap_or_else(Principal::anonymous)
    }
}

/// Build the full route table over the given state. Split from `run_with_port`
/// so tests can drive the router without binding a socket.
pub fn app(state: AppState) -> Router {
    let users_admin = Router::new()
        .route("/users", get(list_users).post(register_user))
        .route_layer(middleware::from_fn_with_state(
            GuardContext {
                state: state.clone(),
                requirement: Requirement::Action("manage_users"),
            },
            require,
        ));

    let datasets = Router::new()
        .route("/datasets", get(list_datasets).post(upload_dataset))
        .route_layer(middleware::from_fn_with_state(
            GuardContext {
                state: state.clone(),
                requirement: Requirement::Action("upload_dataset"),
            },
            require,
        ));

    let reports = Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route_layer(middleware::from_fn_with_state(
            GuardContext {
                state: state.clone(),
                requirement: Requirement::Custom("reports", Predicate::Authenticated),
            },
            require,
        ));

    Router::new()
        .route("/", get(|| async { "lcagate ok" }))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/users/{username}", delete(delete_user))
        .route("/reports/{id}", delete(delete_report))
        .merge(users_admin)
        .merge(datasets)
        .merge(reports)
        .with_state(state)
}

/// Start the lcagate HTTP server bound to the given port. Opens the user
/// registry under `data_dir`, seeds the default admin on first run, and
/// builds the evaluator from the LCA default rule table.
pub async fn run_with_port(http_port: u16, data_dir: &str) -> anyhow::Result<()> {
    let users = Arc::new(UserStore::open(FsPath::new(data_dir))?);
    users.ensure_default_admin()?;

    let state = AppState {
        users,
        resources: Arc::new(ResourceStore::new()),
        evaluator: Arc::new(Evaluator::new(AccessConfig::lca_defaults())),
        sm: SessionManager::default(),
    };

    let app = app(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let kv = part.trim();
        if let Some(v) = kv.strip_prefix(&format!("{}=", name)) {
            return Some(v.to_string());
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict",
        SESSION_COOKIE, token
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("lcagate_session=; Path=/; HttpOnly; Max-Age=0")
}

fn app_error(e: AppError) -> Response {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": e.message(), "code": e.code_str()}))).into_response()
}

// ---- auth ----

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    let provider = LocalAuthProvider::new(state.users.clone(), state.sm.clone());
    let req = LoginRequest { username: payload.username, password: payload.password };
    match provider.login(&req) {
        Ok(resp) => {
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&resp.session.token));
            let p = &resp.session.principal;
            (
                StatusCode::OK,
                headers,
                Json(json!({"status": "ok", "user": p.id, "role": p.role})),
            )
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({"status": "unauthorized"})),
        ),
    }
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.sm.logout(&token);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status": "ok"})))
}

// ---- users ----

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    password: String,
    role: Option<Role>,
}

async fn list_users(State(state): State<AppState>) -> Json<serde_json::Value> {
    // Guard already required authentication; password hashes stay private.
    let users: Vec<serde_json::Value> = state
        .users
        .list()
        .into_iter()
        .map(|u| json!({"username": u.username, "role": u.role, "created_at": u.created_at}))
        .collect();
    Json(json!({"users": users}))
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    if state.users.find(&payload.username).is_some() {
        return app_error(AppError::conflict("user_exists", "Username already registered"));
    }
    // Role defaults to the lowest tier unless the admin says otherwise.
    let role = payload.role.unwrap_or(Role::Engineer);
    match state.users.add_user(&payload.username, &payload.password, role) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({"status": "created", "username": payload.username, "role": role})),
        )
            .into_response(),
        Err(e) => app_error(AppError::internal("user_store".to_string(), e.to_string())),
    }
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    let principal = state.principal_for(&headers);
    let decision = state.evaluator.evaluate(
        &principal,
        "delete_user",
        AccessMode::Write,
        Some(TargetRef::user(&username)),
    );
    audit::record(&principal, "delete_user", &format!("/users/{}", username), &decision);
    if let Decision::Deny(reason) = decision {
        return guard::reject(&reason);
    }
    match state.users.delete_user(&username) {
        Ok(true) => {
            // Stale cookies for the deleted account must stop resolving.
            state.sm.revoke_user(&username);
            (StatusCode::OK, Json(json!({"status": "deleted", "username": username}))).into_response()
        }
        Ok(false) => app_error(AppError::not_found("user_not_found", "No such user")),
        Err(e) => app_error(AppError::internal("user_store".to_string(), e.to_string())),
    }
}

// ---- datasets ----

#[derive(Debug, Deserialize)]
struct DatasetPayload {
    name: String,
    #[serde(default)]
    entries: u64,
    /// Ignored: ownership is stamped from the session, never the client.
    #[serde(default)]
    created_by: Option<String>,
}

async fn list_datasets(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({"datasets": state.resources.datasets()}))
}

async fn upload_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DatasetPayload>,
) -> Response {
    let principal = state.principal_for(&headers);
    let mut dataset = Dataset {
        id: 0,
        name: payload.name,
        entries: payload.entries,
        created_by: payload.created_by.unwrap_or_default(),
        created_at: Utc::now(),
    };
    stamp_owner(&mut dataset, &principal);
    let stored = state.resources.add_dataset(dataset);
    (StatusCode::CREATED, Json(json!({"dataset": stored}))).into_response()
}

// ---- reports ----

#[derive(Debug, Deserialize)]
struct ReportPayload {
    title: String,
    #[serde(default)]
    summary: serde_json::Value,
    /// Ignored: ownership is stamped from the session, never the client.
    #[serde(default)]
    created_by: Option<String>,
}

async fn list_reports(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let principal = state.principal_for(&headers);
    let visible = filter_visible(state.resources.reports(), &principal);
    Json(json!({"reports": visible}))
}

async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ReportPayload>,
) -> Response {
    let principal = state.principal_for(&headers);
    let mut report = Report {
        id: 0,
        title: payload.title,
        summary: payload.summary,
        created_by: payload.created_by.unwrap_or_default(),
        created_at: Utc::now(),
    };
    stamp_owner(&mut report, &principal);
    let stored = state.resources.add_report(report);
    (StatusCode::CREATED, Json(json!({"report": stored}))).into_response()
}

async fn delete_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let principal = state.principal_for(&headers);
    let path = format!("/reports/{}", id);
    // Collection-level gate before the lookup: unauthenticated callers get a
    // uniform 401 without learning whether the id exists.
    let gate = state.evaluator.evaluate(&principal, "delete_report", AccessMode::Write, None);
    if let Decision::Deny(reason) = gate {
        audit::record(&principal, "delete_report", &path, &Decision::Deny(reason.clone()));
        return guard::reject(&reason);
    }
    let Some(report) = state.resources.find_report(id) else {
        return app_error(AppError::not_found("report_not_found", "No such report"));
    };
    let id_str = report.id.to_string();
    let decision = state.evaluator.evaluate(
        &principal,
        "delete_report",
        AccessMode::Write,
        Some(TargetRef::owned(&id_str, &report.created_by)),
    );
    audit::record(&principal, "delete_report", &path, &decision);
    if let Decision::Deny(reason) = decision {
        return guard::reject(&reason);
    }
    state.resources.remove_report(id);
    (StatusCode::OK, Json(json!({"status": "deleted", "id": id}))).into_response()
}
