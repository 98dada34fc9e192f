//! Router-level tests driving the axum app end to end: cookie sessions, the
//! guard middleware short-circuiting before handlers, ownership-scoped
//! listing, owner stamping and the self-deletion guard over HTTP.
//!
//! Each test seeds its own users with unique names: sessions live in
//! process-wide maps, so shared usernames would let one test's revocation
//! affect another's cookies.

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use lcagate::identity::{SessionManager, UserStore};
use lcagate::rbac::{AccessConfig, Evaluator, Role};
use lcagate::server::{app, AppState};
use lcagate::store::ResourceStore;

fn test_state(dir: &std::path::Path, seed: &[(&str, &str, Role)]) -> Result<AppState> {
    let users = Arc::new(UserStore::open(dir)?);
    for (name, password, role) in seed {
        users.add_user(name, password, *role)?;
    }
    Ok(AppState {
        users,
        resources: Arc::new(ResourceStore::new()),
        evaluator: Arc::new(Evaluator::new(AccessConfig::lca_defaults())),
        sm: SessionManager::default(),
    })
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"username": username, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK, "login for {} must succeed", username);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn anonymous_requests_get_uniform_401() -> Result<()> {
    let tmp = tempdir()?;
    let app = app(test_state(tmp.path(), &[])?);

    for req in [
        bare_request("GET", "/reports", None),
        bare_request("GET", "/users", None),
        bare_request("DELETE", "/users/someone", None),
        json_request("POST", "/datasets", None, json!({"name": "slag"})),
    ] {
        let uri = req.uri().clone();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} must be 401 for anonymous", uri);
        let body = body_json(res).await;
        assert_eq!(body["reason"], "authentication_required");
        assert!(body.get("required_roles").is_none(), "401 bodies must not name roles");
    }
    Ok(())
}

#[tokio::test]
async fn report_existence_is_not_enumerable_anonymously() -> Result<()> {
    let tmp = tempdir()?;
    let state = test_state(tmp.path(), &[("t2_alice", "pw", Role::Engineer)])?;
    let app = app(state.clone());

    let cookie = login(&app, "t2_alice", "pw").await;
    let res = app
        .clone()
        .oneshot(json_request("POST", "/reports", Some(&cookie), json!({"title": "steel"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = body_json(res).await;
    let id = created["report"]["id"].as_u64().unwrap();

    // Existing and missing ids must be indistinguishable without a session.
    let hit = app
        .clone()
        .oneshot(bare_request("DELETE", &format!("/reports/{}", id), None))
        .await
        .unwrap();
    let miss = app
        .clone()
        .oneshot(bare_request("DELETE", "/reports/999999", None))
        .await
        .unwrap();
    assert_eq!(hit.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(miss.status(), StatusCode::UNAUTHORIZED);

    // The report survives the anonymous attempt.
    let visible = app
        .clone()
        .oneshot(bare_request("GET", "/reports", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(visible).await;
    assert_eq!(body["reports"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn guard_short_circuits_writes_before_the_handler() -> Result<()> {
    let tmp = tempdir()?;
    let state = test_state(
        tmp.path(),
        &[("t3_root", "rootpw", Role::Admin), ("t3_eng", "engpw", Role::Engineer)],
    )?;
    let app = app(state.clone());

    // Engineer may read the user list (read-open) but not create accounts.
    let eng = login(&app, "t3_eng", "engpw").await;
    let res = app.clone().oneshot(bare_request("GET", "/users", Some(&eng))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            Some(&eng),
            json!({"username": "t3_intruder", "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = body_json(res).await;
    assert_eq!(body["reason"], "insufficient_role");
    assert_eq!(body["required_roles"], json!(["admin"]));
    assert_eq!(body["user_role"], "engineer");
    // The handler never ran: no account was created.
    assert!(state.users.find("t3_intruder").is_none());

    // Admin passes the same gate.
    let root = login(&app, "t3_root", "rootpw").await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            Some(&root),
            json!({"username": "t3_newcomer", "password": "pw", "role": "metallurgist"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(state.users.find("t3_newcomer").unwrap().role, Role::Metallurgist);
    Ok(())
}

#[tokio::test]
async fn dataset_uploads_are_stamped_and_role_gated() -> Result<()> {
    let tmp = tempdir()?;
    let state = test_state(
        tmp.path(),
        &[("t4_eng", "engpw", Role::Engineer), ("t4_met", "metpw", Role::Metallurgist)],
    )?;
    let app = app(state.clone());

    let eng = login(&app, "t4_eng", "engpw").await;
    let met = login(&app, "t4_met", "metpw").await;

    // Reads are open to any authenticated role; writes are metallurgist+.
    let res = app.clone().oneshot(bare_request("GET", "/datasets", Some(&eng))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app
        .clone()
        .oneshot(json_request("POST", "/datasets", Some(&eng), json!({"name": "ore"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["reason"], "insufficient_role");

    // A client-supplied owner is overwritten by the session principal.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/datasets",
            Some(&met),
            json!({"name": "ore", "entries": 3, "created_by": "mallory"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body_json(res).await["dataset"]["created_by"], "t4_met");
    Ok(())
}

#[tokio::test]
async fn report_listing_is_ownership_scoped_over_http() -> Result<()> {
    let tmp = tempdir()?;
    let state = test_state(
        tmp.path(),
        &[
            ("t5_alice", "pw", Role::Engineer),
            ("t5_bob", "pw", Role::Metallurgist),
            ("t5_root", "pw", Role::Admin),
        ],
    )?;
    let app = app(state.clone());

    let alice = login(&app, "t5_alice", "pw").await;
    let bob = login(&app, "t5_bob", "pw").await;
    let root = login(&app, "t5_root", "pw").await;

    for (cookie, title) in [(&alice, "alice report"), (&bob, "bob report")] {
        let res = app
            .clone()
            .oneshot(json_request("POST", "/reports", Some(cookie), json!({"title": title})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let listing = |cookie: String| {
        let app = app.clone();
        async move {
            let res = app.oneshot(bare_request("GET", "/reports", Some(&cookie))).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            body_json(res).await["reports"].as_array().unwrap().clone()
        }
    };

    let alice_sees = listing(alice.clone()).await;
    assert_eq!(alice_sees.len(), 1);
    assert_eq!(alice_sees[0]["created_by"], "t5_alice");

    let root_sees = listing(root).await;
    assert_eq!(root_sees.len(), 2, "admin sees every owner's reports");

    // Bob cannot delete Alice's report.
    let alice_id = alice_sees[0]["id"].as_u64().unwrap();
    let res = app
        .clone()
        .oneshot(bare_request("DELETE", &format!("/reports/{}", alice_id), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["reason"], "not_owner");
    Ok(())
}

#[tokio::test]
async fn self_deletion_is_rejected_over_http() -> Result<()> {
    let tmp = tempdir()?;
    let state = test_state(
        tmp.path(),
        &[("t6_root", "rootpw", Role::Admin), ("t6_alice", "pw", Role::Engineer)],
    )?;
    let app = app(state.clone());

    let root = login(&app, "t6_root", "rootpw").await;
    let alice = login(&app, "t6_alice", "pw").await;

    let res = app
        .clone()
        .oneshot(bare_request("DELETE", "/users/t6_root", Some(&root)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["reason"], "self_deletion_forbidden");
    assert!(state.users.find("t6_root").is_some(), "the admin account must survive");

    // Deleting another account works and revokes its sessions.
    let res = app
        .clone()
        .oneshot(bare_request("DELETE", "/users/t6_alice", Some(&root)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app
        .clone()
        .oneshot(bare_request("GET", "/reports", Some(&alice)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "stale cookie must stop resolving");
    Ok(())
}
