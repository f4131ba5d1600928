//! Transport and session store against an in-process HTTP backend that issues an
//! httpOnly session cookie, the way the real API does.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use wardgate::config::ClientConfig;
use wardgate::error::{ErrorKind, DEMO_WRITE_BLOCKED_PHRASE};
use wardgate::identity::{LoginRequest, Role, SessionStatus, SessionStore};
use wardgate::transport::{self, HttpTransport, Method, Transport};

const SESSION_COOKIE: &str = "hms_session";

#[derive(Clone, Default)]
struct Backend {
    /// Session id -> user
    sessions: Arc<RwLock<HashMap<String, Value>>>,
    next_sid: Arc<RwLock<u64>>,
}

fn account(username: &str, password: &str) -> Option<Value> {
    match (username, password) {
        ("grey", "pw") => Some(json!({"id": 1, "name": "Meredith Grey", "role": "doctor"})),
        ("ana", "pw") => Some(json!({"id": 2, "name": "Ana", "role": "receptionist"})),
        ("root", "pw") => Some(json!({"id": 3, "name": "Root", "role": "admin"})),
        ("demo", "demo") => Some(json!({"id": 4, "name": "Demo", "role": "guest_demo", "is_demo": true})),
        _ => None,
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let s = headers.get("cookie")?.to_str().ok()?;
    s.split(';').map(str::trim).find_map(|p| p.strip_prefix(name).and_then(|v| v.strip_prefix('=')).map(str::to_string))
}

async fn current_user(b: &Backend, headers: &HeaderMap) -> Option<Value> {
    let sid = parse_cookie(headers, SESSION_COOKIE)?;
    b.sessions.read().await.get(&sid).cloned()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authenticated"}))).into_response()
}

async fn login(State(b): State<Backend>, Json(p): Json<Value>) -> Response {
    let u = p.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let pw = p.get("password").and_then(|v| v.as_str()).unwrap_or("");
    let Some(user) = account(u, pw) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"success": false, "message": "Invalid credentials"}))).into_response();
    };
    let sid = {
        let mut n = b.next_sid.write().await;
        *n += 1;
        format!("sid{}", *n)
    };
    b.sessions.write().await.insert(sid.clone(), user.clone());
    let mut h = HeaderMap::new();
    h.insert("set-cookie", HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Strict; Path=/", SESSION_COOKIE, sid)).unwrap());
    (StatusCode::OK, h, Json(json!({"success": true, "data": {"user": user}}))).into_response()
}

async fn logout(State(b): State<Backend>, headers: HeaderMap) -> Response {
    if let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) {
        b.sessions.write().await.remove(&sid);
    }
    let mut h = HeaderMap::new();
    h.insert("set-cookie", HeaderValue::from_str(&format!("{}=deleted; Max-Age=0; HttpOnly; Path=/", SESSION_COOKIE)).unwrap());
    (StatusCode::NO_CONTENT, h).into_response()
}

async fn profile(State(b): State<Backend>, headers: HeaderMap) -> Response {
    match current_user(&b, &headers).await {
        Some(user) => Json(json!({"user": user})).into_response(),
        None => unauthorized(),
    }
}

async fn list_patients(State(b): State<Backend>, headers: HeaderMap) -> Response {
    if current_user(&b, &headers).await.is_none() { return unauthorized(); }
    Json(json!({"data": [{"id": 10, "name": "Patient Zero"}]})).into_response()
}

async fn create_patient(State(b): State<Backend>, headers: HeaderMap, Json(_p): Json<Value>) -> Response {
    let Some(user) = current_user(&b, &headers).await else { return unauthorized(); };
    if user.get("role").and_then(|r| r.as_str()) == Some("guest_demo") {
        return (StatusCode::FORBIDDEN, Json(json!({"success": false, "message": DEMO_WRITE_BLOCKED_PHRASE}))).into_response();
    }
    (StatusCode::CREATED, Json(json!({"data": {"id": 11}}))).into_response()
}

async fn list_users(State(b): State<Backend>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&b, &headers).await else { return unauthorized(); };
    if user.get("role").and_then(|r| r.as_str()) != Some("admin") {
        return (StatusCode::FORBIDDEN, Json(json!({"error": {"message": "Insufficient permissions"}}))).into_response();
    }
    Json(json!([])).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({"ok": true})).into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "database connection lost").into_response()
}

// Start the mock API on an ephemeral localhost port. Returns (server task, base url).
async fn start_backend() -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/profile", get(profile))
        .route("/api/patients", get(list_patients).post(create_patient))
        .route("/api/users", get(list_users))
        .route("/api/slow", get(slow))
        .route("/api/broken", get(broken))
        .with_state(Backend::default());
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e:?}");
        }
    });
    (handle, format!("http://{}/api", addr))
}

// Abort the server task when the test ends, pass or fail.
struct ServerGuard(JoinHandle<()>);
impl Drop for ServerGuard {
    fn drop(&mut self) { self.0.abort(); }
}

fn transport_for(base: &str, timeout_ms: u64) -> Arc<HttpTransport> {
    let cfg = ClientConfig { api_url: base.to_string(), timeout: Duration::from_millis(timeout_ms), ..Default::default() };
    Arc::new(HttpTransport::new(&cfg).expect("transport"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cookie_session_login_profile_logout() {
    let (srv, base) = start_backend().await;
    let _g = ServerGuard(srv);
    let t = transport_for(&base, 3_000);

    let store = SessionStore::new(t.clone(), false);
    store.initialize().await;
    assert_eq!(store.status(), SessionStatus::Unauthenticated);

    let bad = store.login(&LoginRequest::new("grey", "nope")).await.unwrap_err();
    assert_eq!(bad.kind, ErrorKind::AuthExpired);
    assert_eq!(bad.message, "Invalid credentials");
    assert_eq!(store.status(), SessionStatus::Unauthenticated);

    let user = store.login(&LoginRequest::new("grey", "pw")).await.expect("login");
    assert_eq!(user.role, Some(Role::Doctor));
    assert_eq!(store.status(), SessionStatus::Authenticated);

    // A fresh store on the same client restores the session from the cookie alone.
    let restored = SessionStore::new(t.clone(), false);
    restored.initialize().await;
    assert_eq!(restored.snapshot().user().map(|u| u.id.as_str()), Some("1"));

    let patients: Vec<Value> = transport::get_json(&*t, "/patients").await.expect("patients");
    assert_eq!(patients.len(), 1);

    store.logout().await;
    assert_eq!(store.status(), SessionStatus::Unauthenticated);
    let after = SessionStore::new(t.clone(), false);
    after.initialize().await;
    assert_eq!(after.status(), SessionStatus::Unauthenticated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_write_and_forbidden_are_distinguished() {
    let (srv, base) = start_backend().await;
    let _g = ServerGuard(srv);

    let demo_t = transport_for(&base, 3_000);
    let demo = SessionStore::new(demo_t.clone(), false);
    demo.login(&LoginRequest::new("demo", "demo")).await.expect("demo login");
    assert!(demo.snapshot().is_demo_mode());
    let err = demo.request(Method::POST, "/patients", Some(json!({"name": "x"}))).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DemoWriteRestricted);
    assert_eq!(err.status, Some(403));
    assert_eq!(demo.status(), SessionStatus::Authenticated);
    assert!(!demo.has_pending_expiry());

    let rec_t = transport_for(&base, 3_000);
    let rec = SessionStore::new(rec_t.clone(), false);
    rec.login(&LoginRequest::new("ana", "pw")).await.expect("receptionist login");
    let err = rec.request(Method::GET, "/users", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.message, "Insufficient permissions");
    assert_eq!(rec.status(), SessionStatus::Authenticated);

    let created: Value = transport::post_json(&*rec_t, "/patients", &json!({"name": "y"})).await.expect("create");
    assert_eq!(created, json!({"id": 11}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_cookie_is_auth_expired() {
    let (srv, base) = start_backend().await;
    let _g = ServerGuard(srv);
    let t = transport_for(&base, 3_000);
    let err = t.send(Method::GET, "/patients", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthExpired);
    assert_eq!(err.status, Some(401));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_returns_null_payload_and_server_errors_are_unknown() {
    let (srv, base) = start_backend().await;
    let _g = ServerGuard(srv);
    let t = transport_for(&base, 3_000);
    assert_eq!(t.send(Method::POST, "/auth/logout", None).await.unwrap(), Value::Null);
    let err = t.send(Method::GET, "/broken", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
    assert_eq!(err.status, Some(500));
    assert_eq!(err.message, "database connection lost");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_is_network_unavailable() {
    let (srv, base) = start_backend().await;
    let _g = ServerGuard(srv);
    let t = transport_for(&base, 100);
    let err = t.send(Method::GET, "/slow", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkUnavailable);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn unreachable_server_is_network_unavailable_and_starts_signed_out() {
    // Reserve an ephemeral port and free it so nothing is listening there.
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let t = transport_for(&format!("http://127.0.0.1:{}/api", port), 1_000);
    let err = t.send(Method::GET, "/auth/profile", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkUnavailable);
    assert!(err.kind.is_retryable());

    let store = SessionStore::new(t.clone(), false);
    store.initialize().await;
    assert_eq!(store.status(), SessionStatus::Unauthenticated);

    // Logout still clears locally when the server is gone.
    store.logout().await;
    assert_eq!(store.status(), SessionStatus::Unauthenticated);
}
