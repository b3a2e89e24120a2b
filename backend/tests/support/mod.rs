#![allow(dead_code)]
use std::{env, sync::Arc};

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, Response, StatusCode},
    Router,
};
use centralauth_backend::{
    config::Config,
    repositories::InMemoryStore,
    routes::build_router,
    state::AppState,
    utils::HashingParams,
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration_test_signing_key_0123456789";
pub const TEST_ORIGIN: &str = "http://localhost:5173";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        access_token_ttl_minutes: 15,
        session_ttl_days: 30,
        // Cheap parameters keep the suite fast; production values come from the environment.
        hashing: HashingParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        cookie_secure: true,
        trust_proxy_headers: false,
        cors_allow_origins: vec![TEST_ORIGIN.to_string()],
        shutdown_grace_seconds: 1,
        session_retention_days: 90,
    }
}

/// Router over a fresh in-memory store. The store handle lets tests inspect persisted rows.
pub fn test_app() -> (Router, Arc<InMemoryStore>) {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::from_config(&config, store.clone()).expect("build state");
    (build_router(state, &config.cors_allow_origins), store)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .append(header::COOKIE, cookie.parse().expect("cookie header"));
    request
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("authorization header"),
    );
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("call router")
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Value of cookie `name` from the response's `Set-Cookie` headers, empty values included.
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookie_header(headers, name)
        .and_then(|raw| raw.split(';').next().map(str::to_string))
        .and_then(|pair| pair.split_once('=').map(|(_, v)| v.trim().to_string()))
}

/// The full `Set-Cookie` header for cookie `name`.
pub fn set_cookie_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(str::to_string)
}

pub fn register_body(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "full_name": "Alice Example",
        "date_of_birth": "1990-01-01",
    })
}

pub fn login_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

pub async fn register(app: &Router, email: &str, password: &str) -> Value {
    let response = send(
        app,
        json_request("POST", "/api/v1/auth/register", &register_body(email, password)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

/// Both credentials handed out by a successful login.
pub struct LoggedIn {
    pub access_token: String,
    pub session_token: String,
    pub body: Value,
}

pub async fn login(app: &Router, email: &str, password: &str) -> LoggedIn {
    let response = send(
        app,
        json_request("POST", "/api/v1/auth/login", &login_body(email, password)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let access_token = set_cookie_value(response.headers(), "access_token").expect("access cookie");
    let session_token =
        set_cookie_value(response.headers(), "session_token").expect("session cookie");
    LoggedIn {
        access_token,
        session_token,
        body: response_json(response).await,
    }
}

/// Removes the fields that legitimately differ between two otherwise identical envelopes.
pub fn without_timestamp(mut body: Value) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.remove("timestamp");
    }
    body
}

/// Pool for `TEST_DATABASE_URL`, migrated. `None` when the variable is unset.
pub async fn test_pool() -> Option<PgPool> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}
