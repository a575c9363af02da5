#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jobtrace_db::DbPool;
use tower::ServiceExt;

use jobtrace_api::config::ServerConfig;
use jobtrace_api::mirror::{Mirror, MirrorSettings};
use jobtrace_api::router::build_app_router;
use jobtrace_api::state::AppState;
use jobtrace_api::ws::WsManager;
use jobtrace_tracker::IdentityResolver;

/// Test `ServerConfig` with production-looking paths.
///
/// The pool handed to the app is always in-memory; `database_path` only
/// drives the mirror's test-environment check.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_path: "data/jobtrace.db".to_string(),
        mirror_capacity: 100,
        alert_history: 20,
        heartbeat_interval_secs: 30,
        reserved_test_user_ids: vec!["test-user".to_string()],
    }
}

/// Everything a test needs to drive the app and inspect its side effects.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub ws_manager: Arc<WsManager>,
    pub mirror: Arc<Mirror>,
}

pub async fn build_test_app() -> TestApp {
    build_test_app_with(test_config()).await
}

pub async fn build_test_app_with(config: ServerConfig) -> TestApp {
    let pool = jobtrace_db::create_memory_pool().await.unwrap();
    let ws_manager = Arc::new(WsManager::new());
    let identity = IdentityResolver::new(pool.clone());
    let mirror = Arc::new(Mirror::new(
        MirrorSettings::from_config(&config),
        identity.clone(),
        Arc::clone(&ws_manager),
    ));

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        mirror: Arc::clone(&mirror),
        identity,
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        ws_manager,
        mirror,
    }
}

/// Mirror settings for tests that build a `Mirror` outside the router.
pub fn mirror_settings(capacity: usize) -> MirrorSettings {
    MirrorSettings {
        capacity,
        alert_history: 20,
        reserved_user_ids: HashSet::from(["test-user".to_string()]),
        test_environment: false,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
