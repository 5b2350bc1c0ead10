use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use herald_client::{ConfiguredAllowlist, build_engine};
use herald_core::config::EngineConfig;
use herald_core::traits::LabelGeocoder;
use herald_server::routes;
use herald_server::state::AppState;

/// Router over a real engine with the given allowlist. With an empty list
/// the engine returns immediately and never touches the network.
pub fn setup_test_app(allowlist: ConfiguredAllowlist) -> Router {
    let engine = build_engine(EngineConfig::fast(), false).expect("engine should build");
    let state = Arc::new(AppState {
        engine,
        allowlist,
        geocoder: LabelGeocoder,
    });
    routes::router(state)
}

pub fn setup_empty_app() -> Router {
    setup_test_app(ConfiguredAllowlist::inline(""))
}

/// GET `uri` and return status plus parsed JSON body.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
