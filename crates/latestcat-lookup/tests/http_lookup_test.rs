//! Integration tests for [`HttpLookup`] against an in-process GraphQL mock.
//!
//! Every test ends with an oracle check on the single outcome produced: a
//! release, a clean not-found, or one specific [`LookupError`] variant.

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::post};
use latestcat_lookup::{HttpLookup, LookupConfig, LookupError, Release, VersionLookup};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port and return its GraphQL URL.
async fn spawn_endpoint(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/graphql")
}

fn client(endpoint: String, timeout: Duration) -> HttpLookup {
    HttpLookup::new(LookupConfig { endpoint, timeout }).unwrap()
}

/// Mock of the real service: knows exactly one slug.
async fn catalog(Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default();
    assert!(query.contains("findVersion"), "unexpected query document: {query}");

    match body["variables"]["slug"].as_str() {
        Some("Python") => Json(json!({
            "data": {
                "findVersion": {
                    "latestVersion": "3.12.1",
                    "software": { "slug": "python", "name": "Python" }
                }
            }
        })),
        _ => Json(json!({ "data": { "findVersion": null } })),
    }
}

#[tokio::test]
async fn found_release_is_returned() {
    let endpoint = spawn_endpoint(Router::new().route("/graphql", post(catalog))).await;
    let lookup = client(endpoint, Duration::from_secs(5));

    let result = lookup.lookup("Python").await;

    assert_eq!(
        result,
        Ok(Some(Release { slug: "python".into(), name: "Python".into(), version: "3.12.1".into() }))
    );
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let endpoint = spawn_endpoint(Router::new().route("/graphql", post(catalog))).await;
    let lookup = client(endpoint, Duration::from_secs(5));

    assert_eq!(lookup.lookup("doesnotexist123").await, Ok(None));
}

#[tokio::test]
async fn empty_slug_is_not_found() {
    let endpoint = spawn_endpoint(Router::new().route("/graphql", post(catalog))).await;
    let lookup = client(endpoint, Duration::from_secs(5));

    assert_eq!(lookup.lookup("").await, Ok(None));
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let router = Router::new()
        .route("/graphql", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
    let endpoint = spawn_endpoint(router).await;
    let lookup = client(endpoint, Duration::from_secs(5));

    assert_eq!(lookup.lookup("Python").await, Err(LookupError::Status(502)));
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let router = Router::new().route("/graphql", post(|| async { "definitely not json" }));
    let endpoint = spawn_endpoint(router).await;
    let lookup = client(endpoint, Duration::from_secs(5));

    assert!(matches!(lookup.lookup("Python").await, Err(LookupError::Decode(_))));
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let lookup = client(format!("http://{addr}/graphql"), Duration::from_secs(5));

    let result = lookup.lookup("Python").await;
    assert!(
        matches!(result, Err(LookupError::Transport(_) | LookupError::Timeout)),
        "unexpected outcome: {result:?}"
    );
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let router = Router::new().route(
        "/graphql",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "data": { "findVersion": null } }))
        }),
    );
    let endpoint = spawn_endpoint(router).await;
    let lookup = client(endpoint, Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let result = lookup.lookup("Python").await;

    assert_eq!(result, Err(LookupError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));
}
