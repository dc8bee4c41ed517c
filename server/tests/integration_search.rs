use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::builder::build_index;
use search_core::persist::IndexPaths;
use search_core::summary::Truncate;
use search_core::{BuildConfig, EngineConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &Path) -> IndexPaths {
    let pages = dir.join("pages");
    fs::create_dir_all(&pages).unwrap();
    let docs = [
        ("https://rust.example/", "Rust", "Rust is great. rust systems programming with rust."),
        ("https://learn.example/", "Learning", "Learning rust slowly."),
        ("https://other.example/", "Gardening", "Tomatoes need sun and water."),
    ];
    for (i, (url, title, body)) in docs.iter().enumerate() {
        let content = format!("<html><head><title>{title}</title></head><body><p>{body}</p></body></html>");
        let page = serde_json::json!({ "url": url, "content": content });
        fs::write(pages.join(format!("{i}.json")), page.to_string()).unwrap();
    }
    let paths = IndexPaths::new(dir.join("index"));
    build_index(&pages, &paths, &BuildConfig::default(), &Truncate::default()).unwrap();
    paths
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn app_for(paths: &IndexPaths) -> Router {
    server::build_app(&paths.root.to_string_lossy(), EngineConfig::default())
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());

    let (status, json) = call(app_for(&paths), "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(json["total_hits"], 2);
    assert_eq!(arr[0]["url"], "https://rust.example/");
    assert_eq!(arr[0]["title"], "Rust");
    assert_eq!(arr[1]["doc_id"], 1);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let (status, _) = call(app_for(&paths), "/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn boolean_mode_and_document_lookup() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());

    let (status, json) = call(app_for(&paths), "/search?q=learning%20rust&mode=boolean").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["doc_id"], 1);

    let (status, json) = call(app_for(&paths), "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://other.example/");
    assert_eq!(json["title"], "Gardening");

    let (status, _) = call(app_for(&paths), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_index_serves_empty_results() {
    let dir = tempdir().unwrap();
    let app = server::build_app(&dir.path().join("absent").to_string_lossy(), EngineConfig::default());
    let (status, json) = call(app, "/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}
