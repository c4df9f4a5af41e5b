//! HTTP JSON API for a hurl package repository.
//!
//! Serves the client protocol (`/api/sync`, `/api/search`, `/api/info`) and
//! read-only views of branches, packages, logs and files under `/v1`.
//! Repository and index reads are blocking and run on tokio's blocking pool.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{API_ERROR, PROTOCOL_VERSION};
pub use router::build_router;
pub use server::HurlServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use hurl_index::{IndexConfig, PackageIndex};
    use hurl_repo::{MemoryRepo, Snapshot};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const FOO: &str = "\
name: foo
version: '1.0'
release: 2
description: Fast foo tool
dependencies: [libbar >= 2, zlib]
sources:
  - http://example.org/foo-${version}.tar.gz
  - foo.patch
";

    const FOO_ALICE: &str = "name: foo\nversion: '1.1'\nrelease: 1\ndescription: Alice's foo\n";

    fn app() -> (MemoryRepo, Router) {
        let mem = MemoryRepo::new();
        mem.commit(
            "master",
            &Snapshot::new()
                .file("README", "welcome")
                .dir("foo", &[("Cakefile", FOO), ("foo.patch", "--- a\n+++ b\n")]),
            "add foo",
        )
        .unwrap();
        mem.commit(
            "alice/default",
            &Snapshot::new().dir("foo", &[("Cakefile", FOO_ALICE)]),
            "fork foo",
        )
        .unwrap();

        let config = IndexConfig::default().with_refresh_minutes(0);
        let index = Arc::new(PackageIndex::in_memory(config).unwrap());
        index.index_repo(&mem.repo()).unwrap();
        index.flush().unwrap();

        let state = AppState::new(mem.repo(), index, &ServerConfig::default());
        (mem, build_router(state))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> Value {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    // ---- client protocol ----

    #[tokio::test]
    async fn api_sync_reports_changed_versions() {
        let (_mem, app) = app();
        let body = json!({ "data": [
            ["master", "foo", "0.9-1"],
            {"branch": "alice/default", "package": "foo", "version": "1.1-1"},
            ["master", "missing", "1-1"],
        ]});
        let reply = post_json(app, "/api/sync", &body.to_string()).await;
        assert_eq!(reply["protocol"], 1.0);
        let data = reply["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["package"], "foo");
        assert_eq!(data[0]["version"], "1.0-2");
        assert_eq!(data[0]["dependencies"][0], json!(["libbar", ">=", "2"]));
    }

    #[tokio::test]
    async fn api_search_returns_counts() {
        let (_mem, app) = app();
        let reply = post_json(app, "/api/search", r#"{"data": "foo"}"#).await;
        assert_eq!(reply["protocol"], 1.0);
        assert_eq!(reply["data"]["count"], 1);
        assert_eq!(reply["data"]["is_exact"], true);
        assert_eq!(reply["data"]["results"][0]["branch"], "master");
    }

    #[tokio::test]
    async fn api_info_returns_manifest() {
        let (_mem, app) = app();
        let reply = post_json(
            app.clone(),
            "/api/info",
            r#"{"data": {"branch": "master", "package": "foo"}}"#,
        )
        .await;
        assert_eq!(reply["data"]["description"], "Fast foo tool");

        let reply = post_json(app, "/api/info", r#"{"data": {"branch": "master", "package": "nope"}}"#).await;
        assert_eq!(reply["data"], Value::Null);
    }

    #[tokio::test]
    async fn api_errors_are_reported_in_body() {
        let (_mem, app) = app();
        for body in ["not json", r#"{"nodata": 1}"#, r#"{"data": 5}"#] {
            let reply = post_json(app.clone(), "/api/sync", body).await;
            assert_eq!(reply["protocol"], 1.0);
            assert_eq!(reply["error"], API_ERROR);
            assert!(reply.get("data").is_none());
        }
    }

    // ---- views ----

    #[tokio::test]
    async fn health_endpoint() {
        let (_mem, app) = app();
        let (status, body) = get_json(app, "/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn branches_and_packages() {
        let (_mem, app) = app();
        let (status, body) = get_json(app.clone(), "/v1/branches").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branches"], json!(["master", "alice/default"]));

        let (_, body) = get_json(app, "/v1/packages").await;
        assert_eq!(body["packages"]["foo"], json!(["master", "alice/default"]));
        assert_eq!(body["in_master"], json!(["foo"]));
    }

    #[tokio::test]
    async fn branch_view_with_slashes() {
        let (_mem, app) = app();
        let (status, body) = get_json(app.clone(), "/v1/branch/alice/default").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branch"], "alice/default");
        assert_eq!(body["packages"], json!(["foo"]));

        let (status, _) = get(app, "/v1/branch/nobody/here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn package_view_resolves_identifier() {
        let (_mem, app) = app();
        let (status, body) = get_json(app.clone(), "/v1/package/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branch"], "master");
        assert_eq!(body["files"], json!(["Cakefile", "foo.patch"]));
        assert_eq!(
            body["sources"][0]["url"],
            "http://example.org/foo-1.0.tar.gz"
        );

        let (_, body) = get_json(app.clone(), "/v1/package/alice/foo").await;
        assert_eq!(body["branch"], "alice/default");
        assert_eq!(body["manifest"]["version"], "1.1");

        let (status, _) = get(app, "/v1/package/alice/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logs_are_truncated() {
        let (mem, app) = app();
        for i in 0..25 {
            let text = format!("name: foo\nversion: '1.{i}'\nrelease: 1\n");
            mem.commit(
                "master",
                &Snapshot::new().dir("foo", &[("Cakefile", text.as_str())]),
                &format!("bump {i}"),
            )
            .unwrap();
        }
        let (status, body) = get_json(app.clone(), "/v1/branch-log/master").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["log"].as_array().unwrap().len(), 20);
        assert_eq!(body["log"][0]["message"].as_str().unwrap().trim(), "bump 24");

        let (status, body) = get_json(app.clone(), "/v1/package-log/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["log"].as_array().unwrap().len(), 20);

        let (status, _) = get(app, "/v1/package-log/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn package_branches() {
        let (_mem, app) = app();
        let (status, body) = get_json(app.clone(), "/v1/package-branches/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branches"], json!(["master", "alice/default"]));

        let (status, _) = get(app, "/v1/package-branches/zzz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn raw_files_carry_content_type() {
        let (_mem, app) = app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/v1/file/foo/foo.patch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let (status, body) = get(app.clone(), "/v1/file/master/foo/Cakefile").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, FOO.as_bytes());

        let (status, _) = get(app, "/v1/file/foo/missing.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn readme() {
        let (_mem, app) = app();
        let (status, body) = get(app.clone(), "/v1/readme/master").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"welcome");

        let (status, _) = get(app, "/v1/readme/alice/default").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_view() {
        let (_mem, app) = app();
        let (status, body) = get_json(app.clone(), "/v1/search?q=foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["branch"], "master");
        assert_eq!(body["page"], 0);

        let (status, _) = get(app, "/v1/search").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
