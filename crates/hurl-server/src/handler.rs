//! Request handlers.
//!
//! `/api/*` endpoints speak the client protocol: a JSON request body of the
//! form `{"data": ...}` and a response tagged with [`PROTOCOL_VERSION`].
//! Any failure there yields an error body instead of an HTTP error status.
//! `/v1/*` endpoints are read-only JSON views; absent resources are 404.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use hurl_repo::{content_type, resolve, VersionRequest, MASTER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Version tag carried by every `/api` response.
pub const PROTOCOL_VERSION: f64 = 1.0;

/// Body returned by `/api` endpoints when a request cannot be served.
pub const API_ERROR: &str = "An error has occurred.";

#[derive(Debug, Deserialize)]
struct ApiRequest<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct InfoRequest {
    branch: String,
    package: String,
}

#[derive(Debug, Serialize)]
struct SearchData {
    count: usize,
    is_exact: bool,
    results: Vec<hurl_index::SearchResult>,
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> ServerResult<T> {
    serde_json::from_slice::<ApiRequest<T>>(body)
        .map(|request| request.data)
        .map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn api_response<T: Serialize>(endpoint: &str, result: ServerResult<T>) -> Json<Value> {
    match result {
        Ok(data) => Json(json!({ "protocol": PROTOCOL_VERSION, "data": data })),
        Err(e) => {
            warn!(endpoint, error = %e, "api request failed");
            Json(json!({ "protocol": PROTOCOL_VERSION, "error": API_ERROR }))
        }
    }
}

// ---- Client protocol ----

/// Report packages whose live version differs from the client's.
pub async fn api_sync(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<Vec<VersionRequest>>(&body) {
        Ok(requests) => {
            state
                .blocking(move |s| Ok(s.repo.latest_versions(&requests)?))
                .await
        }
        Err(e) => Err(e),
    };
    api_response("sync", result)
}

pub async fn api_search(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<String>(&body) {
        Ok(query) => {
            state
                .blocking(move |s| {
                    let found = s.index.search(&query)?;
                    Ok(SearchData {
                        count: found.count,
                        is_exact: found.exact,
                        results: found.results,
                    })
                })
                .await
        }
        Err(e) => Err(e),
    };
    api_response("search", result)
}

/// A package's manifest, or `null` if it does not exist.
pub async fn api_info(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<InfoRequest>(&body) {
        Ok(request) => {
            state
                .blocking(move |s| Ok(s.repo.package_manifest(&request.branch, &request.package)?))
                .await
        }
        Err(e) => Err(e),
    };
    api_response("info", result)
}

// ---- Views ----

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": "hurl-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Every branch, `master` first.
pub async fn branches_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let branches = state.blocking(|s| Ok(s.repo.list_branches()?)).await?;
    Ok(Json(json!({ "count": branches.len(), "branches": branches })))
}

/// Every package name with the branches carrying it, and the names present
/// in `master`.
pub async fn packages_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let (packages, in_master) = state
        .blocking(|s| {
            let packages: BTreeMap<String, Vec<String>> = s.repo.all_packages()?;
            let in_master = s.repo.packages_in_branch(MASTER)?.unwrap_or_default();
            Ok((packages, in_master))
        })
        .await?;
    Ok(Json(json!({ "packages": packages, "in_master": in_master })))
}

pub async fn branch_handler(
    State(state): State<AppState>,
    Path(branch): Path<String>,
) -> ServerResult<Json<Value>> {
    let lookup = branch.clone();
    let packages = state
        .blocking(move |s| Ok(s.repo.packages_in_branch(&lookup)?))
        .await?
        .ok_or_else(|| ServerError::not_found(format!("branch {branch}")))?;
    Ok(Json(json!({ "branch": branch, "packages": packages })))
}

pub async fn branch_log_handler(
    State(state): State<AppState>,
    Path(branch): Path<String>,
) -> ServerResult<Json<Value>> {
    let lookup = branch.clone();
    let log = state
        .blocking(move |s| {
            let log = s.repo.package_log(&lookup, None)?;
            Ok(log.map(|mut log| {
                log.truncate(s.log_limit);
                log
            }))
        })
        .await?
        .ok_or_else(|| ServerError::not_found(format!("branch {branch}")))?;
    Ok(Json(json!({ "branch": branch, "log": log })))
}

/// Package page. `ident` is a public identifier such as `alice/foo`.
pub async fn package_handler(
    State(state): State<AppState>,
    Path(ident): Path<String>,
) -> ServerResult<Json<hurl_repo::PackageView>> {
    let (branch, package) = resolve(&ident);
    let view = state
        .blocking(move |s| Ok(s.repo.package_view(&branch, &package)?))
        .await?
        .ok_or_else(|| ServerError::not_found(format!("package {ident}")))?;
    Ok(Json(view))
}

pub async fn package_log_handler(
    State(state): State<AppState>,
    Path(ident): Path<String>,
) -> ServerResult<Json<Value>> {
    let (branch, package) = resolve(&ident);
    let found = state
        .blocking(move |s| {
            if s.repo.package_tree(&branch, &package)?.is_none() {
                return Ok(None);
            }
            let log = s.repo.package_log(&branch, Some(&package))?;
            Ok(log.map(|mut log| {
                log.truncate(s.log_limit);
                (branch, package, log)
            }))
        })
        .await?;
    let (branch, package, log) = found.ok_or_else(|| ServerError::not_found(format!("package {ident}")))?;
    Ok(Json(json!({ "branch": branch, "package": package, "log": log })))
}

/// Branches carrying a package of this name.
pub async fn package_branches_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<Value>> {
    let lookup = name.clone();
    let branches = state
        .blocking(move |s| Ok(s.repo.branches_with_package(&lookup)?))
        .await?;
    if branches.is_empty() {
        return Err(ServerError::not_found(format!("package {name}")));
    }
    Ok(Json(json!({ "package": name, "branches": branches })))
}

/// Raw package file. `path` is `<ident>/<filename>`.
pub async fn file_handler(State(state): State<AppState>, Path(path): Path<String>) -> ServerResult<Response> {
    let Some((ident, filename)) = path.rsplit_once('/') else {
        return Err(ServerError::not_found(path.as_str()));
    };
    if ident.is_empty() || filename.is_empty() {
        return Err(ServerError::not_found(path.as_str()));
    }
    let (branch, package) = resolve(ident);
    let name = filename.to_string();
    let data = state
        .blocking(move |s| Ok(s.repo.package_file(&branch, &package, &name)?))
        .await?
        .ok_or_else(|| ServerError::not_found(path.clone()))?;
    Ok(([(header::CONTENT_TYPE, content_type(filename))], data).into_response())
}

pub async fn readme_handler(State(state): State<AppState>, Path(branch): Path<String>) -> ServerResult<Response> {
    let lookup = branch.clone();
    let data = state
        .blocking(move |s| Ok(s.repo.branch_readme(&lookup)?))
        .await?
        .ok_or_else(|| ServerError::not_found(format!("readme of {branch}")))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], data).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    #[serde(default)]
    page: usize,
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<hurl_index::SearchResults>> {
    let query = params.q.ok_or_else(|| ServerError::not_found("search without a query"))?;
    let page = params.page;
    let results = state
        .blocking(move |s| Ok(s.index.search_page(&query, page)?))
        .await?;
    Ok(Json(results))
}
