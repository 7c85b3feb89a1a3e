//! Request interception handlers.
//!
//! Installed ahead of the pass-through fallback, these run the per-request
//! policy state machine: allowlist check, then popularity, then (for
//! metadata) the age filter, ending in forward, synthesized empty document,
//! or a 404 rejection. No state survives a request; every request is
//! evaluated from scratch.
//!
//! Tarball requests are gated on popularity only. Age gating is
//! metadata-only in this design: a client that never saw a version in
//! filtered metadata has no tarball URL for it.

use crate::server::AppState;
use crate::tarball::parse_tarball_version;
use crate::upstream::UpstreamRegistry;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cooldown_core::{strip_override, PackageMetadata};
use semver::Version;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed `error` value of the rejection response contract.
const REJECTION_ERROR: &str = "Not found";

/// Body of a policy rejection: fixed error string plus a human-readable
/// reason naming the package, version, and violated policy.
#[derive(Debug, Serialize)]
struct Rejection {
    error: &'static str,
    reason: String,
}

fn reject(name: &str, version: &Version, downloads: u64, threshold: u64) -> Response {
    let reason = format!(
        "{}@{} rejected by policy min-weekly-downloads: {} weekly downloads below threshold {}",
        name, version, downloads, threshold
    );
    info!("{}", reason);
    (
        StatusCode::NOT_FOUND,
        Json(Rejection {
            error: REJECTION_ERROR,
            reason,
        }),
    )
        .into_response()
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// `GET /:package` — unscoped metadata.
pub async fn handle_metadata(
    State(state): State<Arc<AppState>>,
    Path(package): Path<String>,
) -> Response {
    gate_metadata(&state, package).await
}

/// `GET /:scope/:package` — scoped metadata.
pub async fn handle_scoped_metadata(
    State(state): State<Arc<AppState>>,
    Path((scope, package)): Path<(String, String)>,
) -> Response {
    gate_metadata(&state, format!("{}/{}", scope, package)).await
}

/// `GET /:package/-/:filename` — unscoped tarball.
pub async fn handle_tarball(
    State(state): State<Arc<AppState>>,
    Path((package, filename)): Path<(String, String)>,
) -> Response {
    gate_tarball(&state, package, filename).await
}

/// `GET /:scope/:package/-/:filename` — scoped tarball.
pub async fn handle_scoped_tarball(
    State(state): State<Arc<AppState>>,
    Path((scope, package, filename)): Path<(String, String, String)>,
) -> Response {
    gate_tarball(&state, format!("{}/{}", scope, package), filename).await
}

/// Anything the gate does not intercept streams through verbatim.
///
/// Forwarding is GET-only: replaying a POST or PUT as a bodyless GET would
/// silently mutate the request, so other methods get a 405 instead.
pub async fn handle_fallback(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response();
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    state.upstream.forward(path_and_query).await
}

/// Metadata interception: allowlist, popularity short-circuit, then a direct
/// upstream fetch run through the age filter. A failed direct fetch falls
/// back to plain forwarding — availability over strictness.
async fn gate_metadata(state: &AppState, raw_name: String) -> Response {
    let (name, forced) = strip_override(&raw_name);
    let exempt = forced || state.allowlist.matches(name);

    if !exempt {
        if let Some(oracle) = &state.oracle {
            if !oracle.meets_threshold(name).await {
                info!(
                    "Package {} is below the popularity threshold; serving empty metadata",
                    name
                );
                return Json(PackageMetadata::empty_for(name)).into_response();
            }
        }
    }

    match state.upstream.fetch_metadata(name).await {
        Ok(Some(doc)) => {
            if exempt {
                debug!("Serving {} unfiltered (exempt)", name);
                return Json(doc).into_response();
            }
            Json(state.filter.filter(doc).await).into_response()
        }
        // No metadata upstream: let the upstream's own 404 speak.
        Ok(None) => {
            state
                .upstream
                .forward(&UpstreamRegistry::metadata_path(name))
                .await
        }
        Err(e) => {
            warn!(
                "Direct metadata fetch for {} failed ({}); falling back to unfiltered forwarding",
                name, e
            );
            state
                .upstream
                .forward(&UpstreamRegistry::metadata_path(name))
                .await
        }
    }
}

/// Tarball interception: parse the version out of the filename (forward
/// unchanged when there is none), then allowlist and popularity checks.
async fn gate_tarball(state: &AppState, raw_name: String, filename: String) -> Response {
    let (name, forced) = strip_override(&raw_name);
    let forward_path = format!("/{}/-/{}", name, filename);

    let Some(version) = parse_tarball_version(&filename) else {
        debug!("No version in filename {}; forwarding unchanged", filename);
        return state.upstream.forward(&forward_path).await;
    };

    if forced || state.allowlist.matches(name) {
        debug!("Tarball for {} is exempt from policy checks", name);
        return state.upstream.forward(&forward_path).await;
    }

    if let Some(oracle) = &state.oracle {
        let downloads = oracle.weekly_downloads(name).await;
        if downloads < oracle.threshold() {
            return reject(name, &version, downloads, oracle.threshold());
        }
    }

    state.upstream.forward(&forward_path).await
}
