//! HTTP server implementation using Axum.

use crate::handlers::{
    handle_fallback, handle_health, handle_metadata, handle_scoped_metadata,
    handle_scoped_tarball, handle_tarball,
};
use crate::upstream::UpstreamRegistry;
use axum::routing::get;
use axum::Router;
use cooldown_core::{
    Allowlist, MetadataFilter, PolicyConfig, PopularityOracle, Result, StatsSource,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    /// Metadata document filter (age + popularity).
    pub filter: MetadataFilter,
    /// Popularity oracle; `None` when the popularity gate is disabled.
    pub oracle: Option<Arc<PopularityOracle>>,
    /// Packages exempt from all checks.
    pub allowlist: Allowlist,
    /// Upstream registry client.
    pub upstream: UpstreamRegistry,
}

impl AppState {
    /// Wire up the policy components from configuration. The stats source is
    /// injected so tests can run without a statistics endpoint.
    pub fn new(
        config: &PolicyConfig,
        registry_url: &str,
        stats: Arc<dyn StatsSource>,
    ) -> Result<Self> {
        let oracle = (config.min_weekly_downloads > 0)
            .then(|| Arc::new(PopularityOracle::new(stats, config.min_weekly_downloads)));
        let allowlist = Allowlist::new(config.allow.iter().cloned());
        let filter = MetadataFilter::new(config.min_age_hours, oracle.clone(), allowlist.clone());

        Ok(Self {
            filter,
            oracle,
            allowlist,
            upstream: UpstreamRegistry::new(registry_url)?,
        })
    }
}

/// Build the gateway router.
///
/// The interception routes sit ahead of the fallback; the fallback is the
/// "default handling" every degraded policy path ends up in. The first path
/// segment is the package name for unscoped requests and the `@scope` for
/// scoped ones, so all routes share the `:package` parameter name.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/:package", get(handle_metadata))
        .route("/:package/:sub", get(handle_scoped_metadata))
        .route("/:package/-/:filename", get(handle_tarball))
        .route("/:package/:sub/-/:filename", get(handle_scoped_tarball))
        .fallback(handle_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    state: Arc<AppState>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Gateway listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooldown_core::NpmStatsClient;

    #[tokio::test]
    async fn test_server_starts() {
        let config = PolicyConfig::default();
        let stats = Arc::new(NpmStatsClient::new("http://127.0.0.1:1").unwrap());
        let state = Arc::new(
            AppState::new(&config, "http://127.0.0.1:1", stats).unwrap(),
        );

        let addr = start_server(state, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }
}
