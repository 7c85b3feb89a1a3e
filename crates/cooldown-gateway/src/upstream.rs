//! Upstream registry client.
//!
//! Two jobs: fetch metadata documents directly (bypassing any intermediate
//! cache, so the age filter always sees fresh publish times), and stream
//! arbitrary requests through verbatim — the gateway's "default handling"
//! that every degraded policy path falls back to.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cooldown_core::{CooldownError, PackageMetadata, PolicyDefaults, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

/// Client for the upstream npm-compatible registry.
#[derive(Debug, Clone)]
pub struct UpstreamRegistry {
    client: Client,
    base_url: String,
}

impl UpstreamRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(PolicyDefaults::REQUEST_TIMEOUT)
            .user_agent(PolicyDefaults::USER_AGENT)
            .build()
            .map_err(|e| CooldownError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Registry path for a package's metadata document.
    pub fn metadata_path(name: &str) -> String {
        format!("/{}", urlencoding::encode(name))
    }

    /// Fetch a package's metadata document. `Ok(None)` on upstream 404.
    pub async fn fetch_metadata(&self, name: &str) -> Result<Option<PackageMetadata>> {
        let url = format!("{}{}", self.base_url, Self::metadata_path(name));
        debug!("Fetching upstream metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CooldownError::Network {
                message: format!("Upstream metadata request failed: {}", e),
                source: Some(e),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CooldownError::UpstreamStatus {
                status: response.status().as_u16(),
                url,
            });
        }

        let doc = response
            .json()
            .await
            .map_err(|e| CooldownError::Network {
                message: format!("Failed to parse upstream metadata: {}", e),
                source: Some(e),
            })?;

        Ok(Some(doc))
    }

    /// Stream an upstream response through verbatim, preserving status and
    /// content type. Transport failure yields a 502; never a panic.
    pub async fn forward(&self, path_and_query: &str) -> Response {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("Forwarding to upstream: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Upstream unreachable for {}: {}", url, e);
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Upstream registry unreachable" })),
                )
                    .into_response();
            }
        };

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

        let mut builder = Response::builder().status(status.as_u16());
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder
            .body(Body::from_stream(response.bytes_stream()))
            .unwrap_or_else(|e| {
                warn!("Failed to assemble forwarded response: {}", e);
                StatusCode::BAD_GATEWAY.into_response()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_path_encodes_scoped_names() {
        assert_eq!(UpstreamRegistry::metadata_path("left-pad"), "/left-pad");
        assert_eq!(
            UpstreamRegistry::metadata_path("@scope/pkg"),
            "/%40scope%2Fpkg"
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let upstream = UpstreamRegistry::new("http://registry.test/").unwrap();
        assert_eq!(upstream.base_url, "http://registry.test");
    }
}
