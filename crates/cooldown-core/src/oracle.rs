//! Popularity oracle: weekly download counts as a reputation signal.
//!
//! Wraps the external download-statistics endpoint with:
//! - An in-memory TTL cache keyed by package name, bounding outbound
//!   request rate (5 minutes by default).
//! - A fail-open posture on oracle errors: an outage of the third-party
//!   statistics service must not become a registry-wide outage, so errors
//!   count as "threshold met". An explicit not-found is different: that is
//!   the endpoint saying the package has no data, and yields zero.
//!
//! Each lookup is a single best-effort attempt; no retries, no backoff.

use crate::config::PolicyDefaults;
use crate::error::{CooldownError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Time source, injectable so cache expiry is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of weekly download counts.
///
/// `Ok(None)` means the endpoint explicitly has no data for that name;
/// `Err` means the endpoint could not be consulted at all.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn weekly_downloads(&self, name: &str) -> Result<Option<u64>>;
}

/// Download-statistics client for the npm API
/// (`GET <base>/downloads/point/last-week/<name>`).
#[derive(Debug)]
pub struct NpmStatsClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DownloadsPoint {
    downloads: u64,
}

impl NpmStatsClient {
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
}

#[async_trait]
impl StatsSource for NpmStatsClient {
    async fn weekly_downloads(&self, name: &str) -> Result<Option<u64>> {
        let url = format!(
            "{}/downloads/point/last-week/{}",
            self.base_url,
            urlencoding::encode(name)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CooldownError::Network {
                message: format!("Stats request failed: {}", e),
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

        let point: DownloadsPoint =
            response.json().await.map_err(|e| CooldownError::Network {
                message: format!("Failed to parse stats response: {}", e),
                source: Some(e),
            })?;

        Ok(Some(point.downloads))
    }
}

/// A cached download count.
#[derive(Debug, Clone, Copy)]
struct CachedCount {
    downloads: u64,
    fetched_at: DateTime<Utc>,
}

/// Popularity oracle with a process-wide TTL cache.
///
/// Concurrent lookups for the same name may race to populate the cache;
/// within one TTL window every writer computes the same value, so
/// last-writer-wins needs no coordination.
pub struct PopularityOracle {
    source: Arc<dyn StatsSource>,
    cache: RwLock<HashMap<String, CachedCount>>,
    ttl: Duration,
    threshold: u64,
    clock: Arc<dyn Clock>,
}

impl PopularityOracle {
    /// Create an oracle over `source` with the given rejection threshold.
    pub fn new(source: Arc<dyn StatsSource>, threshold: u64) -> Self {
        Self::with_clock(
            source,
            threshold,
            PolicyDefaults::DOWNLOADS_CACHE_TTL,
            Arc::new(SystemClock),
        )
    }

    /// Full constructor with an explicit TTL and clock (used by tests).
    pub fn with_clock(
        source: Arc<dyn StatsSource>,
        threshold: u64,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            ttl,
            threshold,
            clock,
        }
    }

    /// Configured minimum weekly download count.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Weekly download count for `name`, from cache when fresh.
    ///
    /// On oracle failure (anything but an explicit not-found) this fails
    /// open: it returns the threshold itself, uncached, so the package is
    /// not blocked by an unavailable statistics service and the next
    /// request retries the endpoint.
    pub async fn weekly_downloads(&self, name: &str) -> u64 {
        let now = self.clock.now();

        if let Some(hit) = self.cache.read().await.get(name) {
            let age = now.signed_duration_since(hit.fetched_at);
            if age.num_seconds() >= 0 && age.to_std().is_ok_and(|age| age < self.ttl) {
                debug!("Download count for {} served from cache", name);
                return hit.downloads;
            }
        }

        match self.source.weekly_downloads(name).await {
            Ok(found) => {
                // Explicit not-found is a legitimate answer: zero downloads.
                let downloads = found.unwrap_or(0);
                self.cache.write().await.insert(
                    name.to_string(),
                    CachedCount {
                        downloads,
                        fetched_at: now,
                    },
                );
                downloads
            }
            Err(e) => {
                warn!(
                    "Download stats unavailable for {} ({}); failing open",
                    name, e
                );
                self.threshold
            }
        }
    }

    /// Whether `name` meets the configured popularity threshold.
    pub async fn meets_threshold(&self, name: &str) -> bool {
        self.weekly_downloads(name).await >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Stats source returning a fixed answer and counting calls.
    struct FixedStats {
        answer: Result<Option<u64>>,
        calls: AtomicU64,
    }

    impl FixedStats {
        fn ok(downloads: u64) -> Self {
            Self {
                answer: Ok(Some(downloads)),
                calls: AtomicU64::new(0),
            }
        }

        fn not_found() -> Self {
            Self {
                answer: Ok(None),
                calls: AtomicU64::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err(CooldownError::UpstreamStatus {
                    status: 500,
                    url: "http://stats.test".to_string(),
                }),
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl StatsSource for FixedStats {
        async fn weekly_downloads(&self, _name: &str) -> Result<Option<u64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(v) => Ok(*v),
                Err(_) => Err(CooldownError::UpstreamStatus {
                    status: 500,
                    url: "http://stats.test".to_string(),
                }),
            }
        }
    }

    /// Clock whose reading is set by the test.
    struct FakeClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        fn at(iso: &str) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(iso.parse().unwrap()),
            })
        }

        fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn oracle_with(
        source: Arc<FixedStats>,
        threshold: u64,
        clock: Arc<FakeClock>,
    ) -> PopularityOracle {
        PopularityOracle::with_clock(source, threshold, Duration::from_secs(300), clock)
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let stats = Arc::new(FixedStats::ok(12_000));
        let clock = FakeClock::at("2026-02-01T00:00:00Z");
        let oracle = oracle_with(stats.clone(), 5000, clock.clone());

        assert_eq!(oracle.weekly_downloads("lodash").await, 12_000);
        clock.advance(chrono::Duration::seconds(299));
        assert_eq!(oracle.weekly_downloads("lodash").await, 12_000);
        assert_eq!(stats.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let stats = Arc::new(FixedStats::ok(12_000));
        let clock = FakeClock::at("2026-02-01T00:00:00Z");
        let oracle = oracle_with(stats.clone(), 5000, clock.clone());

        oracle.weekly_downloads("lodash").await;
        clock.advance(chrono::Duration::seconds(301));
        oracle.weekly_downloads("lodash").await;
        assert_eq!(stats.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_zero_and_cached() {
        let stats = Arc::new(FixedStats::not_found());
        let clock = FakeClock::at("2026-02-01T00:00:00Z");
        let oracle = oracle_with(stats.clone(), 5000, clock);

        assert_eq!(oracle.weekly_downloads("never-published").await, 0);
        assert!(!oracle.meets_threshold("never-published").await);
        // The explicit zero was cached; one fetch covers both lookups.
        assert_eq!(stats.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_fails_open() {
        let stats = Arc::new(FixedStats::failing());
        let clock = FakeClock::at("2026-02-01T00:00:00Z");
        let oracle = oracle_with(stats.clone(), 5000, clock);

        assert_eq!(oracle.weekly_downloads("left-pad").await, 5000);
        assert!(oracle.meets_threshold("left-pad").await);
        // Failures are not cached: every call retries the endpoint.
        assert_eq!(stats.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_threshold_passes_unknown_packages() {
        let stats = Arc::new(FixedStats::not_found());
        let clock = FakeClock::at("2026-02-01T00:00:00Z");
        let oracle = oracle_with(stats, 0, clock);
        assert!(oracle.meets_threshold("anything").await);
    }
}
