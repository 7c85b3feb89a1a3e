//! Metadata document filter.
//!
//! Rewrites a package metadata document so it only exposes versions that
//! pass the age policy, after an optional popularity short-circuit. Invoked
//! once per metadata document produced for a client, so it must stay cheap,
//! deterministic, and side-effect-free apart from the oracle cache.

use crate::metadata::{PackageMetadata, TIME_CREATED, TIME_MODIFIED};
use crate::oracle::{Clock, PopularityOracle, SystemClock};
use crate::policy::{is_old_enough, strip_override, Allowlist};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The dist-tag clients resolve by default.
const LATEST_TAG: &str = "latest";

/// Filters metadata documents by version age and package popularity.
pub struct MetadataFilter {
    min_age_hours: u32,
    /// Popularity gate; `None` when disabled by configuration.
    oracle: Option<Arc<PopularityOracle>>,
    allowlist: Allowlist,
    clock: Arc<dyn Clock>,
}

impl MetadataFilter {
    pub fn new(
        min_age_hours: u32,
        oracle: Option<Arc<PopularityOracle>>,
        allowlist: Allowlist,
    ) -> Self {
        Self::with_clock(min_age_hours, oracle, allowlist, Arc::new(SystemClock))
    }

    /// Constructor with an explicit clock (used by tests).
    pub fn with_clock(
        min_age_hours: u32,
        oracle: Option<Arc<PopularityOracle>>,
        allowlist: Allowlist,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            min_age_hours,
            oracle,
            allowlist,
            clock,
        }
    }

    /// Filter one metadata document.
    ///
    /// Documents that cannot be validated (no `time` map, no `versions` map)
    /// pass through unfiltered; that is an acknowledged gap, logged as a
    /// warning, and preferable to hiding a package we know nothing about.
    pub async fn filter(&self, doc: PackageMetadata) -> PackageMetadata {
        let (name, forced) = strip_override(&doc.name);
        if forced || self.allowlist.matches(name) {
            debug!("{} is exempt from policy checks", name);
            return doc;
        }

        if doc.time.is_none() {
            warn!(
                "Package {} has no publish-time map; serving unfiltered",
                doc.name
            );
            return doc;
        }
        if doc.versions.is_none() {
            warn!(
                "Package {} has no versions map; serving unfiltered",
                doc.name
            );
            return doc;
        }

        if let Some(oracle) = &self.oracle {
            if !oracle.meets_threshold(name).await {
                debug!(
                    "Package {} is below the popularity threshold; emptying document",
                    name
                );
                return doc.emptied();
            }
        }

        self.filter_by_age(doc)
    }

    fn filter_by_age(&self, mut doc: PackageMetadata) -> PackageMetadata {
        let now = self.clock.now();
        let time = doc.time.take().unwrap_or_default();
        let versions = doc.versions.take().unwrap_or_default();
        doc.time = Some(time);

        let mut survivors = BTreeMap::new();
        for (version, descriptor) in versions {
            let published = doc
                .time
                .as_ref()
                .and_then(|time| time.get(&version))
                .map(String::as_str);
            if published.is_none() {
                debug!(
                    "Version {} of {} has no publish timestamp; dropping",
                    version, doc.name
                );
                continue;
            }
            if is_old_enough(published, self.min_age_hours, now) {
                survivors.insert(version, descriptor);
            } else {
                debug!(
                    "Version {} of {} is younger than {}h; hiding",
                    version, doc.name, self.min_age_hours
                );
            }
        }

        if survivors.is_empty() {
            debug!("No version of {} passed the age policy", doc.name);
            doc.versions = Some(survivors);
            return doc.emptied();
        }

        let time = doc.time.take().unwrap_or_default();

        // Tags may only reference surviving versions.
        let mut dist_tags: BTreeMap<String, String> = doc
            .dist_tags
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, version)| survivors.contains_key(version))
            .collect();

        // A package whose `latest` was filtered away is confusing to
        // clients, so repoint it at the newest surviving version.
        if !dist_tags.contains_key(LATEST_TAG) {
            if let Some(newest) = newest_surviving(&survivors, &time) {
                dist_tags.insert(LATEST_TAG.to_string(), newest);
            }
        }

        doc.time = Some(
            time.into_iter()
                .filter(|(key, _)| {
                    key == TIME_CREATED || key == TIME_MODIFIED || survivors.contains_key(key)
                })
                .collect(),
        );
        doc.versions = Some(survivors);
        doc.dist_tags = Some(dist_tags);
        doc
    }
}

/// Surviving version with the maximum publish timestamp. On an exact tie the
/// version encountered last in iteration order wins.
fn newest_surviving(
    survivors: &BTreeMap<String, serde_json::Value>,
    time: &BTreeMap<String, String>,
) -> Option<String> {
    let mut best: Option<(&str, DateTime<Utc>)> = None;
    for version in survivors.keys() {
        let Some(published) = time.get(version) else {
            continue;
        };
        let Ok(published_at) = DateTime::parse_from_rfc3339(published) else {
            continue;
        };
        let published_at = published_at.with_timezone(&Utc);
        if best.is_none_or(|(_, at)| published_at >= at) {
            best = Some((version, published_at));
        }
    }
    best.map(|(version, _)| version.to_string())
}
