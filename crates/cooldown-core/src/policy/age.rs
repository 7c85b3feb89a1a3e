//! Version age policy.
//!
//! A stateless predicate over a publish timestamp: there is no stored
//! "visible" flag anywhere, so a version flips from hidden to visible purely
//! by wall-clock time advancing between two evaluations.

use chrono::{DateTime, Utc};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Whether a version published at `published` (ISO-8601) is strictly older
/// than `min_age_hours` as of `now`.
///
/// Fails closed: a missing, empty, or unparsable timestamp is never old
/// enough. Absence of proof of age is not proof of safety.
pub fn is_old_enough(published: Option<&str>, min_age_hours: u32, now: DateTime<Utc>) -> bool {
    let Some(raw) = published else {
        return false;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return false;
    }
    let Ok(published_at) = DateTime::parse_from_rfc3339(raw) else {
        return false;
    };

    let age_ms = now
        .signed_duration_since(published_at.with_timezone(&Utc))
        .num_milliseconds();
    let age_hours = age_ms as f64 / MS_PER_HOUR;

    // Strict: a version published exactly at the boundary stays hidden.
    age_hours > f64::from(min_age_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-02-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_older_than_threshold_passes() {
        let published = (now() - Duration::hours(100)).to_rfc3339();
        assert!(is_old_enough(Some(&published), 48, now()));
    }

    #[test]
    fn test_younger_than_threshold_is_hidden() {
        let published = (now() - Duration::hours(10)).to_rfc3339();
        assert!(!is_old_enough(Some(&published), 48, now()));
    }

    #[test]
    fn test_exactly_at_threshold_is_hidden() {
        let published = (now() - Duration::hours(48)).to_rfc3339();
        assert!(!is_old_enough(Some(&published), 48, now()));
    }

    #[test]
    fn test_one_millisecond_past_threshold_passes() {
        let published = (now() - Duration::hours(48) - Duration::milliseconds(1)).to_rfc3339();
        assert!(is_old_enough(Some(&published), 48, now()));
    }

    #[test]
    fn test_missing_or_garbage_timestamp_fails_closed() {
        assert!(!is_old_enough(None, 0, now()));
        assert!(!is_old_enough(Some(""), 0, now()));
        assert!(!is_old_enough(Some("   "), 0, now()));
        assert!(!is_old_enough(Some("last tuesday"), 0, now()));
    }

    #[test]
    fn test_future_timestamp_is_hidden() {
        let published = (now() + Duration::hours(5)).to_rfc3339();
        assert!(!is_old_enough(Some(&published), 0, now()));
    }

    #[test]
    fn test_npm_style_millisecond_timestamps_parse() {
        assert!(is_old_enough(Some("2016-03-01T00:00:00.000Z"), 48, now()));
    }
}
