//! Cooldown policy engine.
//!
//! Delays adoption of freshly published npm package versions and rejects
//! packages without download reputation, to blunt supply-chain attacks that
//! rely on near-instant installs of new malicious releases. This crate holds
//! the policy logic only; the HTTP gateway that fronts an upstream registry
//! lives in `cooldown-gateway`.
//!
//! - [`policy`] — the age predicate and allowlist/override handling
//! - [`oracle`] — weekly download counts with a TTL cache and fail-open
//!   posture
//! - [`filter`] — the metadata document rewrite
//! - [`metadata`] — the registry document model

pub mod config;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod oracle;
pub mod policy;

pub use config::{PolicyConfig, PolicyDefaults};
pub use error::{CooldownError, Result};
pub use filter::MetadataFilter;
pub use metadata::PackageMetadata;
pub use oracle::{Clock, NpmStatsClient, PopularityOracle, StatsSource, SystemClock};
pub use policy::{is_old_enough, strip_override, Allowlist, OVERRIDE_MARKER};
