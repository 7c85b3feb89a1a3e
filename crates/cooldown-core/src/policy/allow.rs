//! Allowlist and manual-override bypass.
//!
//! Two exemption mechanisms share this module so the metadata filter and the
//! tarball gate cannot drift apart: a configured set of names (with
//! trailing-`*` prefix patterns), and a per-request override marker on the
//! package name itself.

use std::collections::HashSet;

/// Prefix marking a request as manually forced past all policy checks.
/// Stripped before any downstream lookup.
pub const OVERRIDE_MARKER: &str = "@force:";

/// Strip [`OVERRIDE_MARKER`] from a package name, reporting whether it was
/// present.
pub fn strip_override(name: &str) -> (&str, bool) {
    match name.strip_prefix(OVERRIDE_MARKER) {
        Some(rest) => (rest, true),
        None => (name, false),
    }
}

/// Set of package names exempt from all policy checks.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl Allowlist {
    /// Build from entries; an entry ending in `*` matches by prefix
    /// (e.g. `@mycorp/*`), anything else matches exactly.
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();
        for entry in entries {
            match entry.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(entry);
                }
            }
        }
        Self { exact, prefixes }
    }

    /// Whether `name` is exempt from policy checks.
    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}
