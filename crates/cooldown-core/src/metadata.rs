//! Registry package metadata document model.
//!
//! The registry's public view of a package: the version map, the publish-time
//! map, and the dist-tags. Version descriptor blobs are carried as opaque
//! JSON; only key existence matters to the policy engine. Every field the
//! model does not name (description, maintainers, readme, ...) is preserved
//! byte-for-byte through filtering via the flattened `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved keys in the `time` map that are not version timestamps.
pub const TIME_CREATED: &str = "created";

/// See [`TIME_CREATED`].
pub const TIME_MODIFIED: &str = "modified";

/// A package metadata document as served by an npm-compatible registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name, possibly scoped (`@scope/name`).
    #[serde(default)]
    pub name: String,

    /// Version string → opaque version descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeMap<String, Value>>,

    /// Version string (plus `created`/`modified`) → ISO-8601 publish time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<BTreeMap<String, String>>,

    /// Tag name (`latest`, ...) → version string.
    #[serde(
        rename = "dist-tags",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dist_tags: Option<BTreeMap<String, String>>,

    /// Everything else in the document, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PackageMetadata {
    /// Minimal document synthesized for a package the policy refuses to
    /// expose: no installable versions, no tags, identity preserved.
    pub fn empty_for(name: &str) -> Self {
        Self {
            name: name.to_string(),
            versions: Some(BTreeMap::new()),
            time: None,
            dist_tags: Some(BTreeMap::new()),
            extra: serde_json::Map::new(),
        }
    }

    /// Reduce this document to its minimal form: `versions` and `dist-tags`
    /// emptied, `time` stripped to `created`/`modified`, identity fields kept.
    pub fn emptied(mut self) -> Self {
        self.versions = Some(BTreeMap::new());
        self.dist_tags = Some(BTreeMap::new());
        self.time = self.time.map(|time| {
            time.into_iter()
                .filter(|(key, _)| key == TIME_CREATED || key == TIME_MODIFIED)
                .collect()
        });
        self
    }

    /// True when the document exposes no installable version.
    pub fn is_empty(&self) -> bool {
        self.versions.as_ref().is_none_or(BTreeMap::is_empty)
    }
}
