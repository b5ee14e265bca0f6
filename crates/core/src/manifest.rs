//! Resource manifest: the per-deployment list of cacheable resources.
//!
//! A manifest maps resource identifiers (paths relative to the origin, or `/`
//! for the origin root) to opaque content fingerprints. Fingerprints are
//! produced by the build pipeline and only recorded, never interpreted.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::hash::compute_manifest_digest;

/// Immutable mapping of resource identifier to content fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct ResourceManifest {
    entries: BTreeMap<String, String>,
}

impl ResourceManifest {
    /// Build a manifest from identifier/fingerprint pairs.
    ///
    /// Later duplicates replace earlier ones. The result is not validated.
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Parse and validate a manifest from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let manifest: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidManifest(format!("malformed manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidManifest(format!("cannot read {}: {e}", path.display())))?;
        let manifest = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), resources = manifest.len(), "loaded resource manifest");
        Ok(manifest)
    }

    /// Check that the manifest can drive an activation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` if the manifest is empty or an
    /// identifier is blank, contains whitespace, or carries a fragment.
    pub fn validate(&self) -> Result<(), Error> {
        if self.entries.is_empty() {
            return Err(Error::InvalidManifest("manifest has no resources".into()));
        }

        for resource in self.entries.keys() {
            if resource.is_empty() {
                return Err(Error::InvalidManifest("empty resource identifier".into()));
            }
            if resource.chars().any(char::is_whitespace) {
                return Err(Error::InvalidManifest(format!("identifier contains whitespace: {resource:?}")));
            }
            if resource.contains('#') {
                return Err(Error::InvalidManifest(format!("identifier contains a fragment: {resource:?}")));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains_key(resource)
    }

    /// Fingerprint recorded for `resource`, if it is listed.
    pub fn fingerprint(&self, resource: &str) -> Option<&str> {
        self.entries.get(resource).map(String::as_str)
    }

    /// Resource identifiers in sorted order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// SHA-256 digest of the whole manifest, hex-encoded.
    pub fn digest(&self) -> String {
        compute_manifest_digest(self.iter())
    }
}
