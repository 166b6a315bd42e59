//! Bundle-version detection from the profile a document declares.

use crate::config::ResolverConfig;
use serde_json::Value;

/// Picks the bundle version from `meta.profile`.
///
/// The first profile starting with the prefix decides: `prefix|1.0.2` selects
/// `1.0.2`, an unversioned profile selects the fallback. Documents without a
/// matching profile are not supported and yield `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleVersionDetector {
    profile_prefix: String,
    fallback: String,
}

impl BundleVersionDetector {
    pub fn new(profile_prefix: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            profile_prefix: profile_prefix.into(),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(&config.profile_prefix, &config.default_bundle_version)
    }

    pub fn detect(&self, document: &Value) -> Option<String> {
        let profile = declared_profiles(document)
            .find(|profile| profile.starts_with(&self.profile_prefix))?;

        let parts: Vec<&str> = profile.split('|').collect();
        match parts.as_slice() {
            [_, version] => Some((*version).to_string()),
            _ => Some(self.fallback.clone()),
        }
    }
}

fn declared_profiles(document: &Value) -> impl Iterator<Item = &str> {
    let profiles = document.get("meta").and_then(|meta| meta.get("profile"));
    let items: Vec<&Value> = match profiles {
        Some(Value::Array(items)) => items.iter().collect(),
        // XML documents with a single profile map to a scalar
        Some(single) => vec![single],
        None => Vec::new(),
    };
    items.into_iter().filter_map(Value::as_str)
}
