//! Resolver configuration: which archives make up each bundle-version partition.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Archives selected for one bundle version: every package whose name starts
/// with `archive_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleVersionRule {
    pub selector: String,
    pub archive_prefix: String,
}

impl BundleVersionRule {
    pub fn new(selector: impl Into<String>, archive_prefix: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            archive_prefix: archive_prefix.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Supported bundle versions. A selector missing here fails population.
    pub bundle_versions: Vec<BundleVersionRule>,
    /// Packages shared by every bundle version.
    pub base_prefix: Option<String>,
    /// Suffix identifying tar.gz packages among the archive names.
    pub package_extension: String,
    /// Curated zip merged after all packages, so its resources win.
    pub override_archive: Option<String>,
    /// Selector in effect before a caller chooses one; also the fallback for
    /// profiles declared without a version.
    pub default_bundle_version: String,
    /// Profile prefix identifying documents whose `meta.profile` decides the bundle version.
    pub profile_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bundle_versions: vec![
                BundleVersionRule::new("1.0.2", "1.0.2/"),
                BundleVersionRule::new("1.1.0", "1.1.0/"),
            ],
            base_prefix: Some("base/".to_string()),
            package_extension: ".tgz".to_string(),
            override_archive: Some("Bundle.zip".to_string()),
            default_bundle_version: "1.1.0".to_string(),
            profile_prefix: "https://fhir.kbv.de/StructureDefinition/KBV_PR_EAU".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn rule(&self, selector: &str) -> Option<&BundleVersionRule> {
        self.bundle_versions.iter().find(|r| r.selector == selector)
    }

    pub fn selectors(&self) -> Vec<String> {
        self.bundle_versions
            .iter()
            .map(|r| r.selector.clone())
            .collect()
    }

    /// Whether `name` is a package archive (as opposed to the curated zip).
    pub fn is_package(&self, name: &str) -> bool {
        let extension = self.package_extension.as_str();
        name.len() >= extension.len()
            && name.is_char_boundary(name.len() - extension.len())
            && name[name.len() - extension.len()..].eq_ignore_ascii_case(extension)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bundle_versions.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one bundle version must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.bundle_versions {
            if rule.selector.is_empty() || rule.archive_prefix.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "bundle version rule '{}' needs a selector and an archive prefix",
                    rule.selector
                )));
            }
            if !seen.insert(rule.selector.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "bundle version '{}' configured twice",
                    rule.selector
                )));
            }
        }

        if self.package_extension.is_empty() {
            return Err(Error::InvalidConfig("package extension cannot be empty".into()));
        }

        if self.rule(&self.default_bundle_version).is_none() {
            return Err(Error::InvalidConfig(format!(
                "default bundle version '{}' has no rule",
                self.default_bundle_version
            )));
        }

        Ok(())
    }
}
