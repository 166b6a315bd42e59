//! CLI settings: optional TOML file, then `FHIRAU__*` environment variables.

use anyhow::Context;
use fhirau_resolver::ResolverConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the bundle-version folders, base packages and curated zip.
    pub packages_dir: PathBuf,
    pub logging: LoggingConfig,
    pub resolver: ResolverConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from("packages"),
            logging: LoggingConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings; a missing file is not an error.
    ///
    /// Environment keys use `__` between levels, e.g.
    /// `FHIRAU__RESOLVER__DEFAULT_BUNDLE_VERSION=1.0.2`.
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("FHIRAU")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", file.display()))?;

        let settings: Self = settings
            .try_deserialize()
            .context("Failed to deserialize settings")?;
        settings
            .resolver
            .validate()
            .context("Invalid resolver settings")?;
        Ok(settings)
    }
}
