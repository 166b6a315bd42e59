use crate::config::{BundleVersionRule, ResolverConfig};
use crate::error::{Error, Result};
use crate::partition::Partition;
use crate::profile::BundleVersionDetector;
use crate::source::ArchiveSource;
use crate::traits::{AsyncResourceResolver, ResourceResolver};
use async_trait::async_trait;
use fhirau_format::{FhirParser, ResourceParser};
use fhirau_package::{load_curated_archive, FhirPackage, PackageError};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Canonical resource index partitioned by bundle version.
///
/// A partition is built from the archives of its bundle version the first time
/// that version is resolved against, then kept unchanged for the life of the
/// resolver. Population of partitions is serialized; lookups against an
/// already built partition never wait for it.
pub struct LocalResourceResolver {
    config: ResolverConfig,
    source: Arc<dyn ArchiveSource>,
    parser: Arc<dyn ResourceParser>,
    detector: BundleVersionDetector,
    partitions: RwLock<HashMap<String, Arc<Partition>>>,
    population: Mutex<()>,
    bundle_version: RwLock<String>,
}

impl LocalResourceResolver {
    pub fn new(config: ResolverConfig, source: impl ArchiveSource + 'static) -> Self {
        Self::with_parser(config, Arc::new(source), Arc::new(FhirParser))
    }

    pub fn with_parser(
        config: ResolverConfig,
        source: Arc<dyn ArchiveSource>,
        parser: Arc<dyn ResourceParser>,
    ) -> Self {
        let detector = BundleVersionDetector::from_config(&config);
        let bundle_version = RwLock::new(config.default_bundle_version.clone());
        Self {
            config,
            source,
            parser,
            detector,
            partitions: RwLock::new(HashMap::new()),
            population: Mutex::new(()),
            bundle_version,
        }
    }

    /// Bundle version used by subsequent lookups.
    pub fn bundle_version(&self) -> String {
        self.bundle_version
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Select the bundle version for subsequent lookups.
    ///
    /// Unknown versions are accepted here and reported by the next lookup.
    pub fn set_bundle_version(&self, selector: impl Into<String>) {
        let selector = selector.into();
        tracing::debug!(bundle_version = %selector, "Selecting bundle version");
        *self
            .bundle_version
            .write()
            .unwrap_or_else(PoisonError::into_inner) = selector;
    }

    /// Detect the bundle version from the profile `document` declares and
    /// select it. Returns `None`, leaving the selection unchanged, for
    /// documents without a supported profile.
    pub fn select_for_document(&self, document: &Value) -> Option<String> {
        let selector = self.detector.detect(document)?;
        self.set_bundle_version(selector.clone());
        Some(selector)
    }

    /// Resolve `identifier` (`url` or `url|version`) in the current bundle version.
    pub fn resolve(&self, identifier: &str) -> Result<Option<Arc<Value>>> {
        let partition = self.partition(&self.bundle_version())?;
        Ok(partition
            .get(identifier)
            .map(|proxy| Arc::clone(proxy.resource())))
    }

    /// Build the partition for `selector` now instead of on first lookup.
    pub fn preload(&self, selector: &str) -> Result<()> {
        self.partition(selector).map(|_| ())
    }

    /// Bundle versions whose partitions have been built, sorted.
    pub fn loaded_bundle_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        versions.sort();
        versions
    }

    /// Number of lookup keys in a built partition.
    pub fn partition_len(&self, selector: &str) -> Option<usize> {
        self.installed(selector).map(|partition| partition.len())
    }

    fn installed(&self, selector: &str) -> Option<Arc<Partition>> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(selector)
            .cloned()
    }

    fn partition(&self, selector: &str) -> Result<Arc<Partition>> {
        if let Some(partition) = self.installed(selector) {
            return Ok(partition);
        }

        let _population = self
            .population
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished while we waited for the lock.
        if let Some(partition) = self.installed(selector) {
            return Ok(partition);
        }

        let partition = Arc::new(self.populate(selector)?);
        self.partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(selector.to_string(), Arc::clone(&partition));
        Ok(partition)
    }

    fn populate(&self, selector: &str) -> Result<Partition> {
        let rule = self
            .config
            .rule(selector)
            .ok_or_else(|| Error::UnknownBundleVersion {
                selector: selector.to_string(),
                supported: self.config.selectors(),
            })?;

        let started = Instant::now();
        let archives = self.package_archives(rule)?;
        if !archives
            .iter()
            .any(|name| name.starts_with(&rule.archive_prefix))
        {
            tracing::error!(
                bundle_version = selector,
                archive_prefix = %rule.archive_prefix,
                "No package archives for bundle version"
            );
            return Err(Error::NoPackages {
                selector: selector.to_string(),
                archive_prefix: rule.archive_prefix.clone(),
            });
        }

        let mut partition = Partition::new();
        for name in &archives {
            let reader = self.open(name)?;
            let package = FhirPackage::from_tar_gz(reader, self.parser.as_ref())
                .map_err(|source| package_error(name, source))?;

            tracing::debug!(
                archive = %name,
                package = %package.descriptor.package_id(),
                fhir_versions = ?package.descriptor.fhir_versions,
                dependencies = ?package.descriptor.dependencies,
                resources = package.resources.len(),
                "Merging package"
            );
            partition.merge(package.into_resources());
        }

        // Curated corrections for defects in the published packages; merged
        // last so they replace whatever the packages provide.
        if let Some(name) = &self.config.override_archive {
            let reader = self.open(name)?;
            let resources = load_curated_archive(reader, self.parser.as_ref())
                .map_err(|source| package_error(name, source))?;
            tracing::debug!(archive = %name, resources = resources.len(), "Merging curated archive");
            partition.merge(resources);
        }

        tracing::info!(
            bundle_version = selector,
            archives = archives.len(),
            keys = partition.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bundle version partition ready"
        );
        Ok(partition)
    }

    /// Package archives for `rule` plus the shared base set, in name order.
    fn package_archives(&self, rule: &BundleVersionRule) -> Result<Vec<String>> {
        let base_prefix = self.config.base_prefix.as_deref();
        let mut names: Vec<String> = self
            .source
            .names()?
            .into_iter()
            .filter(|name| self.config.is_package(name))
            .filter(|name| {
                name.starts_with(&rule.archive_prefix)
                    || base_prefix.is_some_and(|prefix| name.starts_with(prefix))
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send + '_>> {
        self.source
            .open(name)?
            .ok_or_else(|| Error::MissingArchive(name.to_string()))
    }
}

fn package_error(archive: &str, source: PackageError) -> Error {
    Error::Package {
        archive: archive.to_string(),
        source,
    }
}

impl ResourceResolver for LocalResourceResolver {
    fn resolve_by_uri(&self, uri: &str) -> Result<Option<Arc<Value>>> {
        self.resolve(uri)
    }

    fn resolve_by_canonical_uri(&self, uri: &str) -> Result<Option<Arc<Value>>> {
        self.resolve(uri)
    }
}

#[async_trait]
impl AsyncResourceResolver for LocalResourceResolver {
    async fn resolve_by_uri_async(&self, uri: &str) -> Result<Option<Arc<Value>>> {
        self.resolve(uri)
    }

    async fn resolve_by_canonical_uri_async(&self, uri: &str) -> Result<Option<Arc<Value>>> {
        self.resolve(uri)
    }
}

impl std::fmt::Debug for LocalResourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalResourceResolver")
            .field("bundle_version", &self.bundle_version())
            .field("loaded", &self.loaded_bundle_versions())
            .finish_non_exhaustive()
    }
}
