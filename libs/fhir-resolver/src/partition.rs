use fhirau_package::ResourceProxy;
use std::collections::HashMap;
use std::sync::Arc;

/// Canonical lookup table for one bundle version.
///
/// Each resource is reachable by its bare `url` and by `url|version`. Later
/// inserts replace earlier ones on either key.
#[derive(Debug, Default)]
pub struct Partition {
    entries: HashMap<String, Arc<ResourceProxy>>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proxy: ResourceProxy) {
        let proxy = Arc::new(proxy);
        self.entries
            .insert(proxy.url().to_string(), Arc::clone(&proxy));
        self.entries.insert(proxy.versioned_key(), proxy);
    }

    /// Merge resources in order; the last one wins on each key.
    pub fn merge(&mut self, resources: impl IntoIterator<Item = ResourceProxy>) {
        for proxy in resources {
            self.insert(proxy);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<ResourceProxy>> {
        self.entries.get(key)
    }

    /// Number of lookup keys (two per distinct resource identity).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
