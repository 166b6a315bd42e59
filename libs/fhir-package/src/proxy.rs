use fhirau_format::{ResourceFormat, ResourceParser};
use serde_json::Value;
use std::sync::Arc;

/// A parsed conformance resource together with its canonical identity.
///
/// Only resources with a non-blank `url` can be wrapped; the resource itself
/// is immutable and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ResourceProxy {
    url: String,
    version: String,
    resource: Arc<Value>,
}

impl ResourceProxy {
    /// Parse one archive entry into a proxy.
    ///
    /// Returns `None` when the extension is neither `.json` nor `.xml`, when the
    /// parser rejects the bytes, or when the resource has no canonical `url`.
    pub fn create(entry_name: &str, bytes: &[u8], parser: &dyn ResourceParser) -> Option<Self> {
        let format = ResourceFormat::from_path(entry_name)?;

        let resource = match parser.parse(format, bytes) {
            Ok(resource) => resource,
            Err(e) => {
                tracing::trace!(entry = entry_name, error = %e, "Dropping unparsable entry");
                return None;
            }
        };

        let proxy = Self::from_resource(resource);
        if proxy.is_none() {
            tracing::trace!(entry = entry_name, "Dropping entry without canonical url");
        }
        proxy
    }

    /// Wrap an already parsed resource, extracting `url` and `version`.
    pub fn from_resource(resource: Value) -> Option<Self> {
        let url = named_child(&resource, "url").filter(|url| !url.trim().is_empty())?;
        let version = named_child(&resource, "version").unwrap_or_default();

        Some(Self {
            url,
            version,
            resource: Arc::new(resource),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Business version, empty when the resource declares none.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resource(&self) -> &Arc<Value> {
        &self.resource
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource.get("resourceType").and_then(Value::as_str)
    }

    /// The `url|version` key this resource is indexed under besides its bare url.
    pub fn versioned_key(&self) -> String {
        format!("{}|{}", self.url, self.version)
    }
}

fn named_child(resource: &Value, name: &str) -> Option<String> {
    match resource.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
