//! Resolution contracts consumed by the validation layer.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Synchronous canonical resolution.
///
/// A missing resource is `Ok(None)`; errors are reserved for a broken deployment.
pub trait ResourceResolver: Send + Sync {
    fn resolve_by_uri(&self, uri: &str) -> Result<Option<Arc<Value>>>;

    fn resolve_by_canonical_uri(&self, uri: &str) -> Result<Option<Arc<Value>>>;
}

/// Asynchronous flavour of [`ResourceResolver`] for non-blocking callers.
#[async_trait]
pub trait AsyncResourceResolver: Send + Sync {
    async fn resolve_by_uri_async(&self, uri: &str) -> Result<Option<Arc<Value>>>;

    async fn resolve_by_canonical_uri_async(&self, uri: &str) -> Result<Option<Arc<Value>>>;
}
