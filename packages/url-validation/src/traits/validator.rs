use std::time::Duration;

use async_trait::async_trait;

use crate::types::ValidationResult;

/// Resolves a URL and classifies the outcome.
///
/// Implementations never fail: scheme rejection and transport failures are
/// encoded in the returned [`ValidationResult`].
#[async_trait]
pub trait UrlValidator: Send + Sync {
    /// Validate `url`, giving up on any single request after `timeout`.
    async fn validate(&self, url: &str, timeout: Duration) -> ValidationResult;
}
