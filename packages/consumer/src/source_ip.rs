//! Discovers the public address stamped on error records.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve the host's public IP once at startup.
///
/// An explicit override wins; otherwise the lookup service is asked and its
/// body, trimmed, is used.
pub async fn resolve(override_ip: Option<&str>, lookup_url: &str) -> Result<String> {
    if let Some(ip) = override_ip {
        return Ok(ip.trim().to_string());
    }

    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
        .context("Failed to build IP lookup client")?;

    let body = client
        .get(lookup_url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("IP lookup request to {lookup_url} failed"))?
        .text()
        .await
        .context("Failed to read IP lookup response")?;

    let ip = body.trim();
    if ip.is_empty() {
        bail!("IP lookup service at {lookup_url} returned an empty body");
    }

    info!(ip, "Resolved public IP");
    Ok(ip.to_string())
}
