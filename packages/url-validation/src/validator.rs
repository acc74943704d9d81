//! HTTP-based URL validator.
//!
//! Issues `HEAD` requests and follows redirects by hand so that every
//! intermediate hop can be recorded in the result's history.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::error_trace;
use crate::traits::validator::UrlValidator;
use crate::types::components::scheme_of;
use crate::types::{Outcome, RedirectHop, ValidationResult};

/// Desktop browser User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0";

/// Redirect hops followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 30;

/// Failures that turn into a synthetic 600 result.
#[derive(Debug, Error)]
enum ValidationError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("exceeded {max} redirects")]
    TooManyRedirects { max: usize },
}

/// Settings for [`HttpValidator`].
#[derive(Debug, Clone)]
pub struct HttpValidatorConfig {
    pub user_agent: String,
    /// Skip TLS certificate verification; arbitrary third-party URLs are checked
    pub accept_invalid_certs: bool,
    pub max_redirects: usize,
}

impl Default for HttpValidatorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl HttpValidatorConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

/// Validates URLs over HTTP with `HEAD` requests.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use url_validation::{HttpValidator, UrlValidator};
///
/// let validator = HttpValidator::new()?;
/// let result = validator.validate("http://example.com", Duration::from_secs(15)).await;
/// println!("{} -> {} ({})", result.original_url, result.final_url, result.status_code());
/// ```
pub struct HttpValidator {
    client: reqwest::Client,
    max_redirects: usize,
}

impl HttpValidator {
    /// Create a validator with default settings.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpValidatorConfig::default())
    }

    pub fn with_config(config: HttpValidatorConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    /// Follow `url` to its final response.
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<(String, Outcome), ValidationError> {
        let url = url.trim();
        let mut current = Url::parse(url).map_err(|source| ValidationError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        // The first hop is reported exactly as requested
        let mut requested = url.to_string();
        let mut history = Vec::new();

        loop {
            let response = self
                .client
                .head(current.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|source| ValidationError::Request {
                    url: current.to_string(),
                    source,
                })?;

            let status = response.status();
            let next = is_followed_redirect(status)
                .then(|| redirect_target(&current, response.headers()))
                .flatten();

            match next {
                Some(next) => {
                    if history.len() >= self.max_redirects {
                        return Err(ValidationError::TooManyRedirects {
                            max: self.max_redirects,
                        });
                    }
                    debug!(from = %requested, to = %next, status = status.as_u16(), "Following redirect");
                    history.push(RedirectHop {
                        url: requested,
                        status_code: status.as_u16(),
                    });
                    requested = next.to_string();
                    current = next;
                }
                None => {
                    let outcome = Outcome::Http {
                        status: status.as_u16(),
                        headers: collect_headers(response.headers()),
                        history,
                    };
                    return Ok((current.to_string(), outcome));
                }
            }
        }
    }
}

#[async_trait]
impl UrlValidator for HttpValidator {
    async fn validate(&self, url: &str, timeout: Duration) -> ValidationResult {
        if !matches!(scheme_of(url).as_deref(), Some("http") | Some("https")) {
            debug!(url = %url, "Scheme is not http or https, skipping request");
            return ValidationResult::scheme_rejected(url);
        }

        match self.resolve(url, timeout).await {
            Ok((final_url, outcome)) => {
                info!(url = %url, final_url = %final_url, status = outcome.status_code(), "Validated URL");
                ValidationResult::new(url, final_url, outcome)
            }
            Err(error) => {
                warn!(url = %url, error = %error, "URL validation failed");
                ValidationResult::transport_failed(url, error_trace(&error))
            }
        }
    }
}

// 300, 304 and 305 are final responses.
fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    current.join(location.trim()).ok()
}

// Repeated headers are folded into one comma-separated value.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}
