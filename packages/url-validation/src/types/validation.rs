use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::components::{DomainParts, UrlComponents};

/// Stored status code for URLs whose scheme is neither http nor https.
pub const SCHEME_REJECTED_STATUS: i32 = 601;

/// Stored status code for URLs whose request failed at the transport level.
pub const TRANSPORT_FAILED_STATUS: i32 = 600;

/// One intermediate response on the way to the final URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status_code: u16,
}

/// How a validation attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A response was received
    Http {
        status: u16,
        headers: BTreeMap<String, String>,
        /// Intermediate hops in traversal order, final response excluded
        history: Vec<RedirectHop>,
    },
    /// Scheme was not http/https; nothing was fetched
    SchemeRejected,
    /// DNS, TLS, connect, timeout or protocol failure
    TransportFailed { trace: String },
}

impl Outcome {
    /// Status code as stored: the HTTP status, or 601/600.
    pub fn status_code(&self) -> i32 {
        match self {
            Outcome::Http { status, .. } => i32::from(*status),
            Outcome::SchemeRejected => SCHEME_REJECTED_STATUS,
            Outcome::TransportFailed { .. } => TRANSPORT_FAILED_STATUS,
        }
    }

    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Outcome::Http { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Redirect history, or `None` when no redirect happened.
    pub fn history(&self) -> Option<&[RedirectHop]> {
        match self {
            Outcome::Http { history, .. } if !history.is_empty() => Some(history),
            _ => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, Outcome::Http { .. })
    }
}

/// Classified result of validating one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub original_url: String,
    /// URL after all redirects, or the original URL when nothing was fetched
    pub final_url: String,
    pub outcome: Outcome,
    pub components: UrlComponents,
    pub tld: DomainParts,
}

impl ValidationResult {
    /// Build a result, decomposing `final_url`.
    pub fn new(original_url: impl Into<String>, final_url: impl Into<String>, outcome: Outcome) -> Self {
        let final_url = final_url.into();
        Self {
            original_url: original_url.into(),
            components: UrlComponents::parse(&final_url),
            tld: DomainParts::from_url(&final_url),
            final_url,
            outcome,
        }
    }

    pub fn scheme_rejected(url: &str) -> Self {
        Self::new(url, url, Outcome::SchemeRejected)
    }

    pub fn transport_failed(url: &str, trace: impl Into<String>) -> Self {
        Self::new(
            url,
            url,
            Outcome::TransportFailed {
                trace: trace.into(),
            },
        )
    }

    pub fn status_code(&self) -> i32 {
        self.outcome.status_code()
    }

    /// The failure trace when the request could not be completed.
    pub fn transport_failure(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::TransportFailed { trace } => Some(trace),
            _ => None,
        }
    }

    pub fn headers_json(&self) -> Option<Value> {
        self.outcome.headers().map(|headers| {
            Value::Object(
                headers
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect(),
            )
        })
    }

    pub fn history_json(&self) -> Option<Value> {
        self.outcome.history().map(|hops| {
            Value::Array(
                hops.iter()
                    .map(|hop| {
                        serde_json::json!({
                            "url": hop.url,
                            "status_code": hop.status_code,
                        })
                    })
                    .collect(),
            )
        })
    }

    pub fn components_json(&self) -> Value {
        serde_json::to_value(&self.components).unwrap_or(Value::Null)
    }

    pub fn tld_json(&self) -> Value {
        serde_json::to_value(&self.tld).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn synthetic_results_carry_no_response_data() {
        let rejected = ValidationResult::scheme_rejected("ftp://files.example.com/a");
        assert_eq!(rejected.status_code(), 601);
        assert_eq!(rejected.final_url, "ftp://files.example.com/a");
        assert_eq!(rejected.headers_json(), None);
        assert_eq!(rejected.history_json(), None);
        assert_eq!(rejected.components.scheme, "ftp");

        let failed = ValidationResult::transport_failed("http://nowhere.invalid", "dns error");
        assert_eq!(failed.status_code(), 600);
        assert_eq!(failed.transport_failure(), Some("dns error"));
        assert!(failed.outcome.is_synthetic());
        assert_eq!(failed.headers_json(), None);
    }

    #[test]
    fn empty_history_is_none() {
        let result = ValidationResult::new(
            "https://example.com/",
            "https://example.com/",
            Outcome::Http {
                status: 200,
                headers: BTreeMap::new(),
                history: Vec::new(),
            },
        );
        assert_eq!(result.history_json(), None);
        assert_eq!(result.headers_json(), Some(json!({})));
    }

    #[test]
    fn history_json_survives_a_round_trip() {
        let hops = vec![
            RedirectHop {
                url: "http://example.com".to_string(),
                status_code: 301,
            },
            RedirectHop {
                url: "https://example.com".to_string(),
                status_code: 302,
            },
        ];
        let result = ValidationResult::new(
            "http://example.com",
            "https://example.com/",
            Outcome::Http {
                status: 200,
                headers: BTreeMap::new(),
                history: hops.clone(),
            },
        );

        let encoded = serde_json::to_string(&result.history_json().unwrap()).unwrap();
        let decoded: Vec<RedirectHop> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, hops);
        assert_eq!(result.tld.registered_domain, "example.com");
    }
}
