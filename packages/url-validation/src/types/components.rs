//! Structural decomposition of URLs.
//!
//! Both breakdowns are computed lexically and never fail: they are stored for
//! every job, including ones whose URL could not be fetched or even parsed.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Generic URL components (`scheme://netloc/path;params?query#fragment`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlComponents {
    pub scheme: String,
    pub netloc: String,
    pub host: String,
    pub path: String,
    pub params: String,
    pub query: String,
    pub fragment: String,
}

impl UrlComponents {
    pub fn parse(raw: &str) -> Self {
        let (scheme, rest) = match split_scheme(raw) {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => (String::new(), raw),
        };

        let (netloc, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?', '#']).unwrap_or(after.len());
                (after[..end].to_string(), &after[end..])
            }
            None => (String::new(), rest),
        };

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (path, params) = split_params(path);

        Self {
            host: host_of(&netloc),
            scheme,
            netloc,
            path: path.to_string(),
            params: params.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        }
    }
}

/// Lower-cased scheme of `raw`, if it has a syntactically valid one.
pub fn scheme_of(raw: &str) -> Option<String> {
    split_scheme(raw.trim()).map(|(scheme, _)| scheme.to_ascii_lowercase())
}

fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, rest))
}

// `;params` only apply to the last path segment.
fn split_params(path: &str) -> (&str, &str) {
    let last_segment = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[last_segment..].find(';') {
        Some(offset) => {
            let at = last_segment + offset;
            (&path[..at], &path[at + 1..])
        }
        None => (path, ""),
    }
}

fn host_of(netloc: &str) -> String {
    let host_port = netloc.rsplit_once('@').map(|(_, h)| h).unwrap_or(netloc);
    let host = match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or(""),
        None => host_port.split(':').next().unwrap_or(""),
    };
    host.to_lowercase()
}

/// Public-suffix breakdown of a host name.
///
/// `forums.news.cnn.com` → subdomain `forums.news`, domain `cnn`,
/// suffix `com`, registered domain `cnn.com`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainParts {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
    pub registered_domain: String,
}

impl DomainParts {
    pub fn from_url(raw: &str) -> Self {
        Self::from_host(&UrlComponents::parse(raw).host)
    }

    pub fn from_host(host: &str) -> Self {
        let host = host.trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return Self::default();
        }
        if host.parse::<IpAddr>().is_ok() {
            return Self {
                domain: host,
                ..Self::default()
            };
        }

        match icann_suffix_len(&host) {
            // Unlisted suffix: the last label is the domain
            None => {
                let (subdomain, domain) = host.rsplit_once('.').unwrap_or(("", &host));
                Self {
                    subdomain: subdomain.to_string(),
                    domain: domain.to_string(),
                    ..Self::default()
                }
            }
            Some(len) if len >= host.len() => Self {
                suffix: host,
                ..Self::default()
            },
            Some(len) => {
                let suffix = &host[host.len() - len..];
                let head = host[..host.len() - len].trim_end_matches('.');
                let (subdomain, domain) = head.rsplit_once('.').unwrap_or(("", head));
                Self {
                    subdomain: subdomain.to_string(),
                    domain: domain.to_string(),
                    suffix: suffix.to_string(),
                    registered_domain: format!("{domain}.{suffix}"),
                }
            }
        }
    }
}

// Private-section matches (github.io, blogspot.com) are not suffixes here;
// the lookup is repeated on the private entry minus its leftmost label.
fn icann_suffix_len(host: &str) -> Option<usize> {
    let mut candidate = host;
    loop {
        let suffix = psl::suffix(candidate.as_bytes()).filter(|suffix| suffix.is_known())?;
        let len = suffix.as_bytes().len();
        if suffix.typ() == Some(psl::Type::Icann) {
            return Some(len);
        }
        let (_, rest) = candidate[candidate.len() - len..].split_once('.')?;
        candidate = rest;
    }
}
