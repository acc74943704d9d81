use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::ValidationResult;

/// Append-only record of a failure, stored in the `error` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The job or batch being processed, verbatim
    pub current_record: Value,
    pub error: String,
    pub module: String,
    /// Public address of the consumer host
    pub ip: String,
}

impl ErrorRecord {
    pub fn new(
        current_record: Value,
        error: impl Into<String>,
        module: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            current_record,
            error: error.into(),
            module: module.into(),
            ip: ip.into(),
        }
    }
}

/// Result of [`RecordStore::persist`](crate::traits::store::RecordStore::persist).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    /// False when the destination row already existed and the insert was skipped
    pub inserted: bool,
}

/// A row of the `url` table.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlRow {
    pub url: String,
    pub status_code: i32,
    pub project_name: String,
    pub headers: Option<Value>,
    pub components: Value,
    pub tld: Value,
}

impl UrlRow {
    pub fn from_result(project_name: &str, result: &ValidationResult) -> Self {
        Self {
            url: result.final_url.clone(),
            status_code: result.status_code(),
            project_name: project_name.to_string(),
            headers: result.headers_json(),
            components: result.components_json(),
            tld: result.tld_json(),
        }
    }
}

/// A row of the `url_history` table.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlHistoryRow {
    pub url: String,
    pub project_name: String,
    pub history: Option<Value>,
}

impl UrlHistoryRow {
    pub fn from_result(project_name: &str, result: &ValidationResult) -> Self {
        Self {
            url: result.final_url.clone(),
            project_name: project_name.to_string(),
            history: result.history_json(),
        }
    }
}

/// A row of the `tweet_url` table.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetUrlRow {
    pub query_alias: String,
    pub tweet_id: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub expanded_url: String,
    pub error: Option<String>,
    pub status_code: Option<i32>,
}

impl TweetUrlRow {
    pub fn from_result(
        query_alias: &str,
        tweet_id: &str,
        created_at: DateTime<Utc>,
        result: &ValidationResult,
    ) -> Self {
        Self {
            query_alias: query_alias.to_string(),
            tweet_id: tweet_id.to_string(),
            created_at,
            url: result.original_url.clone(),
            expanded_url: result.final_url.clone(),
            error: result.transport_failure().map(str::to_string),
            status_code: Some(result.status_code()),
        }
    }

    /// Natural key used for duplicate detection.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.query_alias, &self.tweet_id, &self.url)
    }
}
