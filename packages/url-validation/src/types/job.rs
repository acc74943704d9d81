//! Job shapes pulled from the validation queue.
//!
//! A queue message body is either a JSON array of [`UrlJob`]s or a single
//! [`TweetJob`] bundle. Both flow through the same validate/persist pipeline;
//! the [`JobContext`] carried by each job decides where its result lands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConsumerError, Result};

/// Batch-level module tag for URL batches.
pub const URL_CONSUMER_MODULE: &str = "url_validation_consumer";

/// Batch-level module tag for tweet bundles.
pub const TWEET_CONSUMER_MODULE: &str = "tweet_url_consumer";

/// A single project URL to validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlJob {
    pub project_name: String,
    pub url: String,
}

/// A tweet whose embedded URL should be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: String,
    pub created_at: String,
    pub url: String,
}

/// Legacy bundle of tweets collected for one search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetJob {
    pub query_alias: String,
    pub tweets: Vec<Tweet>,
}

/// Which of the two job schemas a batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Url,
    Tweet,
}

impl JobKind {
    /// Module tag written on batch-fatal error records.
    pub fn module_tag(self) -> &'static str {
        match self {
            JobKind::Url => URL_CONSUMER_MODULE,
            JobKind::Tweet => TWEET_CONSUMER_MODULE,
        }
    }

    /// Module tag written on per-job transport failure records.
    pub fn internal_module_tag(self) -> &'static str {
        match self {
            JobKind::Url => "url_validation_consumer-internal",
            JobKind::Tweet => "tweet_url_consumer-internal",
        }
    }
}

/// Where a validated job's result is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobContext {
    /// Goes to the `url` and `url_history` tables
    Project { project_name: String },
    /// Goes to the `tweet_url` table
    Tweet {
        query_alias: String,
        tweet_id: String,
        created_at: DateTime<Utc>,
    },
}

/// A decoded job, ready to be validated.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJob {
    /// The job exactly as it appeared in the message body
    pub payload: Value,
    pub url: String,
    pub context: JobContext,
}

/// A decoded queue message body.
///
/// Individual jobs stay as raw JSON until [`JobBatch::job`] is called, so a
/// malformed job only fails once every job before it has been processed.
#[derive(Debug, Clone, PartialEq)]
pub enum JobBatch {
    Urls(Vec<Value>),
    Tweets {
        query_alias: String,
        tweets: Vec<Value>,
    },
}

impl JobBatch {
    /// Decode a message body into one of the two batch shapes.
    pub fn decode(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ConsumerError::malformed(format!("body is not valid JSON: {e}")))?;

        match value {
            Value::Array(jobs) => Ok(Self::Urls(jobs)),
            Value::Object(mut bundle) => {
                let query_alias = match bundle.remove("query_alias") {
                    Some(Value::String(alias)) => alias,
                    _ => return Err(ConsumerError::malformed("tweet bundle has no query_alias")),
                };
                let tweets = match bundle.remove("tweets") {
                    Some(Value::Array(tweets)) => tweets,
                    _ => return Err(ConsumerError::malformed("tweet bundle has no tweets array")),
                };
                Ok(Self::Tweets {
                    query_alias,
                    tweets,
                })
            }
            other => Err(ConsumerError::malformed(format!(
                "expected a JSON array or object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobBatch::Urls(_) => JobKind::Url,
            JobBatch::Tweets { .. } => JobKind::Tweet,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JobBatch::Urls(jobs) => jobs.len(),
            JobBatch::Tweets { tweets, .. } => tweets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the job at `index`.
    pub fn job(&self, index: usize) -> Result<PendingJob> {
        match self {
            JobBatch::Urls(jobs) => {
                let payload = jobs
                    .get(index)
                    .ok_or_else(|| ConsumerError::malformed(format!("no job at index {index}")))?;
                let job: UrlJob = serde_json::from_value(payload.clone()).map_err(|e| {
                    ConsumerError::malformed(format!("job {index} is not a URL job: {e}"))
                })?;
                Ok(PendingJob {
                    payload: payload.clone(),
                    url: job.url,
                    context: JobContext::Project {
                        project_name: job.project_name,
                    },
                })
            }
            JobBatch::Tweets {
                query_alias,
                tweets,
            } => {
                let payload = tweets
                    .get(index)
                    .ok_or_else(|| ConsumerError::malformed(format!("no tweet at index {index}")))?;
                let tweet: Tweet = serde_json::from_value(payload.clone()).map_err(|e| {
                    ConsumerError::malformed(format!("tweet {index} is not a tweet: {e}"))
                })?;
                let created_at = parse_created_at(&tweet.created_at).ok_or_else(|| {
                    ConsumerError::malformed(format!(
                        "tweet {} has unparseable created_at {:?}",
                        tweet.tweet_id, tweet.created_at
                    ))
                })?;
                Ok(PendingJob {
                    payload: payload.clone(),
                    url: tweet.url,
                    context: JobContext::Tweet {
                        query_alias: query_alias.clone(),
                        tweet_id: tweet.tweet_id,
                        created_at,
                    },
                })
            }
        }
    }
}

/// Parse a tweet timestamp.
///
/// Accepts the Twitter API form (`Wed Oct 10 20:19:24 +0000 2018`),
/// RFC 2822 and RFC 3339.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn decodes_url_batch_lazily() {
        let body = r#"[{"project_name":"acme","url":"http://example.com"},{"url":42}]"#;
        let batch = JobBatch::decode(body).unwrap();

        assert_eq!(batch.kind(), JobKind::Url);
        assert_eq!(batch.len(), 2);

        let first = batch.job(0).unwrap();
        assert_eq!(first.url, "http://example.com");
        assert_eq!(
            first.context,
            JobContext::Project {
                project_name: "acme".to_string()
            }
        );
        assert_eq!(
            first.payload,
            json!({"project_name": "acme", "url": "http://example.com"})
        );

        assert!(matches!(
            batch.job(1),
            Err(ConsumerError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn decodes_tweet_bundle() {
        let body = r#"{
            "query_alias": "floods",
            "tweets": [
                {"tweet_id": "1", "created_at": "Wed Oct 10 20:19:24 +0000 2018", "url": "https://t.co/x"}
            ]
        }"#;
        let batch = JobBatch::decode(body).unwrap();

        assert_eq!(batch.kind(), JobKind::Tweet);
        let job = batch.job(0).unwrap();
        assert_eq!(job.url, "https://t.co/x");
        assert_eq!(
            job.context,
            JobContext::Tweet {
                query_alias: "floods".to_string(),
                tweet_id: "1".to_string(),
                created_at: Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap(),
            }
        );
    }

    #[test]
    fn rejects_bodies_of_the_wrong_shape() {
        assert!(JobBatch::decode("not json").is_err());
        assert!(JobBatch::decode("42").is_err());
        assert!(JobBatch::decode(r#"{"tweets": []}"#).is_err());
        assert!(JobBatch::decode(r#"{"query_alias": "q"}"#).is_err());
    }

    #[test]
    fn tweet_with_bad_timestamp_is_malformed() {
        let body = r#"{"query_alias":"q","tweets":[{"tweet_id":"9","created_at":"yesterday","url":"http://a.b"}]}"#;
        let batch = JobBatch::decode(body).unwrap();
        assert!(batch.job(0).is_err());
    }

    #[test]
    fn parses_rfc2822_and_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            parse_created_at("Thu, 02 Jan 2020 03:04:05 +0000"),
            Some(expected)
        );
        assert_eq!(parse_created_at("2020-01-02T03:04:05Z"), Some(expected));
    }

    #[test]
    fn module_tags() {
        assert_eq!(JobKind::Url.module_tag(), "url_validation_consumer");
        assert_eq!(
            JobKind::Url.internal_module_tag(),
            "url_validation_consumer-internal"
        );
        assert_eq!(JobKind::Tweet.module_tag(), "tweet_url_consumer");
    }
}
