//! Testing utilities including mock implementations.
//!
//! These let the consumer loop be exercised without network access or a
//! database. Pair them with [`MemoryQueue`](crate::queues::MemoryQueue) and
//! [`MemoryRecordStore`](crate::stores::MemoryRecordStore).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::RecordStore;
use crate::traits::validator::UrlValidator;
use crate::types::components::scheme_of;
use crate::types::{ErrorRecord, JobContext, Outcome, PersistOutcome, RedirectHop, ValidationResult};

/// A validator that answers from a script instead of the network.
///
/// Unscripted http(s) URLs resolve to themselves with status 200; other
/// schemes are rejected exactly like the real validator.
#[derive(Default)]
pub struct MockValidator {
    responses: RwLock<HashMap<String, ValidationResult>>,
    calls: RwLock<Vec<MockValidatorCall>>,
}

/// Record of a call made to the mock validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockValidatorCall {
    pub url: String,
    pub timeout: Duration,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a full result for `url`.
    pub fn with_result(self, url: impl Into<String>, result: ValidationResult) -> Self {
        self.responses.write().unwrap().insert(url.into(), result);
        self
    }

    /// Script a redirect chain ending at `final_url` with `status`.
    pub fn with_redirects(
        self,
        url: &str,
        hops: &[(&str, u16)],
        final_url: &str,
        status: u16,
    ) -> Self {
        let history = hops
            .iter()
            .map(|(hop_url, hop_status)| RedirectHop {
                url: hop_url.to_string(),
                status_code: *hop_status,
            })
            .collect();
        let outcome = Outcome::Http {
            status,
            headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            history,
        };
        self.with_result(url, ValidationResult::new(url, final_url, outcome))
    }

    /// Script a transport failure for `url`.
    pub fn with_transport_failure(self, url: &str, trace: &str) -> Self {
        self.with_result(url, ValidationResult::transport_failed(url, trace))
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MockValidatorCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl UrlValidator for MockValidator {
    async fn validate(&self, url: &str, timeout: Duration) -> ValidationResult {
        self.calls.write().unwrap().push(MockValidatorCall {
            url: url.to_string(),
            timeout,
        });

        if let Some(result) = self.responses.read().unwrap().get(url) {
            return result.clone();
        }
        match scheme_of(url).as_deref() {
            Some("http") | Some("https") => ValidationResult::new(
                url,
                url,
                Outcome::Http {
                    status: 200,
                    headers: BTreeMap::new(),
                    history: Vec::new(),
                },
            ),
            _ => ValidationResult::scheme_rejected(url),
        }
    }
}

/// Wraps a store and fails `persist` for chosen final URLs.
///
/// Simulates a storage outage in the middle of a batch.
pub struct FaultyStore<S> {
    inner: S,
    failing_urls: RwLock<HashSet<String>>,
    fail_errors: RwLock<bool>,
}

impl<S: RecordStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_urls: RwLock::new(HashSet::new()),
            fail_errors: RwLock::new(false),
        }
    }

    /// Fail every `persist` whose final URL is `url`.
    pub fn fail_persist_for(self, url: impl Into<String>) -> Self {
        self.failing_urls.write().unwrap().insert(url.into());
        self
    }

    /// Fail every `record_error` call.
    pub fn fail_error_records(self) -> Self {
        *self.fail_errors.write().unwrap() = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FaultyStore<S> {
    type Transaction = S::Transaction;

    async fn begin(&self) -> StoreResult<S::Transaction> {
        self.inner.begin().await
    }

    async fn commit(&self, tx: S::Transaction) -> StoreResult<()> {
        self.inner.commit(tx).await
    }

    async fn rollback(&self, tx: S::Transaction) -> StoreResult<()> {
        self.inner.rollback(tx).await
    }

    async fn persist(
        &self,
        tx: &mut S::Transaction,
        context: &JobContext,
        result: &ValidationResult,
    ) -> StoreResult<PersistOutcome> {
        let fails = self.failing_urls.read().unwrap().contains(&result.final_url);
        if fails {
            return Err(StoreError::Unavailable {
                reason: format!("simulated outage while writing {}", result.final_url),
            });
        }
        self.inner.persist(tx, context, result).await
    }

    async fn record_error(&self, tx: &mut S::Transaction, record: &ErrorRecord) -> StoreResult<()> {
        let fails = *self.fail_errors.read().unwrap();
        if fails {
            return Err(StoreError::Unavailable {
                reason: "simulated outage while writing error record".to_string(),
            });
        }
        self.inner.record_error(tx, record).await
    }
}
