//! In-memory record store for testing and development.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::traits::store::RecordStore;
use crate::types::{
    ErrorRecord, JobContext, PersistOutcome, TweetUrlRow, UrlHistoryRow, UrlRow, ValidationResult,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    urls: Vec<UrlRow>,
    history: Vec<UrlHistoryRow>,
    tweets: Vec<TweetUrlRow>,
    errors: Vec<ErrorRecord>,
}

impl Tables {
    fn has_url(&self, url: &str) -> bool {
        self.urls.iter().any(|row| row.url == url)
    }

    fn has_tweet(&self, row: &TweetUrlRow) -> bool {
        self.tweets.iter().any(|existing| existing.key() == row.key())
    }
}

/// Writes staged by an open [`MemoryRecordStore`] transaction.
#[derive(Debug, Default)]
pub struct MemoryTransaction {
    staged: Tables,
}

/// In-memory store mirroring the Postgres tables.
///
/// Writes are staged per transaction and only become visible on commit, so
/// rollback behaviour can be asserted without a database.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
    commits: RwLock<usize>,
    rollbacks: RwLock<usize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of the `url` table.
    pub fn url_rows(&self) -> Vec<UrlRow> {
        self.tables.read().unwrap().urls.clone()
    }

    /// Committed rows of the `url_history` table.
    pub fn history_rows(&self) -> Vec<UrlHistoryRow> {
        self.tables.read().unwrap().history.clone()
    }

    /// Committed rows of the `tweet_url` table.
    pub fn tweet_rows(&self) -> Vec<TweetUrlRow> {
        self.tables.read().unwrap().tweets.clone()
    }

    /// Committed error records.
    pub fn error_records(&self) -> Vec<ErrorRecord> {
        self.tables.read().unwrap().errors.clone()
    }

    pub fn commit_count(&self) -> usize {
        *self.commits.read().unwrap()
    }

    pub fn rollback_count(&self) -> usize {
        *self.rollbacks.read().unwrap()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> StoreResult<MemoryTransaction> {
        Ok(MemoryTransaction::default())
    }

    async fn commit(&self, tx: MemoryTransaction) -> StoreResult<()> {
        let mut tables = self.tables.write().unwrap();
        for row in tx.staged.urls {
            if !tables.has_url(&row.url) {
                tables.urls.push(row);
            }
        }
        for row in tx.staged.tweets {
            if !tables.has_tweet(&row) {
                tables.tweets.push(row);
            }
        }
        tables.history.extend(tx.staged.history);
        tables.errors.extend(tx.staged.errors);
        *self.commits.write().unwrap() += 1;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTransaction) -> StoreResult<()> {
        drop(tx);
        *self.rollbacks.write().unwrap() += 1;
        Ok(())
    }

    async fn persist(
        &self,
        tx: &mut MemoryTransaction,
        context: &JobContext,
        result: &ValidationResult,
    ) -> StoreResult<PersistOutcome> {
        let tables = self.tables.read().unwrap();
        let inserted = match context {
            JobContext::Project { project_name } => {
                let row = UrlRow::from_result(project_name, result);
                let inserted = !tables.has_url(&row.url) && !tx.staged.has_url(&row.url);
                if inserted {
                    tx.staged.urls.push(row);
                }
                tx.staged
                    .history
                    .push(UrlHistoryRow::from_result(project_name, result));
                inserted
            }
            JobContext::Tweet {
                query_alias,
                tweet_id,
                created_at,
            } => {
                let row = TweetUrlRow::from_result(query_alias, tweet_id, *created_at, result);
                let inserted = !tables.has_tweet(&row) && !tx.staged.has_tweet(&row);
                if inserted {
                    tx.staged.tweets.push(row);
                }
                inserted
            }
        };
        Ok(PersistOutcome { inserted })
    }

    async fn record_error(
        &self,
        tx: &mut MemoryTransaction,
        record: &ErrorRecord,
    ) -> StoreResult<()> {
        tx.staged.errors.push(record.clone());
        Ok(())
    }
}
