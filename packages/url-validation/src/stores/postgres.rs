//! PostgreSQL record store.
//!
//! Tables:
//! - `url`: one row per final URL, first writer wins
//! - `url_history`: one row per validation attempt
//! - `tweet_url`: expanded tweet links, one row per (query, tweet, url)
//! - `error`: append-only failure log

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::traits::store::RecordStore;
use crate::types::{
    ErrorRecord, JobContext, PersistOutcome, TweetUrlRow, UrlHistoryRow, UrlRow, ValidationResult,
};

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS url (
        url TEXT PRIMARY KEY,
        status_code INTEGER NOT NULL,
        project_name TEXT NOT NULL,
        headers JSONB,
        components JSONB NOT NULL,
        tld JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS url_history (
        id BIGSERIAL PRIMARY KEY,
        url TEXT NOT NULL,
        project_name TEXT NOT NULL,
        history JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tweet_url (
        query_alias TEXT NOT NULL,
        tweet_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        url TEXT NOT NULL,
        expanded_url TEXT NOT NULL,
        error TEXT,
        status_code INTEGER,
        PRIMARY KEY (query_alias, tweet_id, url)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS error (
        id BIGSERIAL PRIMARY KEY,
        current_record JSONB,
        error TEXT NOT NULL,
        module TEXT NOT NULL,
        ip TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// PostgreSQL-backed [`RecordStore`].
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the destination tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Record store schema ready");
        Ok(())
    }

    async fn insert_url(
        tx: &mut Transaction<'static, Postgres>,
        row: &UrlRow,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO url (url, status_code, project_name, headers, components, tld)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&row.url)
        .bind(row.status_code)
        .bind(&row.project_name)
        .bind(&row.headers)
        .bind(&row.components)
        .bind(&row.tld)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_history(
        tx: &mut Transaction<'static, Postgres>,
        row: &UrlHistoryRow,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO url_history (url, project_name, history) VALUES ($1, $2, $3)")
            .bind(&row.url)
            .bind(&row.project_name)
            .bind(&row.history)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_tweet_url(
        tx: &mut Transaction<'static, Postgres>,
        row: &TweetUrlRow,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO tweet_url
                (query_alias, tweet_id, created_at, url, expanded_url, error, status_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (query_alias, tweet_id, url) DO NOTHING
            "#,
        )
        .bind(&row.query_alias)
        .bind(&row.tweet_id)
        .bind(row.created_at)
        .bind(&row.url)
        .bind(&row.expanded_url)
        .bind(&row.error)
        .bind(row.status_code)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    type Transaction = Transaction<'static, Postgres>;

    async fn begin(&self) -> StoreResult<Self::Transaction> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Transaction) -> StoreResult<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Transaction) -> StoreResult<()> {
        tx.rollback().await?;
        Ok(())
    }

    async fn persist(
        &self,
        tx: &mut Self::Transaction,
        context: &JobContext,
        result: &ValidationResult,
    ) -> StoreResult<PersistOutcome> {
        let inserted = match context {
            JobContext::Project { project_name } => {
                let inserted = Self::insert_url(tx, &UrlRow::from_result(project_name, result)).await?;
                debug!(url = %result.final_url, inserted, "Saved record with url");
                Self::insert_history(tx, &UrlHistoryRow::from_result(project_name, result)).await?;
                debug!(url = %result.final_url, "Saved record with history");
                inserted
            }
            JobContext::Tweet {
                query_alias,
                tweet_id,
                created_at,
            } => {
                let row = TweetUrlRow::from_result(query_alias, tweet_id, *created_at, result);
                let inserted = Self::insert_tweet_url(tx, &row).await?;
                debug!(tweet_id = %tweet_id, url = %row.url, inserted, "Saved expanded tweet url");
                inserted
            }
        };
        Ok(PersistOutcome { inserted })
    }

    async fn record_error(
        &self,
        tx: &mut Self::Transaction,
        record: &ErrorRecord,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO error (current_record, error, module, ip) VALUES ($1, $2, $3, $4)")
            .bind(&record.current_record)
            .bind(&record.error)
            .bind(&record.module)
            .bind(&record.ip)
            .execute(&mut **tx)
            .await?;
        debug!(module = %record.module, "Saved record with error information");
        Ok(())
    }
}
