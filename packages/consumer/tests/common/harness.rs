//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. The schema
//! is created once, on first use.

use anyhow::{Context, Result};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use url_validation::{PostgresQueue, PostgresRecordStore};
use uuid::Uuid;

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for schema setup")?;
        PostgresRecordStore::new(pool.clone())
            .ensure_schema()
            .await
            .context("Failed to create record tables")?;
        PostgresQueue::new(pool.clone(), "setup")
            .ensure_schema()
            .await
            .context("Failed to create queue table")?;
        pool.close().await;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test context over the shared database.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let queue = ctx.queue();
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    /// Unique per test so queue rows never collide
    pub queue_name: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self {
            db_pool,
            queue_name: format!("test-{}", Uuid::new_v4()),
        })
    }

    pub fn store(&self) -> PostgresRecordStore {
        PostgresRecordStore::new(self.db_pool.clone())
    }

    pub fn queue(&self) -> PostgresQueue {
        PostgresQueue::new(self.db_pool.clone(), self.queue_name.clone())
    }

    /// A URL no other test will write.
    pub fn unique_url(&self, path: &str) -> String {
        format!("https://{}.example.com/{}", Uuid::new_v4().simple(), path)
    }
}
