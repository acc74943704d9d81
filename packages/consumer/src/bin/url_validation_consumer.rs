// Entry point for the URL validation consumer

use anyhow::{Context, Result};
use consumer_core::{source_ip, telemetry, Config, QueueBackend};
use sqlx::postgres::PgPoolOptions;
use url_validation::{
    ConsumerConfig, ConsumerLoop, HttpValidator, HttpValidatorConfig, PostgresQueue,
    PostgresRecordStore, QueueClient, RunSummary,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    telemetry::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(backend = ?config.queue_backend, queue = %config.queue_name, "Configuration loaded");

    let ip = source_ip::resolve(config.source_ip.as_deref(), &config.ip_lookup_url)
        .await
        .context("Failed to determine source IP")?;

    let validator = HttpValidator::with_config(
        HttpValidatorConfig::default()
            .with_user_agent(config.user_agent.clone())
            .with_accept_invalid_certs(config.accept_invalid_certs),
    )
    .context("Failed to build HTTP client")?;

    let consumer_config = ConsumerConfig::new(ip)
        .with_url_timeout(config.url_timeout)
        .with_tweet_timeout(config.tweet_timeout);

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    let store = PostgresRecordStore::new(pool.clone());
    let outcome = match config.queue_backend {
        QueueBackend::Postgres => {
            let queue = PostgresQueue::new(pool.clone(), config.queue_name.clone())
                .with_visibility_timeout(config.visibility_timeout);
            run_postgres(queue, validator, store, consumer_config, config.init_schema).await
        }
        QueueBackend::Sqs => run_sqs(&config, validator, store, consumer_config).await,
    };

    // Released on success and on failure alike
    pool.close().await;

    let summary = outcome?;
    tracing::info!(
        batches = summary.batches,
        jobs = summary.jobs,
        transport_failures = summary.transport_failures,
        scheme_rejections = summary.scheme_rejections,
        "Queue drained"
    );
    Ok(())
}

async fn run<Q: QueueClient>(
    queue: Q,
    validator: HttpValidator,
    store: PostgresRecordStore,
    consumer_config: ConsumerConfig,
    init_schema: bool,
) -> Result<RunSummary> {
    if init_schema {
        store.ensure_schema().await.context("Failed to create tables")?;
        tracing::info!("Schema ready");
    }

    let consumer = ConsumerLoop::new(queue, validator, store, consumer_config);
    consumer.run().await.context("Consumer stopped after a failed batch")
}

async fn run_postgres(
    queue: PostgresQueue,
    validator: HttpValidator,
    store: PostgresRecordStore,
    consumer_config: ConsumerConfig,
    init_schema: bool,
) -> Result<RunSummary> {
    if init_schema {
        queue.ensure_schema().await.context("Failed to create queue table")?;
    }
    run(queue, validator, store, consumer_config, init_schema).await
}

#[cfg(feature = "sqs")]
async fn run_sqs(
    config: &Config,
    validator: HttpValidator,
    store: PostgresRecordStore,
    consumer_config: ConsumerConfig,
) -> Result<RunSummary> {
    let queue = url_validation::SqsQueue::connect(&config.queue_name, config.aws_region.clone())
        .await
        .context("Failed to connect to SQS")?;
    tracing::info!(queue_url = queue.queue_url(), "Consuming from SQS");
    run(queue, validator, store, consumer_config, config.init_schema).await
}

#[cfg(not(feature = "sqs"))]
async fn run_sqs(
    _config: &Config,
    _validator: HttpValidator,
    _store: PostgresRecordStore,
    _consumer_config: ConsumerConfig,
) -> Result<RunSummary> {
    anyhow::bail!("QUEUE_BACKEND=sqs requires building with the `sqs` feature")
}
