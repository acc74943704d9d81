//! PostgresQueue semantics and a full consumer run against Postgres.

mod common;

use std::time::Duration;

use serde_json::json;
use test_context::test_context;
use url_validation::testing::{FaultyStore, MockValidator};
use url_validation::{ConsumerConfig, ConsumerError, ConsumerLoop, HttpValidator, QueueClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::TestHarness;

#[test_context(TestHarness)]
#[tokio::test]
async fn test_received_message_is_hidden_until_deleted(ctx: &TestHarness) {
    let queue = ctx.queue().with_visibility_timeout(Duration::from_secs(60));
    queue.send("[]").await.unwrap();

    let message = queue.receive_batch().await.unwrap().expect("a message");
    assert_eq!(message.body, "[]");

    // Hidden while in flight, but still stored.
    assert!(queue.receive_batch().await.unwrap().is_none());
    assert_eq!(queue.len().await.unwrap(), 1);

    queue.delete_batch(&message).await.unwrap();
    assert!(queue.is_empty().await.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_expired_visibility_makes_message_receivable_again(ctx: &TestHarness) {
    let queue = ctx.queue().with_visibility_timeout(Duration::ZERO);
    queue.send("[1]").await.unwrap();

    let first = queue.receive_batch().await.unwrap().expect("a message");
    let second = queue.receive_batch().await.unwrap().expect("redelivered");
    assert_eq!(first.receipt, second.receipt);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_messages_are_received_in_order(ctx: &TestHarness) {
    let queue = ctx.queue();
    for body in ["first", "second", "third"] {
        queue.send(body).await.unwrap();
    }

    let mut bodies = Vec::new();
    while let Some(message) = queue.receive_batch().await.unwrap() {
        queue.delete_batch(&message).await.unwrap();
        bodies.push(message.body);
    }
    assert_eq!(bodies, vec!["first", "second", "third"]);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_publish_preserves_body_bytes(ctx: &TestHarness) {
    let queue = ctx.queue();
    let body = "[ {\"project_name\":\"acme\" , \"url\":\"http://x\"} ]";
    queue.send(body).await.unwrap();

    let message = queue.receive_batch().await.unwrap().expect("a message");
    queue.delete_batch(&message).await.unwrap();
    queue.publish_batch(&message).await.unwrap();

    let again = queue.receive_batch().await.unwrap().expect("republished");
    assert_eq!(again.body, body);
    assert_ne!(again.receipt, message.receipt);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_queues_are_isolated_by_name(ctx: &TestHarness) {
    let queue = ctx.queue();
    let other = url_validation::PostgresQueue::new(ctx.db_pool.clone(), format!("{}-other", ctx.queue_name));
    other.send("elsewhere").await.unwrap();

    assert!(queue.receive_batch().await.unwrap().is_none());
    assert_eq!(other.name(), format!("{}-other", ctx.queue_name));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_consumer_drains_queue_into_tables(ctx: &TestHarness) {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/landing"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let project = format!("project-{}", uuid::Uuid::new_v4());
    let start = format!("{}/start", server.uri());
    let landing = format!("{}/landing", server.uri());
    let queue = ctx.queue();
    queue
        .send(
            &json!([
                {"project_name": project, "url": start},
                {"project_name": project, "url": "gopher://hole.example/"},
            ])
            .to_string(),
        )
        .await
        .unwrap();

    let consumer = ConsumerLoop::new(
        queue,
        HttpValidator::new().unwrap(),
        ctx.store(),
        ConsumerConfig::new("192.0.2.10"),
    );
    let summary = consumer.run().await.unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.jobs, 2);
    assert_eq!(summary.scheme_rejections, 1);
    assert!(consumer.queue().is_empty().await.unwrap());

    let mut rows: Vec<(String, i32)> =
        sqlx::query_as("SELECT url, status_code FROM url WHERE project_name = $1")
            .bind(&project)
            .fetch_all(&ctx.db_pool)
            .await
            .unwrap();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            ("gopher://hole.example/".to_string(), 601),
            (landing.clone(), 200),
        ]
    );

    let history: Option<serde_json::Value> = sqlx::query_scalar(
        "SELECT history FROM url_history WHERE project_name = $1 AND url = $2",
    )
    .bind(&project)
    .bind(&landing)
    .fetch_one(&ctx.db_pool)
    .await
    .unwrap();
    assert_eq!(history, Some(json!([{"url": start, "status_code": 301}])));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_failed_batch_is_back_on_the_queue(ctx: &TestHarness) {
    let project = format!("project-{}", uuid::Uuid::new_v4());
    let failing = ctx.unique_url("unwritable");
    let body = json!([{"project_name": project, "url": failing}]).to_string();

    let queue = ctx.queue();
    queue.send(&body).await.unwrap();

    let validator = MockValidator::new();
    let store = FaultyStore::new(ctx.store()).fail_persist_for(failing.clone());
    let consumer = ConsumerLoop::new(queue, validator, store, ConsumerConfig::new("192.0.2.10"));

    let error = consumer.run().await.unwrap_err();
    assert!(matches!(error, ConsumerError::BatchFailed { .. }));

    let republished = consumer.queue().receive_batch().await.unwrap().expect("republished");
    assert_eq!(republished.body, body);

    let (module, ip): (String, String) = sqlx::query_as(
        "SELECT module, ip FROM error WHERE current_record->0->>'project_name' = $1",
    )
    .bind(&project)
    .fetch_one(&ctx.db_pool)
    .await
    .unwrap();
    assert_eq!(module, "url_validation_consumer");
    assert_eq!(ip, "192.0.2.10");
}
