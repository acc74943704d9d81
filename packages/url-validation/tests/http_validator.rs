//! HttpValidator against local mock servers.
//!
//! Covers redirect capture, header collection and the two transport failure
//! paths (connection refused, timeout).

use std::time::Duration;

use url_validation::validator::DEFAULT_USER_AGENT;
use url_validation::{HttpValidator, HttpValidatorConfig, RedirectHop, UrlValidator};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn redirect_to(location: &str, status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("Location", location)
}

#[tokio::test]
async fn test_direct_response_has_no_history() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-served-by", "mock"))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let url = format!("{}/ok", server.uri());
    let result = validator.validate(&url, TIMEOUT).await;

    assert_eq!(result.status_code(), 200);
    assert_eq!(result.final_url, url);
    assert_eq!(result.outcome.history(), None);
    assert_eq!(result.history_json(), None);
    assert_eq!(result.outcome.headers().unwrap()["x-served-by"], "mock");
    assert_eq!(result.components.path, "/ok");
    assert_eq!(result.components.host, "127.0.0.1");
    assert_eq!(result.tld.domain, "127.0.0.1");
}

#[tokio::test]
async fn test_redirect_chain_is_captured_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(redirect_to("/b", 301))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/b"))
        .respond_with(redirect_to(&format!("{}/c", server.uri()), 302))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let start = format!("{}/a", server.uri());
    let result = validator.validate(&start, TIMEOUT).await;

    assert_eq!(result.status_code(), 200);
    assert_eq!(result.original_url, start);
    assert_eq!(result.final_url, format!("{}/c", server.uri()));
    assert_eq!(
        result.outcome.history().unwrap(),
        &[
            RedirectHop {
                url: start.clone(),
                status_code: 301
            },
            RedirectHop {
                url: format!("{}/b", server.uri()),
                status_code: 302
            },
        ]
    );

    let decoded: Vec<RedirectHop> =
        serde_json::from_value(result.history_json().unwrap()).unwrap();
    assert_eq!(decoded.len(), 2);
}

#[tokio::test]
async fn test_error_statuses_are_real_results() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let result = validator
        .validate(&format!("{}/missing", server.uri()), TIMEOUT)
        .await;

    assert_eq!(result.status_code(), 404);
    assert!(result.outcome.headers().is_some());
    assert_eq!(result.transport_failure(), None);
}

#[tokio::test]
async fn test_sends_browser_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let result = validator.validate(&server.uri(), TIMEOUT).await;

    assert_eq!(result.status_code(), 204);
}

#[tokio::test]
async fn test_redirect_loop_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/loop"))
        .respond_with(redirect_to("/loop", 302))
        .mount(&server)
        .await;

    let validator =
        HttpValidator::with_config(HttpValidatorConfig::default().with_max_redirects(3)).unwrap();
    let url = format!("{}/loop", server.uri());
    let result = validator.validate(&url, TIMEOUT).await;

    assert_eq!(result.status_code(), 600);
    assert_eq!(result.final_url, url);
    assert!(result.transport_failure().unwrap().contains("exceeded 3 redirects"));
}

#[tokio::test]
async fn test_redirect_without_location_is_final() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let result = validator
        .validate(&format!("{}/moved", server.uri()), TIMEOUT)
        .await;

    assert_eq!(result.status_code(), 301);
    assert_eq!(result.outcome.history(), None);
}

#[tokio::test]
async fn test_unreachable_host_is_a_transport_failure() {
    let validator = HttpValidator::new().unwrap();
    let url = "http://127.0.0.1:1/";
    let result = validator.validate(url, TIMEOUT).await;

    assert_eq!(result.status_code(), 600);
    assert_eq!(result.final_url, url);
    assert_eq!(result.outcome.headers(), None);
    assert_eq!(result.outcome.history(), None);
    assert!(result.transport_failure().unwrap().contains("request to"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let result = validator
        .validate(&server.uri(), Duration::from_millis(200))
        .await;

    assert_eq!(result.status_code(), 600);
}

#[tokio::test]
async fn test_non_moving_3xx_with_location_is_final() {
    let server = MockServer::start().await;
    for (route, status) in [("/choices", 300), ("/unchanged", 304)] {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(redirect_to("/elsewhere", status))
            .mount(&server)
            .await;
    }
    Mock::given(method("HEAD"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    for (route, status) in [("/choices", 300), ("/unchanged", 304)] {
        let url = format!("{}{}", server.uri(), route);
        let result = validator.validate(&url, TIMEOUT).await;

        assert_eq!(result.status_code(), status);
        assert_eq!(result.final_url, url);
        assert_eq!(result.outcome.history(), None);
    }
}

#[tokio::test]
async fn test_first_hop_records_the_trimmed_url() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(redirect_to("/b", 301))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let validator = HttpValidator::new().unwrap();
    let requested = format!("{}/a", server.uri());
    let result = validator.validate(&format!("  {requested}\n"), TIMEOUT).await;

    assert_eq!(result.status_code(), 200);
    assert_eq!(
        result.outcome.history().unwrap(),
        &[RedirectHop {
            url: requested,
            status_code: 301
        }]
    );
}
