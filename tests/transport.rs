//! `HttpFetcher` against a local mock server.

use job_harvest::config::{CHROME_USER_AGENT, Config};
use job_harvest::error::FetchError;
use job_harvest::models::Source;
use job_harvest::transport::{Fetcher, HttpFetcher};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(timeout_secs: u64) -> HttpFetcher {
    let config = Config {
        request_timeout_secs: timeout_secs,
        ..Config::default()
    };
    HttpFetcher::from_config(&config).unwrap()
}

#[tokio::test]
async fn success_returns_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>posting</html>"))
        .mount(&server)
        .await;

    let body = fetcher(5)
        .fetch(Source::LinkedIn, &format!("{}/job/1", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<html>posting</html>");
}

#[tokio::test]
async fn non_success_status_carries_url_and_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/search", server.uri());
    match fetcher(5).fetch(Source::Seek, &url).await {
        Err(FetchError::Status { url: failed, status }) => {
            assert_eq!(status, 503);
            assert_eq!(failed, url);
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let url = format!("{}/slow", server.uri());
    match fetcher(1).fetch(Source::LinkedIn, &url).await {
        Err(FetchError::Timeout { url: failed }) => assert_eq!(failed, url),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn sources_present_their_own_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let fetcher = fetcher(5);
    fetcher.fetch(Source::Seek, &format!("{}/seek", server.uri())).await.unwrap();
    fetcher
        .fetch(Source::LinkedIn, &format!("{}/linkedin", server.uri()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let seek = requests.iter().find(|r| r.url.path() == "/seek").unwrap();
    assert_eq!(seek.headers.get("user-agent").unwrap(), CHROME_USER_AGENT);
    assert_eq!(seek.headers.get("accept-language").unwrap(), "en-AU,en;q=0.9");
    assert_eq!(seek.headers.get("sec-fetch-mode").unwrap(), "navigate");
    assert_eq!(seek.headers.get("sec-fetch-dest").unwrap(), "document");
    assert_eq!(seek.headers.get("upgrade-insecure-requests").unwrap(), "1");

    let linkedin = requests.iter().find(|r| r.url.path() == "/linkedin").unwrap();
    assert_eq!(linkedin.headers.get("user-agent").unwrap(), CHROME_USER_AGENT);
    assert!(linkedin.headers.get("sec-fetch-mode").is_none());
}
