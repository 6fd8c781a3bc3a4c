use crate::{html_response, TEST_TIMEOUT};
use trawler::crawler::{FetchError, FetchRequest, Fetcher, HttpFetcher};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_returns_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(html_response("<html><body>hello</body></html>").insert_header("X-Custom", "yes"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(TEST_TIMEOUT).unwrap();
    let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
    let request = FetchRequest::get(url.clone())
        .with_headers(vec![("User-Agent".to_string(), "TestBot/1.0".to_string())]);

    let response = fetcher.fetch(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert!(response.is_html());
    assert_eq!(response.header("x-custom"), Some("yes"));
    assert_eq!(response.header("X-CUSTOM"), Some("yes"));
    assert!(response.body.contains("hello"));
    assert_eq!(response.final_url, url.as_str());
    assert!(!response.from_cache);
}

#[tokio::test]
async fn test_error_statuses_are_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(TEST_TIMEOUT).unwrap();

    let throttled = Url::parse(&format!("{}/throttled", server.uri())).unwrap();
    let response = fetcher.fetch(&FetchRequest::get(throttled)).await.unwrap();
    assert_eq!(response.status, 429);
    assert_eq!(response.header("retry-after"), Some("7"));

    let broken = Url::parse(&format!("{}/broken", server.uri())).unwrap();
    let response = fetcher.fetch(&FetchRequest::get(broken)).await.unwrap();
    assert_eq!(response.status, 503);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html_response("<p>moved</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(TEST_TIMEOUT).unwrap();
    let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
    let response = fetcher.fetch(&FetchRequest::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.final_url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_connection_refused_is_transient_error() {
    // Bind then drop a listener so nothing accepts on the port
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let fetcher = HttpFetcher::new(TEST_TIMEOUT).unwrap();
    let url = Url::parse(&format!("http://127.0.0.1:{}/gone", port)).unwrap();
    let error = fetcher.fetch(&FetchRequest::get(url)).await.unwrap_err();

    assert!(error.is_transient());
    assert!(!matches!(error, FetchError::Invalid { .. }));
}
