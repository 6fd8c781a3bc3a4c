use crate::{mount_page, test_config};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trawler::config::ExecutionKind;
use trawler::crawler::{CrawlEngine, CrawlMode};
use trawler::{EngineState, ErrorKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_site(server: &MockServer) {
    let base = server.uri();
    mount_page(
        server,
        "/",
        &format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/page2#again">Page 2 again</a>
            <a href="https://ads.doubleclick.net/banner">Ad</a>
            <a href="/logo.png">Logo</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(
        server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
        <p>Lakers win the game</p><a href="/page3">deeper</a></body></html>"#,
    )
    .await;
    mount_page(
        server,
        "/page2",
        "<html><head><title>Page 2</title></head><body>Content 2</body></html>",
    )
    .await;
    mount_page(
        server,
        "/page3",
        "<html><head><title>Page 3</title></head><body>Content 3</body></html>",
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let progress = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&progress);
    let engine = CrawlEngine::from_config(&test_config())
        .unwrap()
        .with_mode(CrawlMode::Keyword {
            keywords: vec!["lakers".into()],
        })
        .with_progress(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let report = engine.run(&format!("{}/", base)).await.unwrap();

    assert_eq!(report.state, EngineState::Completed);
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.stats.successful, 4);
    assert_eq!(progress.load(Ordering::SeqCst), 4);

    let page1 = report.result_for(&format!("{}/page1", base)).unwrap();
    assert_eq!(page1.title.as_deref(), Some("Page 1"));
    assert_eq!(page1.depth, 1);
    assert_eq!(page1.matched_keywords, vec!["lakers"]);

    let page3 = report.result_for(&format!("{}/page3", base)).unwrap();
    assert_eq!(page3.depth, 2);

    let home = report.result_for(&format!("{}/", base)).unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.outgoing_links.len(), 4);

    let sitemap = report.sitemap();
    assert_eq!(sitemap.total_pages, 4);
    assert_eq!(sitemap.max_depth, 2);
}

#[tokio::test]
async fn test_cooperative_crawl_visits_each_page_once() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let mut config = test_config();
    config.crawler.execution = ExecutionKind::Async;
    let engine = CrawlEngine::from_config(&config).unwrap();

    let report = engine.run(&format!("{}/", server.uri())).await.unwrap();
    assert_eq!(report.results.len(), 4);

    let requests = server.received_requests().await.unwrap();
    let page2_hits = requests.iter().filter(|r| r.url.path() == "/page2").count();
    assert_eq!(page2_hits, 1);
}

#[tokio::test]
async fn test_robots_disallowed_pages_are_not_fetched() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /page1\n"),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.respect_robots = true;
    let report = CrawlEngine::from_config(&config)
        .unwrap()
        .run(&format!("{}/", server.uri()))
        .await
        .unwrap();

    let page1 = report
        .result_for(&format!("{}/page1", server.uri()))
        .unwrap();
    assert_eq!(page1.error.as_ref().unwrap().kind, ErrorKind::Disallowed);
    // page3 is only linked from the disallowed page
    assert!(report.result_for(&format!("{}/page3", server.uri())).is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/page1"));
}

#[tokio::test]
async fn test_server_errors_recorded_per_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/down">down</a><a href="/up">up</a>"#,
    )
    .await;
    mount_page(&server, "/up", "<p>up</p>").await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.retry.max_retries = 1;
    let report = CrawlEngine::from_config(&config)
        .unwrap()
        .run(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.stats.failed, 1);
    let down = report.result_for(&format!("{}/down", server.uri())).unwrap();
    assert_eq!(down.status, Some(503));
    assert_eq!(down.error.as_ref().unwrap().kind, ErrorKind::Network);
    assert!(report
        .result_for(&format!("{}/up", server.uri()))
        .unwrap()
        .is_success());
}
