use std::time::Duration;

use clipstream::feed::{FeedConfig, FeedOrchestrator};
use clipstream::listing::build_http_client;
use clipstream::settings::{MemorySettingsStore, Settings, SortMode};
use serde_json::{json, Value};
use tokio::sync::{oneshot, watch};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches listing requests without a pagination cursor (page one)
struct NoAfterParam;

impl Match for NoAfterParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "after")
    }
}

/// Builds one raw post record; unplayable posts get a plain article URL
fn post(name: &str, playable: bool) -> Value {
    let url = if playable {
        format!("https://v.example.com/{}.mp4", name)
    } else {
        format!("https://example.com/{}", name)
    };
    json!({
        "kind": "t3",
        "data": {
            "author": "someone",
            "name": name,
            "permalink": format!("/r/test/comments/{}", name),
            "title": format!("post {}", name),
            "thumbnail": "https://thumb.example.com/t.jpg",
            "num_comments": 3,
            "url": url
        }
    })
}

fn listing(posts: Vec<Value>) -> Value {
    json!({"kind": "Listing", "data": {"children": posts, "after": null}})
}

async fn build_orchestrator(base_url: &str, per_page: u32, debounce_ms: u64) -> FeedOrchestrator {
    let orchestrator = FeedOrchestrator::with_config(
        build_http_client().expect("failed to build HTTP client"),
        Box::new(MemorySettingsStore::new()),
        FeedConfig {
            base_url: base_url.to_string(),
            debounce: Duration::from_millis(debounce_ms),
        },
    )
    .expect("failed to create orchestrator");
    orchestrator.init().expect("init failed");
    orchestrator
        .set_settings(Settings {
            sort: SortMode::Hot,
            per_page,
        })
        .expect("settings rejected");
    orchestrator
}

/// Waits until the loading flag returns to false, i.e. the current fill
/// cycle has stopped
async fn wait_cycle_done(loading: &mut watch::Receiver<bool>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            loading.changed().await.expect("orchestrator dropped");
            if !*loading.borrow() {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for fill cycle");
}

fn feed_names(feed: &watch::Receiver<Vec<clipstream::listing::Clip>>) -> Vec<String> {
    feed.borrow().iter().map(|clip| clip.name.clone()).collect()
}

#[tokio::test]
async fn test_feed_contains_only_playable_clips() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("t3_a", true),
            post("t3_b", false),
            post("t3_c", true),
            post("t3_d", true),
            post("t3_e", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 3, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;

    let clips = feed.borrow().clone();
    assert_eq!(clips.len(), 3);
    assert!(clips.iter().all(|clip| clip.src.is_some()));
    assert_eq!(feed_names(&feed), vec!["t3_a", "t3_c", "t3_d"]);
}

#[tokio::test]
async fn test_retries_until_quota_met() {
    let server = MockServer::start().await;

    // Second page, keyed off the cursor: the last raw item of page one,
    // playable or not. Mounted before the page-one mock so the more specific
    // matcher wins.
    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(query_param("after", "t3_e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("t3_f", true),
            post("t3_g", true),
            post("t3_h", true),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // Page one: 3 playable out of 5, quota is 5.
    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(NoAfterParam)
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("t3_a", true),
            post("t3_b", true),
            post("t3_c", true),
            post("t3_d", false),
            post("t3_e", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 5, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;

    // 3 from the first page, then the 2-clip shortfall from the second;
    // the third valid clip of page two exceeds the shortfall and is dropped.
    assert_eq!(
        feed_names(&feed),
        vec!["t3_a", "t3_b", "t3_c", "t3_f", "t3_g"]
    );
}

#[tokio::test]
async fn test_stops_when_upstream_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/empty/hot/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 5, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("empty");
    wait_cycle_done(&mut loading).await;

    assert!(feed.borrow().is_empty());
    assert!(!*loading.borrow());
}

#[tokio::test]
async fn test_attempt_budget_is_bounded() {
    let server = MockServer::start().await;

    // Every page has exactly one item and it is never playable, so the
    // shortfall never resolves. The cycle must stop after ten fetches.
    Mock::given(method("GET"))
        .and(path("/r/barren/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_x", false)])),
        )
        .expect(10)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 10, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("barren");
    wait_cycle_done(&mut loading).await;

    assert!(feed.borrow().is_empty());
    assert!(!*loading.borrow());
}

#[tokio::test]
async fn test_source_change_resets_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/aaa/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_a1", true), post("t3_a2", true)])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/bbb/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_b1", true), post("t3_b2", true)])),
        )
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 2, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("aaa");
    wait_cycle_done(&mut loading).await;
    assert_eq!(feed_names(&feed), vec!["t3_a1", "t3_a2"]);

    orchestrator.set_source("bbb");
    wait_cycle_done(&mut loading).await;

    // Nothing from the abandoned source survives the restart.
    assert_eq!(feed_names(&feed), vec!["t3_b1", "t3_b2"]);
}

#[tokio::test]
async fn test_rapid_edits_collapse_to_final_value() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/base/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_z1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/aaa/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_a1", true)])),
        )
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/bbb/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_b1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 1, 50).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    // An initial source, so the later edits go through the debounce window.
    orchestrator.set_source("base");
    wait_cycle_done(&mut loading).await;

    // Both edits land inside one debounce window; only the final one counts.
    orchestrator.set_source("aaa");
    orchestrator.set_source("bbb");
    wait_cycle_done(&mut loading).await;

    assert_eq!(feed_names(&feed), vec!["t3_b1"]);
}

#[tokio::test]
async fn test_first_source_skips_debounce() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_a1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    // A debounce far longer than the wait timeout: the very first value must
    // start a pipeline without sitting out the window.
    let orchestrator = build_orchestrator(&server.uri(), 1, 60_000).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;

    assert_eq!(feed_names(&feed), vec!["t3_a1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restart_discards_late_batches_from_old_source() {
    let server = MockServer::start().await;

    // The old source answers slowly; its response lands only after the new
    // source has reset the feed and finished its own cycle.
    Mock::given(method("GET"))
        .and(path("/r/slow/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_s1", true)]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/fast/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_f1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 1, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("slow");
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.set_source("fast");
    wait_cycle_done(&mut loading).await;

    // Wait out the slow response; its clips must never land after the reset.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(feed_names(&feed), vec!["t3_f1"]);
}

#[tokio::test]
async fn test_unchanged_source_does_not_restart() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/aaa/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("t3_a1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 1, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("aaa");
    wait_cycle_done(&mut loading).await;

    orchestrator.set_source("aaa");
    // Give a would-be restart ample time to fire before verifying it didn't.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(feed_names(&feed), vec!["t3_a1"]);
}

#[tokio::test]
async fn test_next_page_appends_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(query_param("after", "t3_a2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_a3", true), post("t3_a4", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(NoAfterParam)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_a1", true), post("t3_a2", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 2, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;

    let (tx, rx) = oneshot::channel();
    orchestrator.request_next_page(tx, "t3_a2");
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("timed out waiting for scroll completion")
        .expect("scroll handle abandoned");

    assert_eq!(
        feed_names(&feed),
        vec!["t3_a1", "t3_a2", "t3_a3", "t3_a4"]
    );
}

#[tokio::test]
async fn test_second_next_page_supersedes_first() {
    let server = MockServer::start().await;

    // The first scroll request's page answers slowly; by the time it
    // arrives, a newer request owns the pipeline.
    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(query_param("after", "t3_c1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_d1", true), post("t3_d2", true)]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(query_param("after", "t3_c2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_e1", true), post("t3_e2", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .and(NoAfterParam)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_a1", true), post("t3_a2", true)])),
        )
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 2, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;

    let (tx1, rx1) = oneshot::channel();
    orchestrator.request_next_page(tx1, "t3_c1");
    // Let the first cycle get its slow request in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (tx2, rx2) = oneshot::channel();
    orchestrator.request_next_page(tx2, "t3_c2");

    tokio::time::timeout(Duration::from_secs(5), rx2)
        .await
        .expect("timed out waiting for scroll completion")
        .expect("second scroll handle abandoned");

    // The first handle was replaced, so it reports abandonment.
    assert!(rx1.await.is_err());

    // Wait out the slow response; its clips must never land.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        feed_names(&feed),
        vec!["t3_a1", "t3_a2", "t3_e1", "t3_e2"]
    );
}

#[tokio::test]
async fn test_transport_failure_degrades_to_empty_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/flaky/hot/.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 3, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("flaky");
    wait_cycle_done(&mut loading).await;

    assert!(feed.borrow().is_empty());
    assert!(!*loading.borrow());
}

#[tokio::test]
async fn test_malformed_payload_degrades_to_empty_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/garbled/hot/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<!doctype html>nope"))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 3, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("garbled");
    wait_cycle_done(&mut loading).await;

    assert!(feed.borrow().is_empty());
    assert!(!*loading.borrow());
}

#[tokio::test]
async fn test_settings_change_restarts_pipeline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/test/hot/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_a1", true), post("t3_a2", true)])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/test/new/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("t3_n1", true), post("t3_n2", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build_orchestrator(&server.uri(), 2, 10).await;
    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source("test");
    wait_cycle_done(&mut loading).await;
    assert_eq!(feed_names(&feed), vec!["t3_a1", "t3_a2"]);

    orchestrator
        .set_settings(Settings {
            sort: SortMode::New,
            per_page: 1,
        })
        .expect("settings rejected");
    wait_cycle_done(&mut loading).await;

    // New sort, new page size, feed rebuilt from scratch.
    assert_eq!(feed_names(&feed), vec!["t3_n1"]);
}
