use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvester_core::{HarvestRequest, HeadingLevel, UrlOutcome};
use harvester_engine::{
    EngineConfig, FailureKind, FetchError, FetchMetadata, FetchOutput, FetchSettings, Fetcher,
    HarvestEvent, Harvester, ProgressSink, ScraperHeadingExtractor,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves canned pages keyed by URL, optionally after a delay, and records
/// the highest number of fetches in flight at once.
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, (Duration, Result<String, FailureKind>)>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn page(mut self, url: &str, delay_ms: u64, html: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), Ok(html.to_string())),
        );
        self
    }

    fn failing(mut self, url: &str, kind: FailureKind) -> Self {
        self.pages
            .insert(url.to_string(), (Duration::ZERO, Err(kind)));
        self
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let entry = self.pages.get(url).cloned();
        let delay = entry.as_ref().map(|(d, _)| *d).unwrap_or_default();
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match entry {
            Some((_, Ok(html))) => Ok(FetchOutput {
                metadata: FetchMetadata {
                    final_url: url.to_string(),
                    status: 200,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    byte_len: html.len() as u64,
                },
                bytes: html.into_bytes(),
            }),
            Some((_, Err(kind))) => Err(FetchError::new(kind.clone(), format!("{kind} for {url}"))),
            None => Err(FetchError::new(FailureKind::Network, format!("no route to {url}"))),
        }
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<HarvestEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn harvester(fetcher: Arc<FakeFetcher>, concurrency: usize) -> Harvester {
    Harvester::with_parts(fetcher, Arc::new(ScraperHeadingExtractor), concurrency)
}

fn request(urls: &[&str]) -> HarvestRequest {
    HarvestRequest::new(urls.iter().map(|u| u.to_string()).collect()).unwrap()
}

#[tokio::test]
async fn outcomes_follow_input_order_even_when_fetches_finish_out_of_order() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://slow.test", 120, "<h1>slow</h1>")
            .page("https://mid.test", 60, "<h1>mid</h1>")
            .page("https://fast.test", 0, "<h1>fast</h1>"),
    );
    let harvester = harvester(fetcher.clone(), 3);

    let result = harvester
        .harvest(&request(&["slow.test", "mid.test", "fast.test"]))
        .await;

    let urls: Vec<_> = result.outcomes().iter().map(|o| o.resolved_url()).collect();
    assert_eq!(
        urls,
        vec!["https://slow.test", "https://mid.test", "https://fast.test"]
    );
    let texts: Vec<_> = result
        .outcomes()
        .iter()
        .map(|o| o.headings().unwrap()[0].text())
        .collect();
    assert_eq!(texts, vec!["slow", "mid", "fast"]);
    assert!(fetcher.peak_in_flight.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn failure_of_one_url_does_not_affect_the_others() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .failing("https://bad-domain-xyz.invalid", FailureKind::Network)
            .page("https://example.com", 0, "<h1>Example Domain</h1>"),
    );
    let harvester = harvester(fetcher, 4);

    let result = harvester
        .harvest(&request(&["bad-domain-xyz.invalid", "example.com"]))
        .await;

    assert_eq!(result.len(), 2);
    let first = &result.outcomes()[0];
    assert_eq!(first.resolved_url(), "https://bad-domain-xyz.invalid");
    assert!(!first.error_message().unwrap().is_empty());
    assert_eq!(
        result.outcomes()[1],
        UrlOutcome::Success {
            resolved_url: "https://example.com".into(),
            headings: vec![harvester_core::Heading::new(HeadingLevel::H1, "Example Domain").unwrap()],
        }
    );
}

#[tokio::test]
async fn every_url_gets_an_outcome_under_total_failure() {
    let fetcher = Arc::new(FakeFetcher::default());
    let harvester = harvester(fetcher, 2);
    let urls = ["a.test", "b.test", "", "  c.test  ", "a.test"];

    let result = harvester.harvest(&request(&urls)).await;

    assert_eq!(result.len(), urls.len());
    assert_eq!(result.failure_count(), urls.len());
    let resolved: Vec<_> = result.outcomes().iter().map(|o| o.resolved_url()).collect();
    assert_eq!(
        resolved,
        vec![
            "https://a.test",
            "https://b.test",
            "https://",
            "https://c.test",
            "https://a.test"
        ]
    );
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let mut fake = FakeFetcher::default();
    let urls: Vec<String> = (0..10).map(|i| format!("https://p{i}.test")).collect();
    for url in &urls {
        fake = fake.page(url, 20, "<h2>x</h2>");
    }
    let fetcher = Arc::new(fake);
    let harvester = harvester(fetcher.clone(), 3);

    let result = harvester
        .harvest(&HarvestRequest::new(urls.clone()).unwrap())
        .await;

    assert_eq!(result.len(), 10);
    assert!(fetcher.peak_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn zero_concurrency_runs_sequentially() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://a.test", 10, "<h1>a</h1>")
            .page("https://b.test", 10, "<h1>b</h1>"),
    );
    let harvester = harvester(fetcher.clone(), 0);
    assert_eq!(harvester.max_concurrency(), 1);

    harvester.harvest(&request(&["a.test", "b.test"])).await;

    assert_eq!(fetcher.peak_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(
        *fetcher.requested.lock().unwrap(),
        vec!["https://a.test".to_string(), "https://b.test".to_string()]
    );
}

#[tokio::test]
async fn requested_levels_are_applied_to_every_url() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://a.test", 0, "<h1>a1</h1><h2>a2</h2><h3>a3</h3>")
            .page("https://b.test", 0, "<h3>b3</h3><h1>b1</h1>"),
    );
    let harvester = harvester(fetcher, 2);
    let request = request(&["a.test", "b.test"]).with_levels([HeadingLevel::H3, HeadingLevel::H1]);

    let result = harvester.harvest(&request).await;

    let texts: Vec<Vec<&str>> = result
        .outcomes()
        .iter()
        .map(|o| o.headings().unwrap().iter().map(|h| h.text()).collect())
        .collect();
    assert_eq!(texts, vec![vec!["a1", "a3"], vec!["b1", "b3"]]);
}

#[tokio::test]
async fn malformed_html_is_a_success_not_a_failure() {
    let fetcher = Arc::new(FakeFetcher::default().page(
        "https://broken.test",
        0,
        "<html><h1>Salvaged<h2>also</div></span><h3",
    ));
    let harvester = harvester(fetcher, 1);

    let result = harvester.harvest(&request(&["broken.test"])).await;

    let outcome = &result.outcomes()[0];
    assert!(outcome.is_success());
    assert!(!outcome.headings().unwrap().is_empty());
}

#[tokio::test]
async fn progress_events_cover_every_url() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://ok.test", 0, "<h1>a</h1><h2>b</h2>")
            .failing("https://bad.test", FailureKind::Timeout),
    );
    let harvester = harvester(fetcher, 1);
    let sink = TestSink::default();

    harvester
        .harvest_with_sink(&request(&["ok.test", "bad.test"]), &sink)
        .await;

    assert_eq!(
        sink.take(),
        vec![
            HarvestEvent::Started {
                index: 0,
                url: "https://ok.test".into()
            },
            HarvestEvent::Completed {
                index: 0,
                url: "https://ok.test".into(),
                result: Ok(2)
            },
            HarvestEvent::Started {
                index: 1,
                url: "https://bad.test".into()
            },
            HarvestEvent::Completed {
                index: 1,
                url: "https://bad.test".into(),
                result: Err(FailureKind::Timeout)
            },
        ]
    );
}

#[tokio::test]
async fn end_to_end_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><h2>  Hello\n  World  </h2><h1>Top</h1><h1> </h1></body></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = EngineConfig {
        fetch: FetchSettings {
            error_for_status: true,
            request_timeout: Duration::from_secs(5),
            ..FetchSettings::default()
        },
        max_concurrency: 4,
    };
    let harvester = Harvester::new(config).expect("harvester builds");
    let page = format!("{}/page", server.uri());
    let gone = format!("{}/gone", server.uri());

    let result = harvester
        .harvest(&HarvestRequest::new(vec![page.clone(), gone.clone(), "127.0.0.1:1".into()]).unwrap())
        .await;

    assert_eq!(result.len(), 3);
    let headings: Vec<_> = result.outcomes()[0]
        .headings()
        .unwrap()
        .iter()
        .map(|h| (h.level().number(), h.text().to_string()))
        .collect();
    assert_eq!(
        headings,
        vec![(1, "Top".to_string()), (2, "Hello World".to_string())]
    );
    assert_eq!(result.outcomes()[0].resolved_url(), page);
    assert_eq!(result.outcomes()[1].resolved_url(), gone);
    assert!(result.outcomes()[1].error_message().unwrap().contains("500"));
    assert_eq!(result.outcomes()[2].resolved_url(), "https://127.0.0.1:1");
    assert!(!result.outcomes()[2].error_message().unwrap().is_empty());
}
