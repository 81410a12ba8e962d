use std::sync::Arc;
use std::time::{Duration, Instant};

use archiver_engine::{
    DownloadFailure, FailureKind, FetchSettings, ReqwestFetcher, RetryPolicy, RetryingDownloader,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(max_attempts: u32, base_delay: Duration) -> RetryingDownloader {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client");
    RetryingDownloader::new(Arc::new(fetcher), RetryPolicy::new(max_attempts, base_delay))
}

#[tokio::test]
async fn not_found_is_tried_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/a/bb/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = downloader(5, Duration::from_millis(10));
    let failed = downloader
        .fetch(&format!("{}/storage/a/bb/gone.png", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(failed.failure, DownloadFailure::NotFound);
    assert_eq!(failed.attempts, 1);
    assert_eq!(failed.retries(), 0);
    assert_eq!(downloader.total_retries(), 0);
}

#[tokio::test]
async fn transient_errors_use_every_attempt_with_growing_pauses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let base = Duration::from_millis(40);
    let downloader = downloader(3, base);
    let started = Instant::now();
    let failed = downloader
        .fetch(&format!("{}/busy", server.uri()))
        .await
        .unwrap_err();

    // Pauses of 1x and 2x the base delay sit between the three attempts.
    assert!(started.elapsed() >= base * 3);
    assert_eq!(failed.attempts, 3);
    match failed.failure {
        DownloadFailure::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, FailureKind::HttpStatus(503));
        }
        other => panic!("expected exhausted, got {other:?}"),
    }
    assert_eq!(downloader.total_retries(), 2);
}

#[tokio::test]
async fn recovers_when_a_later_attempt_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("data", "video/webm"))
        .mount(&server)
        .await;

    let downloader = downloader(5, Duration::from_millis(5));
    let downloaded = downloader
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .expect("second attempt succeeds");
    assert_eq!(downloaded.bytes, b"data");
    assert_eq!(downloaded.attempts, 2);
    assert_eq!(downloaded.retries(), 1);
}

#[test]
fn backoff_is_linear_and_strictly_increasing() {
    let policy = RetryPolicy::new(5, Duration::from_secs(1));
    let delays: Vec<Duration> = (1..5).map(|attempt| policy.delay_after(attempt)).collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(3),
            Duration::from_secs(4)
        ]
    );
    assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn attempts_are_clamped() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    assert_eq!(RetryPolicy::new(99, Duration::ZERO).max_attempts, 30);
}
