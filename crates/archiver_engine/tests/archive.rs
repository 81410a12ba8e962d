use std::fs;
use std::io::Cursor;
use std::time::Duration;

use archiver_engine::{Archiver, ArchiverConfig, RetryPolicy, TagOrder, THREAD_HTML};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 10, 10])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn thread_page(day: &str) -> String {
    format!(
        r#"<html><head><title>t</title><link rel="stylesheet" href="/css/main.css"></head><body>
        <span class="post_time">{day}/01/25 Пнд 16:33:14</span>
        <a href="/storage/a/bb/abc.png"><img src="/storage/t/abc.png"></a>
        <a href="/storage/a/cc/def.mp4"><img src="/storage/t/def.png.thumb"></a>
        <a href="/storage/a/cc/lost.gif">gone</a>
        </body></html>"#
    )
}

async fn mount(server: &MockServer, at: &str, body: Vec<u8>, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(server)
        .await;
}

async fn site() -> MockServer {
    let server = MockServer::start().await;
    mount(&server, "/thread/1122323/", thread_page("20").into_bytes(), "text/html; charset=utf-8").await;
    mount(&server, "/thread/555/", thread_page("21").into_bytes(), "text/html; charset=utf-8").await;
    mount(&server, "/css/main.css", b"body{}".to_vec(), "text/css").await;
    mount(&server, "/storage/a/bb/abc.png", png_bytes(), "image/png").await;
    mount(&server, "/storage/a/cc/def.mp4", b"mp4data".to_vec(), "video/mp4").await;
    mount(&server, "/storage/t/def.png.thumb", b"thumb".to_vec(), "image/jpeg").await;
    server
}

fn archiver(server: &MockServer) -> Archiver {
    let config = ArchiverConfig {
        domain: server.uri(),
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
        page_delay: Duration::ZERO,
        ..ArchiverConfig::default()
    };
    Archiver::new(config).expect("archiver")
}

#[tokio::test]
async fn thread_is_laid_out_for_offline_reading() {
    let server = site().await;
    let out = TempDir::new().unwrap();
    let archiver = archiver(&server);

    let report = archiver
        .archive_thread(&format!("{}/thread/1122323/", server.uri()), out.path())
        .await
        .expect("archive ok");

    let thread_dir = out.path().join("20.01.25_1122323");
    assert_eq!(report.thread_dir, thread_dir);
    assert_eq!(report.html_path, thread_dir.join(THREAD_HTML));
    assert!(thread_dir.join("resources/main.css").is_file());
    assert!(thread_dir.join("media/abc.jpg").is_file());
    assert!(thread_dir.join("media/def.mp4").is_file());
    assert!(thread_dir.join("media/def_thumb.jpg").is_file());
    assert!(!thread_dir.join("media/lost.gif").exists());

    assert_eq!(report.media.total, 4);
    assert_eq!(report.media.completed, 3);
    assert_eq!(report.media.failed, 1);
    assert_eq!(report.media.converted, 1);
    assert_eq!(report.resources.completed, 1);

    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains(r#"href="resources/main.css""#));
    assert!(html.contains(r#"<img src="media/abc.jpg">"#));
    assert!(html.contains(r#"<img src="media/def_thumb.jpg">"#));

    // A second run only retries what is missing.
    let again = archiver
        .archive_thread(&format!("{}/thread/1122323/", server.uri()), out.path())
        .await
        .expect("archive ok");
    assert_eq!(again.media.skipped, 3);
    assert_eq!(again.media.completed, 0);
    assert_eq!(again.resources.skipped, 1);
}

#[tokio::test]
async fn new_thread_archival_leaves_existing_folders_alone() {
    let server = site().await;
    let out = TempDir::new().unwrap();
    let archiver = archiver(&server);
    let url = format!("{}/thread/555/", server.uri());

    let first = archiver.archive_new_thread(&url, out.path()).await.unwrap();
    assert!(first.is_some());
    let second = archiver.archive_new_thread(&url, out.path()).await.unwrap();
    assert!(second.is_none());
}

async fn mount_listing(server: &MockServer) {
    let listing = format!(
        r#"<html><body><table class="thread_list">
        <tr><td><a href="/thread/1122323/">first</a></td><td>20/01/25</td></tr>
        <tr><td><a href="/thread/404/">missing</a></td><td>20/01/25</td></tr>
        <tr><td><a href="{}/thread/555/">second</a></td><td>21/01/25</td></tr>
        </table></body></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("tags", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing, "text/html"))
        .mount(server)
        .await;
}

/// Thread pages in the order the server saw them.
async fn thread_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .filter(|path| path.starts_with("/thread/"))
        .collect()
}

#[tokio::test]
async fn tag_archival_nests_threads_and_counts_failures() {
    let server = site().await;
    mount_listing(&server).await;

    let out = TempDir::new().unwrap();
    let report = archiver(&server)
        .archive_tag(8, None, TagOrder::OldestFirst, out.path())
        .await
        .expect("tag ok");

    assert_eq!(report.tag_dir, out.path().join("tag_8"));
    assert_eq!(report.threads_found, 3);
    assert_eq!(report.archived, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.media.completed, 6);
    assert!(out.path().join("tag_8/20.01.25_1122323/thread.html").is_file());
    assert!(out.path().join("tag_8/21.01.25_555/media/abc.jpg").is_file());
    assert_eq!(
        thread_requests(&server).await,
        vec!["/thread/1122323/", "/thread/404/", "/thread/555/"]
    );
}

#[tokio::test]
async fn tag_archival_can_start_from_the_newest_thread() {
    let server = site().await;
    mount_listing(&server).await;

    let out = TempDir::new().unwrap();
    let report = archiver(&server)
        .archive_tag(8, None, TagOrder::NewestFirst, out.path())
        .await
        .expect("tag ok");

    assert_eq!(report.archived, 2);
    assert_eq!(
        thread_requests(&server).await,
        vec!["/thread/555/", "/thread/404/", "/thread/1122323/"]
    );
    assert!(out.path().join("tag_8/21.01.25_555/thread.html").is_file());
    assert!(out.path().join("tag_8/20.01.25_1122323/thread.html").is_file());
}
