use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use archiver_core::{WatchEntry, WatchKind, WatchList};
use archiver_engine::{ensure_output_dir, tag_folder, Archiver, DownloadStats};
use archiver_logging::{archiver_error, archiver_info};

/// Newest threads of a watched tag that are looked at on each check.
pub const TAG_CHECK_THREADS: usize = 5;
const TAG_THREAD_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub failed: usize,
    pub new_threads: usize,
    pub media: DownloadStats,
}

#[derive(Debug, Default)]
struct EntryCheck {
    new_threads: usize,
    media: DownloadStats,
}

/// Check every active entry once, stamping `last_check` with `now()` on
/// success. Failures are logged and leave the stamp untouched.
pub async fn check_watch_list(
    archiver: &Archiver,
    list: &mut WatchList,
    output_dir: &Path,
    now: impl Fn() -> String,
) -> CheckSummary {
    let due: Vec<(usize, WatchEntry)> = list
        .active()
        .map(|(position, entry)| (position, entry.clone()))
        .collect();
    let mut summary = CheckSummary::default();

    for (index, (position, entry)) in due.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(archiver.config().page_delay).await;
        }
        archiver_info!("Checking {} ({} {})", entry.name, entry.kind, entry.id);

        let result = match entry.kind {
            WatchKind::Thread => check_thread(archiver, &entry, output_dir).await,
            WatchKind::Tag => check_tag(archiver, &entry, output_dir).await,
        };
        match result {
            Ok(found) => {
                summary.checked += 1;
                summary.new_threads += found.new_threads;
                summary.media += found.media;
                let _ = list.mark_checked(position, now());
            }
            Err(err) => {
                archiver_error!("Check of {} failed: {:#}", entry.name, err);
                summary.failed += 1;
            }
        }
    }
    summary
}

async fn check_thread(
    archiver: &Archiver,
    entry: &WatchEntry,
    output_dir: &Path,
) -> anyhow::Result<EntryCheck> {
    let report = archiver.archive_thread(&entry.url, output_dir).await?;
    if report.media.completed > 0 {
        archiver_info!("{}: {} new files", entry.name, report.media.completed);
    } else {
        archiver_info!("{}: no new files", entry.name);
    }
    Ok(EntryCheck {
        new_threads: 0,
        media: report.media,
    })
}

async fn check_tag(
    archiver: &Archiver,
    entry: &WatchEntry,
    output_dir: &Path,
) -> anyhow::Result<EntryCheck> {
    let tag_id: u64 = entry
        .id
        .parse()
        .with_context(|| format!("tag id {:?} is not a number", entry.id))?;
    let page = archiver.walker().list_page(tag_id, 0).await?;
    let mut found = EntryCheck::default();
    if page.threads.is_empty() {
        archiver_info!("{}: listing is empty", entry.name);
        return Ok(found);
    }

    let tag_dir = output_dir.join(tag_folder(tag_id));
    ensure_output_dir(&tag_dir)?;
    for (index, summary) in page.threads.iter().take(TAG_CHECK_THREADS).enumerate() {
        if index > 0 {
            tokio::time::sleep(TAG_THREAD_PAUSE).await;
        }
        match archiver.archive_new_thread(&summary.url, &tag_dir).await {
            Ok(Some(report)) => {
                found.new_threads += 1;
                found.media += report.media;
            }
            Ok(None) => {}
            Err(err) => archiver_error!("Thread {} failed: {}", summary.url, err),
        }
    }
    archiver_info!("{}: {} new threads", entry.name, found.new_threads);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use archiver_engine::{
        ArchiverConfig, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher,
    };

    use super::*;

    struct StubSite {
        pages: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl Fetcher for StubSite {
        async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
            let body = self
                .pages
                .get(url)
                .ok_or_else(|| FetchError::new(FailureKind::HttpStatus(404), "404 Not Found"))?;
            Ok(FetchOutput {
                bytes: body.as_bytes().to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    byte_len: body.len() as u64,
                },
            })
        }
    }

    fn thread_page(day: &str) -> String {
        format!(
            "<html><head><title>t</title></head><body>\
             <span class=\"post_time\">{day}/01/25 Пнд 16:33:14</span></body></html>"
        )
    }

    fn site() -> StubSite {
        let listing = r#"<html><body><table class="thread_list">
            <tr><th>title</th><th>date</th></tr>
            <tr><td><a href="/thread/11/">one</a></td><td>20/01/25</td></tr>
            <tr><td><a href="/thread/12/">two</a></td><td>21/01/25</td></tr>
            </table></body></html>"#;
        let pages = [
            ("https://arhivach.test/?tags=3", listing.to_string()),
            ("https://arhivach.test/thread/11/", thread_page("20")),
            ("https://arhivach.test/thread/12/", thread_page("21")),
            ("https://arhivach.test/thread/50/", thread_page("22")),
        ];
        StubSite {
            pages: pages
                .into_iter()
                .map(|(url, body)| (url.to_string(), body))
                .collect(),
        }
    }

    fn archiver() -> Archiver {
        let config = ArchiverConfig {
            domain: "https://arhivach.test".to_string(),
            page_delay: Duration::ZERO,
            ..ArchiverConfig::default()
        };
        Archiver::with_fetcher(config, Arc::new(site())).unwrap()
    }

    #[tokio::test]
    async fn tag_check_only_counts_unseen_threads() {
        let dir = tempfile::TempDir::new().unwrap();
        let archiver = archiver();
        let mut list = WatchList::from_entries([
            WatchEntry::new(WatchKind::Tag, "https://arhivach.test/?tags=3", "3", ""),
            WatchEntry::new(WatchKind::Thread, "https://arhivach.test/thread/50/", "50", ""),
        ]);

        let first = check_watch_list(&archiver, &mut list, dir.path(), || "stamp-1".into()).await;
        assert_eq!(first.checked, 2);
        assert_eq!(first.failed, 0);
        assert_eq!(first.new_threads, 2);
        assert!(dir.path().join("tag_3/20.01.25_11/thread.html").is_file());
        assert!(dir.path().join("22.01.25_50/thread.html").is_file());
        assert_eq!(list.get(1).unwrap().last_check.as_deref(), Some("stamp-1"));

        let second = check_watch_list(&archiver, &mut list, dir.path(), || "stamp-2".into()).await;
        assert_eq!(second.new_threads, 0);
        assert_eq!(list.get(2).unwrap().last_check.as_deref(), Some("stamp-2"));
    }

    #[tokio::test]
    async fn failures_and_paused_entries_are_not_stamped() {
        let dir = tempfile::TempDir::new().unwrap();
        let archiver = archiver();
        let mut list = WatchList::from_entries([
            WatchEntry::new(WatchKind::Thread, "https://arhivach.test/thread/99/", "99", ""),
            WatchEntry::new(WatchKind::Thread, "https://arhivach.test/thread/50/", "50", ""),
        ]);
        list.toggle(2).unwrap();

        let summary = check_watch_list(&archiver, &mut list, dir.path(), || "now".into()).await;
        assert_eq!(summary.checked, 0);
        assert_eq!(summary.failed, 1);
        assert!(list.entries().iter().all(|e| e.last_check.is_none()));
    }
}
