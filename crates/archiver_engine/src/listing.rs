use std::sync::{Arc, LazyLock};
use std::time::Duration;

use archiver_logging::{archiver_debug, archiver_info, archiver_warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::Fetcher;
use crate::page::fetch_html;
use crate::types::{ArchiveError, ThreadSummary};
use crate::urls::{normalize_url, thread_id_from_url};

/// Threads per listing page; page N starts at offset `(N - 1) * 25`.
pub const THREADS_PER_PAGE: usize = 25;
const TITLE_MAX_CHARS: usize = 100;

static THREAD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/thread/\d+").expect("valid thread link regex"));
static INDEX_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/index/(\d+)/").expect("valid index offset regex"));
static TAG_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]tags=(\d+)").expect("valid tags regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPage {
    pub threads: Vec<ThreadSummary>,
    /// Highest page number the pagination links mention, at least 1.
    pub total_pages: usize,
}

/// Listing location for `offset`: the bare tag query for the first page,
/// the indexed path for the rest.
pub fn tag_page_url(domain: &Url, tag_id: u64, offset: usize) -> String {
    let base = domain.as_str().trim_end_matches('/');
    if offset == 0 {
        format!("{base}/?tags={tag_id}")
    } else {
        format!("{base}/index/{offset}/?tags={tag_id}")
    }
}

pub fn page_offset(page: usize) -> usize {
    page.saturating_sub(1) * THREADS_PER_PAGE
}

pub fn parse_tag_page(html: &str, tag_id: u64, domain: &Url) -> TagPage {
    let document = Html::parse_document(html);
    TagPage {
        threads: parse_threads(&document, domain),
        total_pages: infer_total_pages(&document, tag_id),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_threads(document: &Html, domain: &Url) -> Vec<ThreadSummary> {
    let (Some(listing), Some(any_table), Some(row_sel), Some(th_sel), Some(td_sel), Some(a_sel)) = (
        selector("table.thread_list"),
        selector("table"),
        selector("tr"),
        selector("th"),
        selector("td"),
        selector("a[href]"),
    ) else {
        return Vec::new();
    };

    let Some(table) = document
        .select(&listing)
        .next()
        .or_else(|| document.select(&any_table).next())
    else {
        return Vec::new();
    };

    let mut threads = Vec::new();
    for row in table.select(&row_sel) {
        if row.select(&th_sel).next().is_some() {
            continue;
        }
        let cells: Vec<ElementRef> = row.select(&td_sel).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(link) = row.select(&a_sel).find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| THREAD_LINK.is_match(href))
        }) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = normalize_url(href, domain);
        let Some(thread_id) = thread_id_from_url(&url) else {
            continue;
        };
        let date = cells.last().map(|cell| stripped_text(*cell)).unwrap_or_default();
        threads.push(ThreadSummary {
            title: stripped_text(link).chars().take(TITLE_MAX_CHARS).collect(),
            url,
            date,
            thread_id,
        });
    }
    threads
}

fn infer_total_pages(document: &Html, tag_id: u64) -> usize {
    let Some(anchors) = selector("a[href]") else {
        return 1;
    };
    document
        .select(&anchors)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let links_tag = TAG_PARAM
                .captures(href)
                .is_some_and(|caps| caps[1].parse::<u64>().ok() == Some(tag_id));
            if !links_tag {
                return None;
            }
            if let Some(caps) = INDEX_OFFSET.captures(href) {
                let offset: usize = caps[1].parse().ok()?;
                return Some(offset / THREADS_PER_PAGE + 1);
            }
            let label = stripped_text(anchor);
            if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
                return label.parse().ok();
            }
            None
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Reads tag listings page by page.
pub struct TagWalker {
    fetcher: Arc<dyn Fetcher>,
    domain: Url,
    page_delay: Duration,
}

impl TagWalker {
    pub fn new(fetcher: Arc<dyn Fetcher>, domain: Url, page_delay: Duration) -> Self {
        Self {
            fetcher,
            domain,
            page_delay,
        }
    }

    pub fn domain(&self) -> &Url {
        &self.domain
    }

    pub async fn list_page(&self, tag_id: u64, offset: usize) -> Result<TagPage, ArchiveError> {
        let url = tag_page_url(&self.domain, tag_id, offset);
        let html = fetch_html(self.fetcher.as_ref(), &url).await?;
        let page = parse_tag_page(&html, tag_id, &self.domain);
        archiver_debug!(
            "Tag {} offset {}: {} threads, {} pages",
            tag_id,
            offset,
            page.threads.len(),
            page.total_pages
        );
        Ok(page)
    }

    /// Every thread under the tag, first page first. `max_pages` of `None`
    /// or `Some(0)` walks everything the first page advertises.
    pub async fn list_all(
        &self,
        tag_id: u64,
        max_pages: Option<usize>,
    ) -> Result<Vec<ThreadSummary>, ArchiveError> {
        let first = self.list_page(tag_id, 0).await?;
        let last_page = match max_pages.filter(|&limit| limit > 0) {
            Some(limit) => first.total_pages.min(limit),
            None => first.total_pages,
        };
        archiver_info!(
            "Tag {}: {} pages advertised, reading {}",
            tag_id,
            first.total_pages,
            last_page
        );

        let mut threads = first.threads;
        for page in 2..=last_page {
            tokio::time::sleep(self.page_delay).await;
            match self.list_page(tag_id, page_offset(page)).await {
                Ok(listing) if listing.threads.is_empty() => {
                    archiver_debug!("Tag {} page {} is empty", tag_id, page);
                }
                Ok(listing) => threads.extend(listing.threads),
                Err(err) => {
                    archiver_warn!("Skipping tag {} page {}: {}", tag_id, page, err);
                }
            }
        }
        Ok(threads)
    }
}
