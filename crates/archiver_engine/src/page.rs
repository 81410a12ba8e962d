use archiver_logging::{archiver_debug, archiver_warn};

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::types::ArchiveError;

const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Fetch a page and decode it to UTF-8. Pages are not retried; a failed
/// page fails the thread or listing that needed it.
pub async fn fetch_html(fetcher: &dyn Fetcher, url: &str) -> Result<String, ArchiveError> {
    archiver_debug!("Fetching page {}", url);
    let output = fetcher.fetch(url).await?;
    let content_type = output.metadata.content_type.as_deref();

    if let Some(content_type) = content_type {
        if !is_html(content_type) {
            return Err(ArchiveError::parse(
                url,
                format!("expected an html page, got {content_type}"),
            ));
        }
    }

    let decoded = decode_html(&output.bytes, content_type);
    if decoded.had_errors {
        archiver_warn!(
            "Page {} had malformed {} sequences; replaced",
            url,
            decoded.encoding_label
        );
    }
    Ok(decoded.html)
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}
