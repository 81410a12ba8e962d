use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Path marker shared by every uploaded file.
pub const STORAGE_MARKER: &str = "/storage/";
/// Path marker of reduced-size previews.
pub const PREVIEW_MARKER: &str = "/storage/t/";

static THREAD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/thread/(\d+)").expect("valid thread regex"));

/// Absolute form of `reference`, resolved against the site domain.
///
/// Protocol-relative references become `https:`; anything unparseable is
/// returned unchanged so the caller can still key on it.
pub fn normalize_url(reference: &str, domain: &Url) -> String {
    let trimmed = reference.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if let Ok(url) = Url::parse(trimmed) {
        return url.to_string();
    }
    match domain.join(trimmed) {
        Ok(url) => url.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Parse the configured domain; a bare host is treated as https.
pub fn parse_domain(domain: &str) -> Option<Url> {
    let trimmed = domain.trim();
    Url::parse(trimmed)
        .ok()
        .or_else(|| Url::parse(&format!("https://{trimmed}")).ok())
}

pub fn thread_id_from_url(url: &str) -> Option<String> {
    THREAD_ID.captures(url).map(|caps| caps[1].to_string())
}

pub fn is_storage_path(reference: &str) -> bool {
    reference.contains(STORAGE_MARKER)
}

pub fn is_preview_path(reference: &str) -> bool {
    reference.contains(PREVIEW_MARKER)
}

/// Full-resolution upload: under storage but not a preview.
pub fn is_original_path(reference: &str) -> bool {
    is_storage_path(reference) && !is_preview_path(reference)
}

/// Site chrome that lives next to uploads but is never thread content.
pub fn is_chrome_asset(reference: &str) -> bool {
    const CHROME: &[&str] = &["favicon", "logo", "icon", "avatar", "button"];
    CHROME.iter().any(|marker| reference.contains(marker))
}
