//! Text-level passes over the serialized document. Inline player calls and
//! the live-update endpoint live inside script bodies and attribute values,
//! where the tree gives no structure to work with.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static EXPAND_LOCAL_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)expand_local\([^,]+,'(https?://[^']+\.(?:mp4|webm|mov))'")
        .expect("valid expand_local regex")
});

static EXPAND_LOCAL_STORAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(expand_local\([^,]+,')(https?://[^']+/storage/[^']+)('[^)]*\))")
        .expect("valid expand_local rewrite regex")
});

static AJAX_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var ajax_url\s*=\s*'[^']*'").expect("valid ajax_url regex")
});

/// Video URLs passed to the inline player, in document order.
pub(crate) fn expand_local_videos(html: &str) -> Vec<String> {
    EXPAND_LOCAL_VIDEO
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Point every inline player call at `media/<local name>`.
pub(crate) fn rewrite_expand_local(html: &str, local_name: impl Fn(&str) -> String) -> String {
    EXPAND_LOCAL_STORAGE
        .replace_all(html, |caps: &Captures| {
            format!("{}media/{}{}", &caps[1], local_name(&caps[2]), &caps[3])
        })
        .into_owned()
}

/// Stop the offline page from polling the live site for new posts.
pub(crate) fn blank_ajax_url(html: &str) -> String {
    AJAX_URL.replace_all(html, "var ajax_url = ''").into_owned()
}
