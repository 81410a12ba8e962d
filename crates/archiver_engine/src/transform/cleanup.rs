use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use super::dom::{attr, has_rel, select_all};

const TRACKER_SOURCES: &[&str] = &["google", "yandex", "counter", "analytics", "cloudflare"];
const TRACKER_INLINE: &[&str] = &["GoogleAnalyticsObject", "google-analytics", "ga('create'"];

/// Scripts that only report visits somewhere; removed and never downloaded.
pub(crate) fn tracking_scripts(document: &Html) -> Vec<NodeId> {
    select_all(document, "script")
        .into_iter()
        .filter(|script| is_tracking_script(*script))
        .map(|script| script.id())
        .collect()
}

fn is_tracking_script(script: ElementRef) -> bool {
    if let Some(src) = attr(script, "src") {
        let src = src.to_ascii_lowercase();
        return TRACKER_SOURCES.iter().any(|marker| src.contains(marker));
    }
    let body: String = script.text().collect();
    TRACKER_INLINE.iter().any(|marker| body.contains(marker))
}

/// Elements that point the offline copy back at the live site: frames,
/// favicons, onion/canonical hints and `<base>`.
pub(crate) fn offsite_elements(document: &Html) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = select_all(document, "iframe")
        .into_iter()
        .map(|el| el.id())
        .collect();

    ids.extend(
        select_all(document, "link[rel]")
            .into_iter()
            .filter(|link| has_rel(*link, "icon") || has_rel(*link, "canonical"))
            .map(|link| link.id()),
    );

    ids.extend(
        select_all(document, "meta[http-equiv]")
            .into_iter()
            .filter(|meta| {
                meta.value()
                    .attr("http-equiv")
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("onion-location"))
            })
            .map(|meta| meta.id()),
    );

    ids.extend(select_all(document, "head base").into_iter().map(|b| b.id()));
    ids
}
