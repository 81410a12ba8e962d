//! Thread document transformer.
//!
//! Turns one live thread page into a self-contained copy: media and
//! page resources are collected as download lists and every reference to
//! them is repointed at `media/` or `resources/`. Structural edits go
//! through the parsed tree; only script-literal rewrites run on the
//! serialized text.

mod assets;
mod cleanup;
mod dom;
mod inline;

use std::sync::Arc;

use archiver_logging::archiver_debug;
use scraper::{ElementRef, Html};
use url::Url;

use crate::fetch::Fetcher;
use crate::filename::{media_filename, resource_filename};
use crate::page::fetch_html;
use crate::types::{ArchiveError, AssetKind, ResourceKind, TransformedThread};
use crate::urls::{is_chrome_asset, is_original_path, is_preview_path, is_storage_path, normalize_url, thread_id_from_url};

use assets::{AssetRegistry, ResourceRegistry};
use dom::{attr, has_rel, select_all, select_within, DomEdits};

pub const MEDIA_DIR: &str = "media";
pub const RESOURCES_DIR: &str = "resources";

const POST_TIME_SELECTOR: &str = "span.post_time";

#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Base for relative references on the page.
    pub domain: Url,
    /// Rewrite convertible images to their `.jpg` names.
    pub convert_images: bool,
}

pub struct ThreadTransformer {
    fetcher: Arc<dyn Fetcher>,
    options: TransformOptions,
}

impl ThreadTransformer {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: TransformOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub async fn transform(&self, url: &str) -> Result<TransformedThread, ArchiveError> {
        if thread_id_from_url(url).is_none() {
            return Err(ArchiveError::parse(url, "not a thread url"));
        }
        let html = fetch_html(self.fetcher.as_ref(), url).await?;
        rewrite_thread(&html, url, &self.options)
    }
}

/// Rewrite an already fetched thread page.
pub fn rewrite_thread(
    html: &str,
    page_url: &str,
    options: &TransformOptions,
) -> Result<TransformedThread, ArchiveError> {
    let thread_id = thread_id_from_url(page_url)
        .ok_or_else(|| ArchiveError::parse(page_url, "not a thread url"))?;
    let mut document = Html::parse_document(html);
    let domain = &options.domain;

    let posting_date = dom::first_text(&document, POST_TIME_SELECTOR).unwrap_or_default();
    let title = dom::first_text(&document, "title");

    let mut edits = DomEdits::default();
    for id in cleanup::tracking_scripts(&document) {
        edits.remove(id);
    }

    let resources = collect_resources(&document, domain, &mut edits);

    let mut registry = AssetRegistry::new(options.convert_images);
    collect_anchor_originals(&document, domain, &mut registry, &mut edits);
    for video in video_elements(&document) {
        if let Some(src) = video_source(video).filter(|src| is_storage_path(src)) {
            let name = media_filename(&normalize_url(src, domain));
            if AssetKind::from_filename(&name) == Some(AssetKind::Video) {
                registry.note_video(&name);
            }
        }
    }
    rewrite_images(&document, domain, &mut registry, &mut edits);
    collect_native_videos(&document, domain, &mut registry, &mut edits);

    for id in cleanup::offsite_elements(&document) {
        edits.remove(id);
    }
    edits.apply(&mut document);

    let serialized = document.html();
    for url in inline::expand_local_videos(&serialized) {
        registry.register_inline_video(&normalize_url(&url, domain));
    }
    let html = inline::blank_ajax_url(&serialized);
    let html = inline::rewrite_expand_local(&html, |url| {
        registry.inline_local_name(&normalize_url(url, domain))
    });

    let media = registry.into_media();
    archiver_debug!(
        "Thread {}: {} media, {} resources",
        thread_id,
        media.len(),
        resources.len()
    );

    Ok(TransformedThread {
        html,
        media,
        resources: resources.into_resources(),
        posting_date,
        thread_id,
        title,
    })
}

fn collect_resources(document: &Html, domain: &Url, edits: &mut DomEdits) -> ResourceRegistry {
    let mut resources = ResourceRegistry::default();

    for link in select_all(document, "link[href]") {
        if !has_rel(link, "stylesheet") {
            continue;
        }
        if let Some(href) = attr(link, "href") {
            let url = normalize_url(href, domain);
            let name = resource_filename(&url, ResourceKind::Stylesheet);
            let local = resources.register(url, &name, ResourceKind::Stylesheet);
            edits.set_attr(link.id(), "href", format!("{RESOURCES_DIR}/{local}"));
        }
    }

    for script in select_all(document, "script[src]") {
        if edits.is_removed(script.id()) {
            continue;
        }
        if let Some(src) = attr(script, "src") {
            let url = normalize_url(src, domain);
            let name = resource_filename(&url, ResourceKind::Script);
            let local = resources.register(url, &name, ResourceKind::Script);
            edits.set_attr(script.id(), "src", format!("{RESOURCES_DIR}/{local}"));
        }
    }

    resources
}

fn collect_anchor_originals(
    document: &Html,
    domain: &Url,
    registry: &mut AssetRegistry,
    edits: &mut DomEdits,
) {
    for anchor in select_all(document, "a[href]") {
        let Some(href) = attr(anchor, "href") else {
            continue;
        };
        if !is_original_path(href) {
            continue;
        }
        let url = normalize_url(href, domain);
        let name = media_filename(&url);
        let Some(kind) = AssetKind::from_filename(&name) else {
            continue;
        };
        let local = registry.register_original(url, &name, kind);
        edits.set_attr(anchor.id(), "href", format!("{MEDIA_DIR}/{local}"));
    }
}

fn rewrite_images(
    document: &Html,
    domain: &Url,
    registry: &mut AssetRegistry,
    edits: &mut DomEdits,
) {
    for image in select_all(document, "img") {
        let src = attr(image, "src");
        let data_src = attr(image, "data-src");
        let Some(reference) = src.or(data_src) else {
            continue;
        };
        if !is_storage_path(reference) || is_chrome_asset(reference) {
            continue;
        }

        let url = normalize_url(reference, domain);
        let name = media_filename(&url);
        let local = if is_preview_path(reference) {
            registry
                .video_thumbnail(&url, &name)
                .or_else(|| registry.original_named(&name))
        } else {
            registry.local_for_url(&url).or_else(|| {
                AssetKind::from_filename(&name)
                    .map(|kind| registry.register_original(url.clone(), &name, kind))
            })
        };

        if let Some(local) = local {
            let target = format!("{MEDIA_DIR}/{local}");
            if src.is_some() {
                edits.set_attr(image.id(), "src", target.clone());
            }
            if data_src.is_some() {
                edits.set_attr(image.id(), "data-src", target);
            }
        }
    }
}

fn video_elements(document: &Html) -> Vec<ElementRef<'_>> {
    select_all(document, "video")
}

/// `src` of the video itself, else of its first `<source>`.
fn video_source(video: ElementRef<'_>) -> Option<&str> {
    attr(video, "src").or_else(|| {
        select_within(video, "source[src]")
            .into_iter()
            .find_map(|source| attr(source, "src"))
    })
}

fn collect_native_videos(
    document: &Html,
    domain: &Url,
    registry: &mut AssetRegistry,
    edits: &mut DomEdits,
) {
    for video in video_elements(document) {
        let Some(reference) = video_source(video) else {
            continue;
        };
        if !is_storage_path(reference) {
            continue;
        }
        let url = normalize_url(reference, domain);
        let local = match registry.local_for_url(&url) {
            Some(local) => local,
            None => {
                let name = media_filename(&url);
                let Some(kind) = AssetKind::from_filename(&name) else {
                    continue;
                };
                registry.register_original(url.clone(), &name, kind)
            }
        };

        let target = format!("{MEDIA_DIR}/{local}");
        if attr(video, "src").is_some() {
            edits.set_attr(video.id(), "src", target.clone());
        }
        for source in select_within(video, "source[src]") {
            if attr(source, "src").is_some_and(|s| normalize_url(s, domain) == url) {
                edits.set_attr(source.id(), "src", target.clone());
            }
        }
    }
}
