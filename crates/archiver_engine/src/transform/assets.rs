use std::collections::{HashMap, HashSet};

use crate::filename::{disambiguate, file_stem, jpeg_name, media_filename};
use crate::types::{AssetKind, MediaAsset, ResourceAsset, ResourceKind};

const THUMB_SUFFIX: &str = ".thumb";

/// Media collected while walking one thread page.
///
/// Keys are normalized URLs. Ownership is tracked on the name an asset can
/// occupy on disk (an image claims its `.jpg` variant whether or not
/// conversion is on), and a claim already held by a different URL is
/// renamed so that every asset lands on its own path.
#[derive(Debug)]
pub(crate) struct AssetRegistry {
    convert_images: bool,
    media: Vec<MediaAsset>,
    by_url: HashMap<String, usize>,
    name_owners: HashMap<String, String>,
    originals_by_name: HashMap<String, usize>,
    video_stems: HashSet<String>,
}

impl AssetRegistry {
    pub(crate) fn new(convert_images: bool) -> Self {
        Self {
            convert_images,
            media: Vec::new(),
            by_url: HashMap::new(),
            name_owners: HashMap::new(),
            originals_by_name: HashMap::new(),
            video_stems: HashSet::new(),
        }
    }

    fn insert(&mut self, url: String, source_name: &str, kind: AssetKind) -> usize {
        if let Some(&index) = self.by_url.get(&url) {
            return index;
        }
        let filename = match self.name_owners.get(&disk_claim(source_name, kind)) {
            Some(owner) if owner != &url => disambiguate(source_name, &url),
            _ => source_name.to_string(),
        };
        let index = self.media.len();
        self.name_owners
            .insert(disk_claim(&filename, kind), url.clone());
        self.by_url.insert(url.clone(), index);
        self.media.push(MediaAsset::new(url, filename, kind));
        index
    }

    fn local_name_at(&self, index: usize) -> String {
        self.media[index].local_name(self.convert_images)
    }

    /// Register a full-resolution file and return its local name.
    pub(crate) fn register_original(
        &mut self,
        url: String,
        source_name: &str,
        kind: AssetKind,
    ) -> String {
        let index = self.insert(url, source_name, kind);
        self.originals_by_name
            .entry(source_name.to_string())
            .or_insert(index);
        if kind == AssetKind::Video {
            self.video_stems.insert(file_stem(source_name).to_string());
        }
        self.local_name_at(index)
    }

    /// Make `filename` (a video) eligible for thumbnail matching without
    /// registering it.
    pub(crate) fn note_video(&mut self, filename: &str) {
        self.video_stems.insert(file_stem(filename).to_string());
    }

    pub(crate) fn local_for_url(&self, url: &str) -> Option<String> {
        self.by_url.get(url).map(|&index| self.local_name_at(index))
    }

    /// Local name of the original sharing a preview's filename.
    pub(crate) fn original_named(&self, preview_name: &str) -> Option<String> {
        self.originals_by_name
            .get(preview_name)
            .map(|&index| self.local_name_at(index))
    }

    /// For a `<hash>[.ext].thumb` preview of a known video, register the
    /// preview as `<hash>_thumb.jpg` and return that name.
    pub(crate) fn video_thumbnail(&mut self, preview_url: &str, preview_name: &str) -> Option<String> {
        let stem = preview_name.strip_suffix(THUMB_SUFFIX)?;
        let hash = [stem, file_stem(stem)]
            .into_iter()
            .find(|candidate| self.video_stems.contains(*candidate))?
            .to_string();
        let thumb_name = format!("{hash}_thumb.jpg");
        if !self.name_owners.contains_key(&thumb_name) {
            let index = self.media.len();
            self.name_owners
                .insert(thumb_name.clone(), preview_url.to_string());
            self.by_url.entry(preview_url.to_string()).or_insert(index);
            self.media.push(MediaAsset::new(
                preview_url,
                thumb_name.clone(),
                AssetKind::Image,
            ));
        }
        Some(thumb_name)
    }

    /// Video referenced only from inline script; keyed by its URL tail.
    pub(crate) fn register_inline_video(&mut self, url: &str) {
        let filename = media_filename(url);
        if self.by_url.contains_key(url) || self.media.iter().any(|m| m.filename == filename) {
            return;
        }
        self.insert(url.to_string(), &filename, AssetKind::Video);
    }

    /// Local name an inline player reference should point at.
    pub(crate) fn inline_local_name(&self, url: &str) -> String {
        self.local_for_url(url)
            .unwrap_or_else(|| media_filename(url))
    }

    pub(crate) fn into_media(self) -> Vec<MediaAsset> {
        self.media
    }
}

/// Name an asset may end up under: images can be saved as their `.jpg`
/// variant, and a present `.jpg` also satisfies the original on the next run.
fn disk_claim(filename: &str, kind: AssetKind) -> String {
    match kind {
        AssetKind::Image => jpeg_name(filename),
        AssetKind::Video | AssetKind::Other => filename.to_string(),
    }
}

/// Stylesheets and scripts collected from one page.
#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    resources: Vec<ResourceAsset>,
    by_url: HashMap<String, usize>,
    name_owners: HashMap<String, String>,
}

impl ResourceRegistry {
    /// Register a resource and return its local filename.
    pub(crate) fn register(&mut self, url: String, source_name: &str, kind: ResourceKind) -> String {
        if let Some(&index) = self.by_url.get(&url) {
            return self.resources[index].filename.clone();
        }
        let filename = match self.name_owners.get(source_name) {
            Some(owner) if owner != &url => disambiguate(source_name, &url),
            _ => source_name.to_string(),
        };
        self.name_owners.insert(filename.clone(), url.clone());
        self.by_url.insert(url.clone(), self.resources.len());
        self.resources.push(ResourceAsset {
            url,
            filename: filename.clone(),
            kind,
        });
        filename
    }

    pub(crate) fn len(&self) -> usize {
        self.resources.len()
    }

    pub(crate) fn into_resources(self) -> Vec<ResourceAsset> {
        self.resources
    }
}
