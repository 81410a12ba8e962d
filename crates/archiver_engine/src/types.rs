use std::fmt;
use std::ops::AddAssign;
use std::path::PathBuf;

use crate::persist::PersistError;

/// Image extensions, lowercase, including the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];
/// Video extensions, lowercase, including the dot.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".avi"];
/// Attachment extensions that are archived verbatim.
pub const OTHER_EXTENSIONS: &[&str] = &[".pdf", ".zip", ".rar", ".7z"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Video,
    Other,
}

impl AssetKind {
    /// Classify a filename by its extension. Unknown extensions yield `None`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        let has = |table: &[&str]| table.iter().any(|ext| lower.ends_with(ext));
        if has(IMAGE_EXTENSIONS) {
            Some(AssetKind::Image)
        } else if has(VIDEO_EXTENSIONS) {
            Some(AssetKind::Video)
        } else if has(OTHER_EXTENSIONS) {
            Some(AssetKind::Other)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

impl ResourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "css",
            ResourceKind::Script => "js",
        }
    }
}

/// A media file referenced by a thread page.
///
/// `filename` is the name under the source extension; with conversion
/// enabled a convertible image lands on disk (and in the rewritten page)
/// under its `.jpg` variant, see [`MediaAsset::local_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub url: String,
    pub filename: String,
    pub kind: AssetKind,
}

impl MediaAsset {
    pub fn new(url: impl Into<String>, filename: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            kind,
        }
    }

    /// Name the rewritten document references and the engine persists.
    pub fn local_name(&self, convert_images: bool) -> String {
        match self.kind {
            AssetKind::Image if convert_images => crate::filename::jpeg_name(&self.filename),
            AssetKind::Image | AssetKind::Video | AssetKind::Other => self.filename.clone(),
        }
    }
}

/// A stylesheet or script the page needs to render offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAsset {
    pub url: String,
    pub filename: String,
    pub kind: ResourceKind,
}

impl From<&ResourceAsset> for MediaAsset {
    fn from(resource: &ResourceAsset) -> Self {
        // Resources are never transcoded; `Other` keeps them out of the image path.
        MediaAsset::new(resource.url.clone(), resource.filename.clone(), AssetKind::Other)
    }
}

/// One row of a tag listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub url: String,
    pub title: String,
    pub date: String,
    pub thread_id: String,
}

/// Order in which a tag's threads are archived. Listings run oldest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Output of the thread document transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedThread {
    pub html: String,
    pub media: Vec<MediaAsset>,
    pub resources: Vec<ResourceAsset>,
    pub posting_date: String,
    pub thread_id: String,
    pub title: Option<String>,
}

/// Per-batch download statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub converted: usize,
    pub retried: u64,
    pub total_bytes: u64,
}

impl AddAssign for DownloadStats {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.completed += other.completed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.converted += other.converted;
        self.retried += other.retried;
        self.total_bytes += other.total_bytes;
    }
}

/// Terminal state of a single asset within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { bytes: u64, converted: bool },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    pub filename: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A 404 is permanent; everything else is worth another attempt.
    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::HttpStatus(404)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure of a single thread or tag operation.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not parse {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("background task failed: {0}")]
    Join(String),
}

impl ArchiveError {
    pub(crate) fn parse(url: &str, reason: impl Into<String>) -> Self {
        ArchiveError::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Where a single archived thread ended up and what was downloaded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReport {
    pub thread_id: String,
    pub thread_dir: PathBuf,
    pub html_path: PathBuf,
    pub media: DownloadStats,
    pub resources: DownloadStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    pub tag_dir: PathBuf,
    pub threads_found: usize,
    pub archived: usize,
    pub failed: usize,
    pub media: DownloadStats,
}
