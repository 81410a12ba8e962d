use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchSettings;
use crate::retry::RetryPolicy;
use crate::transcode::DEFAULT_JPEG_QUALITY;

pub const DEFAULT_DOMAIN: &str = "https://arhivach.vc";
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const MAX_CONCURRENCY: usize = 30;

/// Everything the archiver needs, fixed for the lifetime of one archiver.
///
/// Editing settings means building a new value and a new archiver from it.
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    pub domain: String,
    pub output_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
    /// Pause between listing pages and between threads of one tag.
    pub page_delay: Duration,
    pub convert_images: bool,
    pub jpeg_quality: u8,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_concurrent_downloads: DEFAULT_CONCURRENCY,
            fetch: FetchSettings::default(),
            retry: RetryPolicy::default(),
            page_delay: Duration::from_secs(1),
            convert_images: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ArchiverConfig {
    /// Copy with every numeric setting pulled into its supported range and
    /// the domain stripped of trailing slashes.
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_downloads = clamp_concurrency(self.max_concurrent_downloads);
        self.retry = RetryPolicy::new(self.retry.max_attempts, self.retry.base_delay);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        let trimmed = self.domain.trim().trim_end_matches('/');
        self.domain = trimmed.to_string();
        self
    }
}

pub fn clamp_concurrency(limit: usize) -> usize {
    limit.clamp(1, MAX_CONCURRENCY)
}
