use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use archiver_engine::{
    clamp_concurrency, ArchiverConfig, AtomicFileWriter, FetchSettings, RetryPolicy,
    DEFAULT_JPEG_QUALITY, MAX_RETRIES_LIMIT,
};
use archiver_logging::{archiver_info, archiver_warn};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILENAME: &str = ".thread_archiver.ron";

/// User-editable settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub domain: String,
    pub output_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    pub timeout_secs: u64,
    pub page_delay_secs: f64,
    pub max_retries: u32,
    pub convert_images: bool,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        let config = ArchiverConfig::default();
        Self {
            domain: config.domain,
            output_dir: config.output_dir,
            max_concurrent_downloads: config.max_concurrent_downloads,
            timeout_secs: config.fetch.request_timeout.as_secs(),
            page_delay_secs: config.page_delay.as_secs_f64(),
            max_retries: config.retry.max_attempts,
            convert_images: config.convert_images,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Settings {
    /// Settings with every value pulled into its accepted range.
    pub fn clamped(mut self) -> Self {
        self.max_concurrent_downloads = clamp_concurrency(self.max_concurrent_downloads);
        self.max_retries = self.max_retries.clamp(1, MAX_RETRIES_LIMIT);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.timeout_secs = self.timeout_secs.max(1);
        if !self.page_delay_secs.is_finite() || self.page_delay_secs < 0.0 {
            self.page_delay_secs = Settings::default().page_delay_secs;
        }
        self
    }

    pub fn to_config(&self) -> ArchiverConfig {
        let defaults = ArchiverConfig::default();
        ArchiverConfig {
            domain: self.domain.clone(),
            output_dir: self.output_dir.clone(),
            max_concurrent_downloads: self.max_concurrent_downloads,
            fetch: FetchSettings {
                request_timeout: Duration::from_secs(self.timeout_secs),
                ..FetchSettings::default()
            },
            retry: RetryPolicy::new(self.max_retries, defaults.retry.base_delay),
            page_delay: Duration::try_from_secs_f64(self.page_delay_secs)
                .unwrap_or(defaults.page_delay),
            convert_images: self.convert_images,
            jpeg_quality: self.jpeg_quality,
        }
        .normalized()
    }
}

/// Read saved settings; a missing or unreadable file yields defaults.
pub fn load_settings(path: &Path) -> Settings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Settings::default();
        }
        Err(err) => {
            archiver_warn!("Failed to read settings from {:?}: {}", path, err);
            return Settings::default();
        }
    };

    match ron::from_str::<Settings>(&content) {
        Ok(settings) => settings.clamped(),
        Err(err) => {
            archiver_warn!("Failed to parse settings from {:?}: {}", path, err);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(settings, pretty).context("serializing settings")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(SETTINGS_FILENAME);
    AtomicFileWriter::new(dir)
        .write(filename, &content)
        .with_context(|| format!("writing settings to {}", path.display()))?;
    archiver_info!("Saved settings to {:?}", path);
    Ok(())
}
