use std::path::Path;
use std::sync::Arc;

use archiver_logging::{archiver_debug, archiver_error, archiver_info, archiver_warn};
use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::config::clamp_concurrency;
use crate::filename::{existing_variant, is_convertible, jpeg_name};
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::retry::RetryingDownloader;
use crate::transcode::ImageTranscoder;
use crate::types::{AssetKind, DownloadEvent, DownloadStats, ItemOutcome, MediaAsset, ResourceAsset};

/// Receives one event per asset as it reaches its terminal outcome.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

struct ItemReport {
    outcome: ItemOutcome,
    retries: u32,
}

/// Downloads batches of named assets with a cap on transfers in flight.
pub struct DownloadEngine {
    downloader: RetryingDownloader,
    transcoder: Option<ImageTranscoder>,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl DownloadEngine {
    /// `transcoder` of `None` disables image conversion.
    pub fn new(downloader: RetryingDownloader, transcoder: Option<ImageTranscoder>) -> Self {
        Self {
            downloader,
            transcoder,
            sink: None,
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn converts_images(&self) -> bool {
        self.transcoder.is_some()
    }

    pub fn downloader(&self) -> &RetryingDownloader {
        &self.downloader
    }

    /// Download every asset into `output_dir`. Returns once each asset is
    /// completed, skipped or failed.
    pub async fn download_batch(
        &self,
        assets: &[MediaAsset],
        output_dir: &Path,
        concurrency_limit: usize,
    ) -> DownloadStats {
        self.run_batch(assets, output_dir, concurrency_limit, self.transcoder)
            .await
    }

    /// Page resources: same rules, never transcoded.
    pub async fn download_resources(
        &self,
        resources: &[ResourceAsset],
        output_dir: &Path,
        concurrency_limit: usize,
    ) -> DownloadStats {
        let assets: Vec<MediaAsset> = resources.iter().map(MediaAsset::from).collect();
        self.run_batch(&assets, output_dir, concurrency_limit, None)
            .await
    }

    async fn run_batch(
        &self,
        assets: &[MediaAsset],
        output_dir: &Path,
        concurrency_limit: usize,
        transcoder: Option<ImageTranscoder>,
    ) -> DownloadStats {
        let mut stats = DownloadStats {
            total: assets.len(),
            ..DownloadStats::default()
        };
        if assets.is_empty() {
            return stats;
        }
        if let Err(err) = ensure_output_dir(output_dir) {
            archiver_error!("Cannot use {}: {}", output_dir.display(), err);
            stats.failed = assets.len();
            return stats;
        }

        let slots = Semaphore::new(clamp_concurrency(concurrency_limit));
        let writer = AtomicFileWriter::new(output_dir.to_path_buf());
        let reports = join_all(
            assets
                .iter()
                .map(|asset| self.download_one(asset, output_dir, &slots, &writer, transcoder)),
        )
        .await;

        for report in reports {
            stats.retried += u64::from(report.retries);
            match report.outcome {
                ItemOutcome::Completed { bytes, converted } => {
                    stats.completed += 1;
                    stats.total_bytes += bytes;
                    if converted {
                        stats.converted += 1;
                    }
                }
                ItemOutcome::Skipped => stats.skipped += 1,
                ItemOutcome::Failed { .. } => stats.failed += 1,
            }
        }

        archiver_info!(
            "{}: {} completed, {} skipped, {} failed of {}",
            output_dir.display(),
            stats.completed,
            stats.skipped,
            stats.failed,
            stats.total
        );
        stats
    }

    async fn download_one(
        &self,
        asset: &MediaAsset,
        output_dir: &Path,
        slots: &Semaphore,
        writer: &AtomicFileWriter,
        transcoder: Option<ImageTranscoder>,
    ) -> ItemReport {
        if let Some(existing) = existing_variant(output_dir, &asset.filename) {
            archiver_debug!("{} already present", existing.display());
            return self.finish(asset, ItemOutcome::Skipped, 0);
        }

        let Ok(_permit) = slots.acquire().await else {
            return self.failed(asset, "download slots closed".to_string(), 0);
        };

        let downloaded = match self.downloader.fetch(&asset.url).await {
            Ok(downloaded) => downloaded,
            Err(failed) => {
                let retries = failed.retries();
                return self.failed(asset, failed.failure.to_string(), retries);
            }
        };
        let retries = downloaded.retries();

        let transcoder =
            transcoder.filter(|_| asset.kind == AssetKind::Image && is_convertible(&asset.filename));
        let (bytes, converted, filename) = match transcoder {
            Some(transcoder) => {
                let raw = downloaded.bytes;
                let result = tokio::task::spawn_blocking(move || transcoder.to_jpeg(raw)).await;
                match result {
                    Ok((bytes, converted)) => {
                        if !converted {
                            archiver_debug!("{} saved unconverted", asset.url);
                        }
                        (bytes, converted, jpeg_name(&asset.filename))
                    }
                    Err(err) => return self.failed(asset, format!("transcode task: {err}"), retries),
                }
            }
            None => (downloaded.bytes, false, asset.filename.clone()),
        };

        let byte_len = bytes.len() as u64;
        let writer = writer.clone();
        let target = filename.clone();
        let written =
            tokio::task::spawn_blocking(move || writer.write_bytes(&target, &bytes)).await;
        match written {
            Ok(Ok(path)) => {
                archiver_debug!("Saved {} ({} bytes)", path.display(), byte_len);
                self.finish(
                    asset,
                    ItemOutcome::Completed {
                        bytes: byte_len,
                        converted,
                    },
                    retries,
                )
            }
            Ok(Err(err)) => self.failed(asset, err.to_string(), retries),
            Err(err) => self.failed(asset, format!("write task: {err}"), retries),
        }
    }

    fn failed(&self, asset: &MediaAsset, reason: String, retries: u32) -> ItemReport {
        archiver_warn!("Failed {}: {}", asset.url, reason);
        self.finish(asset, ItemOutcome::Failed { reason }, retries)
    }

    fn finish(&self, asset: &MediaAsset, outcome: ItemOutcome, retries: u32) -> ItemReport {
        if let Some(sink) = &self.sink {
            sink.emit(DownloadEvent {
                filename: asset.filename.clone(),
                outcome: outcome.clone(),
            });
        }
        ItemReport { outcome, retries }
    }
}
