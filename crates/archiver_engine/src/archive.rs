use std::path::{Path, PathBuf};
use std::sync::Arc;

use archiver_logging::{archiver_debug, archiver_error, archiver_info};

use crate::config::ArchiverConfig;
use crate::download::{DownloadEngine, ProgressSink};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::filename::{sanitize_folder_name, thread_folder_name};
use crate::listing::TagWalker;
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::retry::RetryingDownloader;
use crate::transcode::ImageTranscoder;
use crate::transform::{ThreadTransformer, TransformOptions, MEDIA_DIR, RESOURCES_DIR};
use crate::types::{ArchiveError, TagOrder, TagReport, ThreadReport, TransformedThread};
use crate::urls::parse_domain;

pub const THREAD_HTML: &str = "thread.html";

/// Folder a transformed thread is saved under.
pub fn thread_folder(thread: &TransformedThread) -> String {
    sanitize_folder_name(&thread_folder_name(&thread.posting_date, &thread.thread_id))
}

pub fn tag_folder(tag_id: u64) -> String {
    format!("tag_{tag_id}")
}

/// Drives transformer, walker and download engine over the on-disk layout
/// `<base>/<DD.MM.YY_id>/{thread.html,media/,resources/}`.
pub struct Archiver {
    config: ArchiverConfig,
    transformer: ThreadTransformer,
    walker: TagWalker,
    engine: DownloadEngine,
}

impl Archiver {
    pub fn new(config: ArchiverConfig) -> Result<Self, ArchiveError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_fetcher(config: ArchiverConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, ArchiveError> {
        let config = config.normalized();
        let domain = parse_domain(&config.domain)
            .ok_or_else(|| ArchiveError::parse(&config.domain, "invalid domain"))?;

        let transformer = ThreadTransformer::new(
            fetcher.clone(),
            TransformOptions {
                domain: domain.clone(),
                convert_images: config.convert_images,
            },
        );
        let walker = TagWalker::new(fetcher.clone(), domain, config.page_delay);
        let transcoder = config
            .convert_images
            .then(|| ImageTranscoder::new(config.jpeg_quality));
        let engine = DownloadEngine::new(RetryingDownloader::new(fetcher, config.retry), transcoder);

        Ok(Self {
            config,
            transformer,
            walker,
            engine,
        })
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.engine = self.engine.with_progress(sink);
        self
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    pub fn transformer(&self) -> &ThreadTransformer {
        &self.transformer
    }

    pub fn walker(&self) -> &TagWalker {
        &self.walker
    }

    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// Archive one thread under `base_dir`. Existing files are kept, so
    /// running this again only fetches what is new.
    pub async fn archive_thread(&self, url: &str, base_dir: &Path) -> Result<ThreadReport, ArchiveError> {
        let thread = self.transformer.transform(url).await?;
        let thread_dir = base_dir.join(thread_folder(&thread));
        self.persist_thread(thread, thread_dir).await
    }

    /// Like [`Archiver::archive_thread`], but `None` when the thread's folder
    /// already exists.
    pub async fn archive_new_thread(
        &self,
        url: &str,
        base_dir: &Path,
    ) -> Result<Option<ThreadReport>, ArchiveError> {
        let thread = self.transformer.transform(url).await?;
        let thread_dir = base_dir.join(thread_folder(&thread));
        if thread_dir.exists() {
            archiver_debug!("{} already archived", thread_dir.display());
            return Ok(None);
        }
        self.persist_thread(thread, thread_dir).await.map(Some)
    }

    async fn persist_thread(
        &self,
        thread: TransformedThread,
        thread_dir: PathBuf,
    ) -> Result<ThreadReport, ArchiveError> {
        let media_dir = thread_dir.join(MEDIA_DIR);
        let resources_dir = thread_dir.join(RESOURCES_DIR);
        for dir in [&thread_dir, &media_dir, &resources_dir] {
            ensure_output_dir(dir)?;
        }
        archiver_info!(
            "Archiving thread {} into {}",
            thread.thread_id,
            thread_dir.display()
        );

        let limit = self.config.max_concurrent_downloads;
        let resources = self
            .engine
            .download_resources(&thread.resources, &resources_dir, limit)
            .await;

        let writer = AtomicFileWriter::new(thread_dir.clone());
        let html = thread.html;
        let html_path = tokio::task::spawn_blocking(move || writer.write(THREAD_HTML, &html))
            .await
            .map_err(|err| ArchiveError::Join(err.to_string()))??;

        let media = self
            .engine
            .download_batch(&thread.media, &media_dir, limit)
            .await;

        Ok(ThreadReport {
            thread_id: thread.thread_id,
            thread_dir,
            html_path,
            media,
            resources,
        })
    }

    /// Archive every thread listed under `tag_id` into `<base>/tag_<id>/`,
    /// in `order`. A thread that fails is counted and logged; the run goes on.
    pub async fn archive_tag(
        &self,
        tag_id: u64,
        max_pages: Option<usize>,
        order: TagOrder,
        base_dir: &Path,
    ) -> Result<TagReport, ArchiveError> {
        let mut threads = self.walker.list_all(tag_id, max_pages).await?;
        if order == TagOrder::NewestFirst {
            threads.reverse();
        }
        let mut report = TagReport {
            tag_dir: base_dir.join(tag_folder(tag_id)),
            threads_found: threads.len(),
            ..TagReport::default()
        };
        if threads.is_empty() {
            archiver_info!("Tag {} lists no threads", tag_id);
            return Ok(report);
        }
        ensure_output_dir(&report.tag_dir)?;

        for (index, summary) in threads.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.page_delay).await;
            }
            archiver_info!(
                "[{}/{}] {} {}",
                index + 1,
                threads.len(),
                summary.thread_id,
                summary.title
            );
            match self.archive_thread(&summary.url, &report.tag_dir).await {
                Ok(thread) => {
                    report.archived += 1;
                    report.media += thread.media;
                }
                Err(err) => {
                    archiver_error!("Thread {} failed: {}", summary.url, err);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
