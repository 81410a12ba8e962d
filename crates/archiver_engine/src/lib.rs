//! Archiver engine: page transformation, listing walks and the bounded
//! download pipeline, plus the orchestrator that lays archives out on disk.
mod archive;
mod config;
mod decode;
mod download;
mod fetch;
mod filename;
mod listing;
mod page;
mod persist;
mod retry;
mod transcode;
mod transform;
mod types;
mod urls;

pub use archive::{tag_folder, thread_folder, Archiver, THREAD_HTML};
pub use config::{
    clamp_concurrency, ArchiverConfig, DEFAULT_CONCURRENCY, DEFAULT_DOMAIN, DEFAULT_OUTPUT_DIR,
    MAX_CONCURRENCY,
};
pub use decode::{decode_html, DecodedHtml};
pub use download::{DownloadEngine, ProgressSink};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use filename::{
    existing_variant, is_convertible, jpeg_name, media_filename, resource_filename,
    sanitize_folder_name, thread_folder_name, CONVERTIBLE_EXTENSIONS,
};
pub use listing::{page_offset, parse_tag_page, tag_page_url, TagPage, TagWalker, THREADS_PER_PAGE};
pub use page::fetch_html;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retry::{
    DownloadFailure, Downloaded, FailedDownload, RetryPolicy, RetryingDownloader,
    MAX_RETRIES_LIMIT,
};
pub use transcode::{ImageTranscoder, TranscodeError, DEFAULT_JPEG_QUALITY};
pub use transform::{rewrite_thread, ThreadTransformer, TransformOptions, MEDIA_DIR, RESOURCES_DIR};
pub use types::{
    ArchiveError, AssetKind, DownloadEvent, DownloadStats, FailureKind, FetchError, FetchMetadata,
    FetchOutput, ItemOutcome, MediaAsset, ResourceAsset, ResourceKind, TagOrder, TagReport, ThreadReport,
    ThreadSummary, TransformedThread, IMAGE_EXTENSIONS, OTHER_EXTENSIONS, VIDEO_EXTENSIONS,
};
pub use urls::{normalize_url, parse_domain, thread_id_from_url};
