use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "thread-archiver",
    version,
    about = "Save imageboard threads and their media for offline reading"
)]
pub struct Cli {
    /// Output directory (overrides the saved setting for this run).
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Site base URL (overrides the saved setting for this run).
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Parallel downloads, 1-30 (overrides the saved setting for this run).
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Log debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to a file, `./thread_archiver.log` when no path is given.
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        default_missing_value = archiver_logging::DEFAULT_LOG_FILE
    )]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Archive a single thread.
    Thread { url: String },
    /// Archive every thread listed under a tag.
    Tag {
        /// Tag number or a listing URL containing `tags=<number>`.
        tag: String,
        /// Stop after this many listing pages.
        #[arg(long)]
        max_pages: Option<usize>,
        /// Archive the newest threads first instead of the oldest.
        #[arg(long)]
        newest_first: bool,
    },
    /// Manage and check the watch list.
    Watch {
        #[command(subcommand)]
        action: WatchCommand,
    },
    /// Show or change saved settings.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    /// Start watching a thread or a tag.
    Add {
        #[command(subcommand)]
        target: WatchTarget,
    },
    List,
    /// Stop watching entry N (as numbered by `watch list`).
    Remove { position: usize },
    /// Pause or resume entry N.
    Toggle { position: usize },
    /// Check every active entry for new content.
    Check,
}

#[derive(Debug, Subcommand)]
pub enum WatchTarget {
    Thread {
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    Tag {
        tag: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Save new values; the global --output/--domain/--concurrency are saved too.
    Set(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Pause between listing pages and threads, in seconds.
    #[arg(long)]
    pub page_delay: Option<f64>,
    /// Attempts per file, 1-30.
    #[arg(long)]
    pub retries: Option<u32>,
    /// Re-encode PNG/WEBP/BMP images as JPEG.
    #[arg(long)]
    pub convert_images: Option<bool>,
    /// JPEG quality, 1-100.
    #[arg(long)]
    pub jpeg_quality: Option<u8>,
}
