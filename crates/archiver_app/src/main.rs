mod cli;
mod report;
mod settings;
mod watch;
mod watch_store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use archiver_core::{parse_tag_input, parse_thread_input, WatchEntry, WatchKind};
use archiver_engine::{
    clamp_concurrency, parse_domain, tag_page_url, Archiver, ArchiverConfig, TagOrder,
    MAX_CONCURRENCY,
};
use archiver_logging::{archiver_info, LogDestination};
use clap::Parser;
use log::LevelFilter;

use cli::{Cli, Command, SettingsArgs, SettingsCommand, WatchCommand, WatchTarget};
use report::{format_bytes, print_stats, ConsoleProgress};
use settings::{load_settings, save_settings, Settings, SETTINGS_FILENAME};
use watch::check_watch_list;
use watch_store::{load_watch_list, save_watch_list, WATCH_LIST_FILENAME};

const CHECK_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let settings_path = PathBuf::from(SETTINGS_FILENAME);
    let settings = apply_overrides(load_settings(&settings_path), &cli);

    match cli.command {
        Command::Thread { url } => archive_thread(&settings, &url).await,
        Command::Tag {
            tag,
            max_pages,
            newest_first,
        } => {
            let order = if newest_first {
                TagOrder::NewestFirst
            } else {
                TagOrder::OldestFirst
            };
            archive_tag(&settings, &tag, max_pages, order).await
        }
        Command::Watch { action } => run_watch(&settings, action).await,
        Command::Settings { action } => run_settings(settings, &settings_path, action),
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    archiver_logging::initialize(destination, level);
}

/// Command-line values win over saved ones for this run.
fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(output) = &cli.output {
        settings.output_dir = output.clone();
    }
    if let Some(domain) = &cli.domain {
        settings.domain = domain.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        settings.max_concurrent_downloads = clamp_concurrency(concurrency);
    }
    settings
}

fn build_archiver(config: ArchiverConfig) -> anyhow::Result<Archiver> {
    let archiver = Archiver::new(config).context("setting up the http client")?;
    Ok(archiver.with_progress(Arc::new(ConsoleProgress::default())))
}

async fn archive_thread(settings: &Settings, raw_url: &str) -> anyhow::Result<()> {
    let thread = parse_thread_input(raw_url)?;
    let config = settings.to_config();
    let archiver = build_archiver(config.clone())?;

    let report = archiver
        .archive_thread(&thread.url, &config.output_dir)
        .await
        .with_context(|| format!("archiving thread {}", thread.id))?;

    println!("Saved {}", report.html_path.display());
    print_stats("Resources", &report.resources);
    print_stats("Media", &report.media);
    Ok(())
}

async fn archive_tag(
    settings: &Settings,
    raw_tag: &str,
    max_pages: Option<usize>,
    order: TagOrder,
) -> anyhow::Result<()> {
    let tag_id = parse_tag_input(raw_tag)?;
    let config = settings.to_config();
    let archiver = build_archiver(config.clone())?;

    let report = archiver
        .archive_tag(tag_id, max_pages, order, &config.output_dir)
        .await
        .with_context(|| format!("archiving tag {tag_id}"))?;

    if report.threads_found == 0 {
        println!("Tag {tag_id} lists no threads");
        return Ok(());
    }
    println!(
        "Tag {tag_id}: {} of {} threads archived into {}, {} failed",
        report.archived,
        report.threads_found,
        report.tag_dir.display(),
        report.failed
    );
    print_stats("Media", &report.media);
    Ok(())
}

async fn run_watch(settings: &Settings, action: WatchCommand) -> anyhow::Result<()> {
    let path = PathBuf::from(WATCH_LIST_FILENAME);
    let mut list = load_watch_list(&path);

    match action {
        WatchCommand::List => {
            if list.is_empty() {
                println!("Watch list is empty");
            }
            for (idx, entry) in list.entries().iter().enumerate() {
                println!(
                    "{:>2}. [{}] {:<6} {}  (last check: {})",
                    idx + 1,
                    if entry.active { "on " } else { "off" },
                    entry.kind,
                    entry.name,
                    entry.last_check.as_deref().unwrap_or("never")
                );
            }
            println!("{}/{} entries", list.len(), archiver_core::MAX_WATCH_ENTRIES);
            return Ok(());
        }
        WatchCommand::Add { target } => {
            let entry = match target {
                WatchTarget::Thread { url, name } => {
                    let thread = parse_thread_input(&url)?;
                    let name = match name {
                        Some(name) => name,
                        None => fetch_thread_title(settings, &thread.url).await,
                    };
                    WatchEntry::new(WatchKind::Thread, thread.url, thread.id, &name)
                }
                WatchTarget::Tag { tag, name } => {
                    let tag_id = parse_tag_input(&tag)?;
                    let Some(domain) = parse_domain(&settings.domain) else {
                        bail!("invalid domain {:?}", settings.domain);
                    };
                    WatchEntry::new(
                        WatchKind::Tag,
                        tag_page_url(&domain, tag_id, 0),
                        tag_id.to_string(),
                        name.as_deref().unwrap_or(""),
                    )
                }
            };
            let described = format!("{} {}", entry.kind, entry.name);
            list.add(entry)?;
            println!("Watching {described}");
        }
        WatchCommand::Remove { position } => {
            let removed = list.remove(position)?;
            println!("Removed {} {}", removed.kind, removed.name);
        }
        WatchCommand::Toggle { position } => {
            let active = list.toggle(position)?;
            println!("Entry {position} is now {}", if active { "active" } else { "paused" });
        }
        WatchCommand::Check => {
            let config = settings.to_config();
            let archiver = build_archiver(config.clone())?;
            let summary = check_watch_list(&archiver, &mut list, &config.output_dir, || {
                chrono::Local::now().format(CHECK_STAMP_FORMAT).to_string()
            })
            .await;
            println!(
                "Checked {} entries ({} failed), {} new threads, {} new files ({})",
                summary.checked,
                summary.failed,
                summary.new_threads,
                summary.media.completed,
                format_bytes(summary.media.total_bytes)
            );
        }
    }

    save_watch_list(&path, &list)
}

/// Page title for a display name; empty when the page cannot be read.
async fn fetch_thread_title(settings: &Settings, url: &str) -> String {
    let archiver = match Archiver::new(settings.to_config()) {
        Ok(archiver) => archiver,
        Err(_) => return String::new(),
    };
    match archiver.transformer().transform(url).await {
        Ok(thread) => thread.title.unwrap_or_default(),
        Err(err) => {
            archiver_info!("Could not read title of {}: {}", url, err);
            String::new()
        }
    }
}

fn run_settings(
    settings: Settings,
    path: &std::path::Path,
    action: SettingsCommand,
) -> anyhow::Result<()> {
    match action {
        SettingsCommand::Show => {
            print_settings(&settings);
            Ok(())
        }
        SettingsCommand::Set(args) => {
            let updated = apply_settings_args(settings, &args);
            save_settings(path, &updated)?;
            print_settings(&updated);
            Ok(())
        }
    }
}

fn apply_settings_args(mut settings: Settings, args: &SettingsArgs) -> Settings {
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(delay) = args.page_delay {
        settings.page_delay_secs = delay;
    }
    if let Some(retries) = args.retries {
        settings.max_retries = retries;
    }
    if let Some(convert) = args.convert_images {
        settings.convert_images = convert;
    }
    if let Some(quality) = args.jpeg_quality {
        settings.jpeg_quality = quality;
    }
    settings.clamped()
}

fn print_settings(settings: &Settings) {
    println!("domain:        {}", settings.domain);
    println!("output dir:    {}", settings.output_dir.display());
    println!(
        "downloads:     {} at once (max {MAX_CONCURRENCY})",
        settings.max_concurrent_downloads
    );
    println!("timeout:       {} s", settings.timeout_secs);
    println!("page delay:    {} s", settings.page_delay_secs);
    println!("retries:       {}", settings.max_retries);
    println!(
        "convert to jpg: {} (quality {})",
        if settings.convert_images { "yes" } else { "no" },
        settings.jpeg_quality
    );
}
