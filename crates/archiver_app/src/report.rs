use std::sync::atomic::{AtomicUsize, Ordering};

use archiver_engine::{DownloadEvent, DownloadStats, ItemOutcome, ProgressSink};
use archiver_logging::archiver_debug;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Human readable size with two decimals, e.g. `1.50 MB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Summary lines for one batch; conversion and retry lines only when
/// something happened.
pub fn stats_lines(label: &str, stats: &DownloadStats) -> Vec<String> {
    let mut lines = vec![
        format!("{label}: {} files", stats.total),
        format!("  completed: {}", stats.completed),
        format!("  skipped:   {}", stats.skipped),
        format!("  failed:    {}", stats.failed),
    ];
    if stats.converted > 0 {
        lines.push(format!("  converted: {}", stats.converted));
    }
    if stats.retried > 0 {
        lines.push(format!("  retried:   {}", stats.retried));
    }
    lines.push(format!("  size:      {}", format_bytes(stats.total_bytes)));
    lines
}

pub fn print_stats(label: &str, stats: &DownloadStats) {
    for line in stats_lines(label, stats) {
        println!("{line}");
    }
}

/// Prints failures as they happen and counts everything else.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    finished: AtomicUsize,
}

impl ConsoleProgress {
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Relaxed)
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: DownloadEvent) {
        let count = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        match &event.outcome {
            ItemOutcome::Failed { reason } => {
                eprintln!("  [x] {}: {}", event.filename, reason);
            }
            ItemOutcome::Completed { bytes, converted } => {
                archiver_debug!(
                    "#{} {} ({}{})",
                    count,
                    event.filename,
                    format_bytes(*bytes),
                    if *converted { ", converted" } else { "" }
                );
            }
            ItemOutcome::Skipped => {
                archiver_debug!("#{} {} already present", count, event.filename);
            }
        }
    }
}
