use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archiver_logging::{archiver_debug, archiver_warn};

use crate::fetch::Fetcher;
use crate::FetchError;

pub const MAX_RETRIES_LIMIT: u32 = 30;

/// Whole-file retry with linear backoff: attempt `n` (1-based) is followed by
/// a pause of `n * base_delay` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_RETRIES_LIMIT),
            base_delay,
        }
    }

    /// Pause after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadFailure {
    #[error("not found")]
    NotFound,
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub bytes: Vec<u8>,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub failure: DownloadFailure,
    pub attempts: u32,
}

impl FailedDownload {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

impl Downloaded {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Fetcher wrapper that retries transient failures.
#[derive(Clone)]
pub struct RetryingDownloader {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    retries: Arc<AtomicU64>,
}

impl RetryingDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            retries: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Retries performed over the lifetime of this downloader.
    pub fn total_retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub async fn fetch(&self, url: &str) -> Result<Downloaded, FailedDownload> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(output) => {
                    return Ok(Downloaded {
                        bytes: output.bytes,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_not_found() => {
                    archiver_debug!("{} not found, not retrying", url);
                    return Err(FailedDownload {
                        failure: DownloadFailure::NotFound,
                        attempts: attempt,
                    });
                }
                Err(err) if attempt >= max_attempts => {
                    archiver_warn!("giving up on {} after {} attempts: {}", url, attempt, err);
                    return Err(FailedDownload {
                        failure: DownloadFailure::Exhausted {
                            attempts: attempt,
                            last: err,
                        },
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_after(attempt);
                    archiver_warn!(
                        "attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        err,
                        delay
                    );
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
