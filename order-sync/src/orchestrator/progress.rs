//! Sync progress counters and the progress-event callback.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use order_sync_repository::BatchOperationSummary;

/// Counters of a single sync run.
///
/// Owned by the driver for the duration of one run and returned as its summary.
/// `synced + failed <= total_discovered` holds after every update.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    /// Records known to exist: the initial count, raised if paging finds more.
    pub total_discovered: u64,
    pub synced: u64,
    pub failed: u64,
    pub pages_fetched: u64,
    pub bulk_calls: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    started: Instant,
    finished: Option<Duration>,
}

impl SyncProgress {
    /// Start counting a run over `total` records.
    pub fn start(total: u64) -> Self {
        Self {
            total_discovered: total,
            synced: 0,
            failed: 0,
            pages_fetched: 0,
            bulk_calls: 0,
            flushes: 0,
            flush_failures: 0,
            started: Instant::now(),
            finished: None,
        }
    }

    /// Record a fetched page of `fetched` records starting at `offset`.
    pub fn record_page(&mut self, offset: u64, fetched: usize) {
        self.pages_fetched += 1;
        self.total_discovered = self.total_discovered.max(offset + fetched as u64);
    }

    /// Record the outcome of one bulk call.
    pub fn record_batch(&mut self, summary: &BatchOperationSummary) {
        self.bulk_calls += 1;
        self.synced += summary.succeeded as u64;
        self.failed += summary.failed as u64;
    }

    pub fn record_flush(&mut self, succeeded: bool) {
        if succeeded {
            self.flushes += 1;
        } else {
            self.flush_failures += 1;
        }
    }

    /// Freeze the elapsed time.
    pub fn finish(&mut self) {
        self.finished = Some(self.started.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }

    /// Whole percent of records synced, rounded down. An empty source is 100% done.
    pub fn percent(&self) -> u64 {
        percent_of(self.synced, self.total_discovered)
    }

    /// Records synced per second.
    pub fn rate(&self) -> f64 {
        rate_for(self.synced, self.elapsed())
    }

    /// Estimated time left; `None` (unbounded) until something has been synced.
    pub fn eta(&self) -> Option<Duration> {
        eta_for(self.total_discovered, self.synced, self.elapsed())
    }
}

fn percent_of(synced: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    (synced.saturating_mul(100) / total).min(100)
}

fn rate_for(synced: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        synced as f64 / secs
    } else {
        0.0
    }
}

fn eta_for(total: u64, synced: u64, elapsed: Duration) -> Option<Duration> {
    if synced == 0 {
        return None;
    }
    let remaining = total.saturating_sub(synced) as f64;
    Some(Duration::from_secs_f64(
        remaining * elapsed.as_secs_f64() / synced as f64,
    ))
}

/// Points in a sync run at which observers are notified.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A bulk call finished (successfully or not).
    BatchCompleted {
        page: u64,
        succeeded: usize,
        failed: usize,
        progress: SyncProgress,
    },
    /// A visibility flush was attempted. `error` is set if it failed.
    Flushed {
        page: u64,
        error: Option<SyncError>,
        progress: SyncProgress,
    },
    /// The run finished; `progress` is the final summary.
    Completed { progress: SyncProgress },
}

/// Receives progress events from the sync driver.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Observer that writes progress events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressObserver;

impl ProgressObserver for TracingProgressObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BatchCompleted {
                page,
                succeeded,
                failed,
                progress,
            } => {
                info!(
                    page,
                    batch_succeeded = succeeded,
                    batch_failed = failed,
                    synced = progress.synced,
                    failed = progress.failed,
                    total = progress.total_discovered,
                    percent = progress.percent(),
                    records_per_sec = format!("{:.2}", progress.rate()),
                    eta_secs = progress.eta().map(|eta| eta.as_secs()),
                    "Sync progress"
                );
            }
            ProgressEvent::Flushed {
                page,
                error: Some(error),
                ..
            } => {
                warn!(page, error = %error, "Index flush failed, continuing");
            }
            ProgressEvent::Flushed { page, error: None, .. } => {
                debug!(page, "Index flushed");
            }
            ProgressEvent::Completed { progress } => {
                info!(
                    synced = progress.synced,
                    failed = progress.failed,
                    total = progress.total_discovered,
                    pages = progress.pages_fetched,
                    bulk_calls = progress.bulk_calls,
                    flushes = progress.flushes,
                    flush_failures = progress.flush_failures,
                    elapsed_secs = format!("{:.2}", progress.elapsed().as_secs_f64()),
                    records_per_sec = format!("{:.2}", progress.rate()),
                    "Sync completed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_sync_repository::{BatchOperationResult, BatchOutcome, SearchIndexError};

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(percent_of(0, 2500), 0);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(2500, 2500), 100);
        assert_eq!(percent_of(1, 3), 33);
    }

    #[test]
    fn test_percent_of_empty_source() {
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_rate() {
        assert_eq!(rate_for(500, Duration::from_secs(2)), 250.0);
        assert_eq!(rate_for(500, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_eta_undefined_until_first_success() {
        assert_eq!(eta_for(1000, 0, Duration::from_secs(30)), None);
    }

    #[test]
    fn test_eta() {
        // 250 done in 10s, 750 left at the same pace.
        assert_eq!(
            eta_for(1000, 250, Duration::from_secs(10)),
            Some(Duration::from_secs(30))
        );
        assert_eq!(eta_for(1000, 1000, Duration::from_secs(10)), Some(Duration::ZERO));
    }

    #[test]
    fn test_record_page_raises_total() {
        let mut progress = SyncProgress::start(1000);
        progress.record_page(0, 1000);
        assert_eq!(progress.total_discovered, 1000);
        progress.record_page(1000, 20);
        assert_eq!(progress.total_discovered, 1020);
        assert_eq!(progress.pages_fetched, 2);
    }

    #[test]
    fn test_record_batch() {
        let mut progress = SyncProgress::start(3);
        progress.record_page(0, 3);
        progress.record_batch(&BatchOperationSummary::from_results(vec![
            BatchOperationResult {
                key: "a".to_string(),
                outcome: BatchOutcome::Success,
            },
            BatchOperationResult {
                key: "b".to_string(),
                outcome: BatchOutcome::Failure(SearchIndexError::bulk_index("rejected")),
            },
        ]));

        assert_eq!(progress.synced, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.bulk_calls, 1);
        assert!(progress.synced + progress.failed <= progress.total_discovered);
    }

    #[test]
    fn test_finish_freezes_elapsed() {
        let mut progress = SyncProgress::start(0);
        progress.finish();
        let first = progress.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(progress.elapsed(), first);
    }
}
