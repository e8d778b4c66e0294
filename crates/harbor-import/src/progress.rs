//! Progress guesstimation and throttled emission

use std::time::{Duration, Instant};

/// Guess the total number of documents in a file from partial throughput.
///
/// With `average_size = bytes_processed / docs_processed`, the guess is
/// `max(docs_processed, ceil(file_size / average_size))` so it never runs
/// behind what has already been counted. Returns `docs_processed` unchanged
/// while either divisor is still zero.
pub fn guess_total(docs_processed: u64, bytes_processed: u64, file_size: u64) -> u64 {
    if docs_processed == 0 || bytes_processed == 0 {
        return docs_processed;
    }
    // ceil(file_size / (bytes / docs)) == ceil(file_size * docs / bytes);
    // the widened multiply keeps the estimate exact for large files
    let guessed =
        (u128::from(file_size) * u128::from(docs_processed)).div_ceil(u128::from(bytes_processed));
    docs_processed.max(guessed.min(u128::from(u64::MAX)) as u64)
}

/// Rate limiter for progress samples.
///
/// At most one sample passes per interval. The newest suppressed sample is
/// retained so [`ProgressThrottle::flush`] can deliver the final counts when
/// the producer settles; without the flush the last sample of a run would be
/// dropped whenever it landed inside the quiet window.
#[derive(Debug)]
pub struct ProgressThrottle<T> {
    interval: Duration,
    last_emitted: Option<Instant>,
    pending: Option<T>,
}

impl<T> ProgressThrottle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: None,
            pending: None,
        }
    }

    /// Offer a sample; returns it back when the interval has elapsed (the
    /// first offer always passes), otherwise retains it as pending.
    pub fn offer(&mut self, sample: T) -> Option<T> {
        self.offer_at(sample, Instant::now())
    }

    pub fn offer_at(&mut self, sample: T, now: Instant) -> Option<T> {
        match self.last_emitted {
            Some(last) if now.duration_since(last) < self.interval => {
                self.pending = Some(sample);
                None
            }
            _ => {
                self.last_emitted = Some(now);
                self.pending = None;
                Some(sample)
            }
        }
    }

    /// Take the retained sample, if any. Called when the producer settles,
    /// whether it succeeded, failed, or was cancelled.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }
}
