//! Transfer statistics shared across the requests of one logical upload.
//!
//! A chunked upload reaches the remote API as several sequential HTTP
//! exchanges. The session is the piece of state that outlives each of them,
//! so cumulative bytes, rate, and ETA describe the file transfer rather
//! than the request currently in flight.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sliding-window length for the instantaneous-rate estimate.
const RATE_SAMPLE_WINDOW: Duration = Duration::from_millis(500);

/// Age at which the last rate sample stops being representative.
const RATE_SAMPLE_STALE: Duration = Duration::from_secs(2);

/// Shared transfer statistics for one logical upload.
///
/// Exactly one throttled stream writes at any instant (requests are
/// sequential); the progress reporter reads concurrently. Handles are cheap
/// clones of one shared state, so snapshots are never torn.
#[derive(Clone)]
pub struct TransferSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    total_bytes: u64,
    bytes: AtomicU64,
    started: Mutex<Option<Instant>>,
    rate: Mutex<RateSample>,
}

struct RateSample {
    window_start: Instant,
    window_bytes: u64,
    current: f64,
}

impl std::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession")
            .field("total_bytes", &self.inner.total_bytes)
            .field("bytes", &self.bytes())
            .finish()
    }
}

impl TransferSession {
    /// Create a session expecting `total_bytes` in all.
    #[must_use]
    pub fn new(total_bytes: u64) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                total_bytes,
                bytes: AtomicU64::new(0),
                started: Mutex::new(None),
                rate: Mutex::new(RateSample {
                    window_start: Instant::now(),
                    window_bytes: 0,
                    current: 0.0,
                }),
            }),
        }
    }

    /// Total bytes expected for the logical upload.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.inner.total_bytes
    }

    /// Cumulative bytes recorded so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    /// Account `n` freshly transferred bytes.
    ///
    /// Lock order is `started` before `rate`, same as `snapshot`.
    pub(crate) fn record(&self, n: usize) {
        let now = Instant::now();
        {
            let mut started = self.inner.started.lock();
            if started.is_none() {
                *started = Some(now);
                // The rate window opens with the first byte, not when the
                // session was constructed.
                self.inner.rate.lock().window_start = now;
            }
        }

        self.inner.bytes.fetch_add(n as u64, Ordering::Relaxed);

        let mut rate = self.inner.rate.lock();
        rate.window_bytes += n as u64;
        let elapsed = now.saturating_duration_since(rate.window_start);
        if elapsed >= RATE_SAMPLE_WINDOW {
            rate.current = rate.window_bytes as f64 / elapsed.as_secs_f64();
            rate.window_bytes = 0;
            rate.window_start = now;
        }
    }

    /// Consistent point-in-time view of the transfer.
    ///
    /// `None` until the first byte has been recorded; before that there is
    /// nothing to report.
    #[must_use]
    pub fn snapshot(&self) -> Option<TransferSnapshot> {
        let started = (*self.inner.started.lock())?;
        let bytes = self.bytes();

        let rate = self.inner.rate.lock();
        let window_age = rate.window_start.elapsed();
        let current_rate = if window_age >= RATE_SAMPLE_STALE {
            // The writer has gone quiet; decay instead of freezing at the
            // last busy sample.
            rate.window_bytes as f64 / window_age.as_secs_f64()
        } else if rate.current == 0.0 && rate.window_bytes > 0 {
            // First sample window still filling.
            rate.window_bytes as f64 / window_age.as_secs_f64().max(f64::EPSILON)
        } else {
            rate.current
        };
        drop(rate);

        Some(TransferSnapshot {
            bytes,
            total_bytes: self.inner.total_bytes,
            elapsed: started.elapsed(),
            current_rate,
        })
    }
}

/// Point-in-time view of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSnapshot {
    /// Cumulative bytes transferred.
    pub bytes: u64,
    /// Total bytes expected.
    pub total_bytes: u64,
    /// Time since the first byte.
    pub elapsed: Duration,
    /// Instantaneous throughput in bytes per second.
    pub current_rate: f64,
}

impl TransferSnapshot {
    /// Percentage complete, clamped to `[0, 100]`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }

    /// Average throughput since the first byte, in bytes per second.
    #[must_use]
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes as f64 / secs
    }

    /// Estimated time remaining, derived from the average rate.
    ///
    /// `None` while the average rate is still zero.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        let remaining = self.total_bytes.saturating_sub(self.bytes);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.average_rate();
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }
}
