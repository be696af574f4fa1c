//! Token-bucket ceiling for upload throughput.
//!
//! The gate answers one question: may these bytes leave now? Admission is
//! paced with a token bucket so the wait itself is the backpressure; nothing
//! is buffered.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use slipstream_core::KBPS_IN_BYTES_PER_SEC;
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Pacing granularity: bytes are admitted in cells of this size so the
/// bucket stays smooth at low ceilings.
const CELL_BYTES: u32 = 1024;

/// Byte-throughput ceiling backed by a token bucket.
///
/// A gate without a limiter admits everything immediately.
#[derive(Clone)]
pub struct RateGate {
    limiter: Option<Arc<DirectLimiter>>,
    ceiling_bytes_per_sec: u64,
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("enabled", &self.limiter.is_some())
            .field("ceiling_bytes_per_sec", &self.ceiling_bytes_per_sec)
            .finish()
    }
}

impl RateGate {
    /// Build a gate from a kbit/s ceiling. `0` means unlimited.
    #[must_use]
    pub fn from_kbps(rate_kbps: u64) -> Self {
        let ceiling = rate_kbps * KBPS_IN_BYTES_PER_SEC;
        let limiter = if ceiling == 0 {
            None
        } else {
            let cells_per_sec = (ceiling / u64::from(CELL_BYTES)).max(1);
            let cells_per_sec = u32::try_from(cells_per_sec).unwrap_or(u32::MAX);
            NonZeroU32::new(cells_per_sec)
                .map(|cps| Arc::new(RateLimiter::direct(Quota::per_second(cps))))
        };
        Self {
            limiter,
            ceiling_bytes_per_sec: ceiling,
        }
    }

    /// A gate that admits everything.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            ceiling_bytes_per_sec: 0,
        }
    }

    /// Whether a ceiling is in force.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Ceiling in bytes per second (`0` = unlimited).
    #[must_use]
    pub fn ceiling_bytes_per_sec(&self) -> u64 {
        self.ceiling_bytes_per_sec
    }

    /// Wait until `bytes` may pass the gate.
    pub async fn admit(&self, bytes: usize) {
        let Some(limiter) = &self.limiter else { return };
        let bytes = u32::try_from(bytes).unwrap_or(u32::MAX);
        let cells = (bytes / CELL_BYTES).max(1);
        for _ in 0..cells {
            limiter.until_ready().await;
        }
    }
}
