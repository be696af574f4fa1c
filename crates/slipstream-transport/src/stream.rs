//! Throttled upload body streams.
//!
//! The reader sits between the request body and the wire. Every chunk is
//! paced through the rate policy before it leaves, so throttling decisions
//! are re-made at read granularity: a transfer that starts outside the
//! daily window and later enters it begins throttling mid-stream, and vice
//! versa.

use crate::session::TransferSession;
use crate::throttle::RateGate;
use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use slipstream_core::{RateWindow, UploadConfig};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Boxed byte stream used for upload bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Decides, chunk by chunk, whether the gate applies right now.
///
/// The window sits behind a mutex so its lazy day roll-forward persists
/// across every request of the logical upload. The lock is never held
/// across an await.
pub struct RatePolicy {
    gate: RateGate,
    window: Option<Mutex<RateWindow>>,
}

impl std::fmt::Debug for RatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatePolicy")
            .field("gate", &self.gate)
            .field("windowed", &self.window.is_some())
            .finish()
    }
}

impl RatePolicy {
    /// Build the policy from configuration.
    pub fn from_config(config: &UploadConfig) -> slipstream_core::Result<Self> {
        Ok(Self::new(RateGate::from_kbps(config.rate_kbps), config.window()?))
    }

    /// Build a policy from a gate and an optional daily window.
    #[must_use]
    pub fn new(gate: RateGate, window: Option<RateWindow>) -> Self {
        Self {
            gate,
            window: window.map(Mutex::new),
        }
    }

    /// Whether the ceiling applies at this instant.
    ///
    /// With no window configured the ceiling applies around the clock; with
    /// a window it applies only inside it. A disabled gate never throttles.
    pub fn is_limiting_now(&self) -> bool {
        if !self.gate.is_enabled() {
            return false;
        }
        match &self.window {
            None => true,
            Some(window) => window.lock().is_active_now(),
        }
    }

    /// Pace `bytes` through the gate if the ceiling applies right now.
    pub async fn pace(&self, bytes: usize) {
        if self.is_limiting_now() {
            self.gate.admit(bytes).await;
        }
    }
}

/// Upload body stream that paces chunks through a [`RatePolicy`] and
/// accounts them into a [`TransferSession`].
///
/// Errors from the inner stream pass through unchanged; the wrapper adds
/// none of its own. The inner body is owned, so dropping the reader drops
/// the body with it; there is no separate close step.
pub struct ThrottledReader {
    inner: ByteStream,
}

impl std::fmt::Debug for ThrottledReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledReader").finish_non_exhaustive()
    }
}

impl ThrottledReader {
    /// Wrap `body`, sharing `policy` and `session` with the rest of the
    /// logical upload.
    #[must_use]
    pub fn new(body: ByteStream, policy: Arc<RatePolicy>, session: TransferSession) -> Self {
        let stream = try_stream! {
            let mut body = body;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                policy.pace(chunk.len()).await;
                session.record(chunk.len());
                yield chunk;
            }
        };
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for ThrottledReader {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as TimeDelta, Local};
    use futures_util::stream;
    use std::time::{Duration, Instant};

    fn body_of(chunks: usize, chunk_len: usize) -> ByteStream {
        let chunks: Vec<io::Result<Bytes>> = (0..chunks)
            .map(|_| Ok(Bytes::from(vec![0u8; chunk_len])))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    async fn drain(mut reader: ThrottledReader) -> usize {
        let mut seen = 0;
        while let Some(chunk) = reader.next().await {
            seen += chunk.unwrap().len();
        }
        seen
    }

    #[tokio::test]
    async fn unlimited_policy_passes_bytes_through() {
        let session = TransferSession::new(64 * 1024);
        let policy = Arc::new(RatePolicy::new(RateGate::unlimited(), None));
        let reader = ThrottledReader::new(body_of(8, 8192), policy, session.clone());
        assert_eq!(drain(reader).await, 64 * 1024);
        assert_eq!(session.bytes(), 64 * 1024);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ceiling_paces_a_sustained_transfer() {
        // 800 kbit/s = 100_000 B/s. 300 KiB must wait for the bucket to
        // refill once the initial burst is spent: roughly two seconds.
        let total: usize = 300 * 1024;
        let session = TransferSession::new(total as u64);
        let policy = Arc::new(RatePolicy::new(RateGate::from_kbps(800), None));
        let reader = ThrottledReader::new(body_of(30, 10 * 1024), policy, session.clone());

        let started = Instant::now();
        assert_eq!(drain(reader).await, total);
        let elapsed = started.elapsed();

        assert!(
            elapsed >= Duration::from_millis(1500),
            "transfer finished too fast: {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_secs(10),
            "transfer took far too long: {elapsed:?}"
        );
        assert_eq!(session.bytes(), total as u64);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn inside_window_engages_the_ceiling() {
        let now = Local::now().naive_local();
        // Pick the half-day window containing `now`; "12:00-00:00" wraps to
        // midnight so the two specs cover the clock without a gap.
        let spec = if now.time() < chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap() {
            "00:00-12:30"
        } else {
            "12:00-00:00"
        };
        let window = RateWindow::parse_at(spec, now).unwrap();

        // 1024 kbit/s = 128_000 B/s; 256 KiB needs about one bucket refill.
        let total: usize = 256 * 1024;
        let session = TransferSession::new(total as u64);
        let policy = Arc::new(RatePolicy::new(RateGate::from_kbps(1024), Some(window)));
        let reader = ThrottledReader::new(body_of(32, 8 * 1024), policy, session.clone());

        let started = Instant::now();
        assert_eq!(drain(reader).await, total);
        assert!(
            started.elapsed() >= Duration::from_millis(700),
            "ceiling never engaged: {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn outside_window_is_unbounded() {
        let now = Local::now().naive_local();
        let spec = format!(
            "{}-{}",
            (now + TimeDelta::hours(2)).format("%H:%M"),
            (now + TimeDelta::hours(3)).format("%H:%M"),
        );
        let window = RateWindow::parse_at(&spec, now).unwrap();

        // 64 kbit/s would stretch 1 MiB over two minutes if it engaged.
        let total: usize = 1_048_576;
        let session = TransferSession::new(total as u64);
        let policy = Arc::new(RatePolicy::new(RateGate::from_kbps(64), Some(window)));
        let reader = ThrottledReader::new(body_of(16, 65_536), policy, session.clone());

        let started = Instant::now();
        assert_eq!(drain(reader).await, total);
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "outside the window no delay may be introduced: {:?}",
            started.elapsed()
        );
        assert_eq!(session.bytes(), total as u64);
    }

    #[tokio::test]
    async fn inner_errors_pass_through_unchanged() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let reader = ThrottledReader::new(
            Box::pin(stream::iter(chunks)),
            Arc::new(RatePolicy::new(RateGate::unlimited(), None)),
            TransferSession::new(3),
        );

        let results: Vec<io::Result<Bytes>> = reader.collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().unwrap_err().kind(),
            io::ErrorKind::ConnectionReset
        );
    }
}
