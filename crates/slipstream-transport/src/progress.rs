//! Live progress reporting with a deterministic shutdown handshake.
//!
//! The reporter owns no transfer state. It samples the shared session once
//! a second and rewrites a single console line in place; the caller tears
//! it down through an explicit handshake so the final progress line and any
//! subsequent output never interleave.

use crate::session::{TransferSession, TransferSnapshot};
use std::io::Write;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::trace;

/// Cadence of the status line refresh.
const TICK: Duration = Duration::from_secs(1);

/// One kbit/s in bytes per second.
const KBPS_IN_BYTES: f64 = 125.0;

/// Rate at which the display switches from kbit/s to Mbit/s
/// (1000 kbit/s, expressed in bytes per second).
const MBPS_DISPLAY_FLOOR: f64 = 1000.0 * KBPS_IN_BYTES;

/// Periodic single-line status printer for one logical upload.
///
/// Termination is purely reactive: the reporter runs until
/// [`ProgressReporter::shutdown`] sends an acknowledgment channel through
/// the shutdown mailbox, then writes its final newline, flushes, and
/// releases the acknowledgment. The caller resumes only after that; this is
/// the one rendezvous between the two tasks.
#[derive(Debug)]
pub struct ProgressReporter {
    shutdown: mpsc::Sender<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start reporting `session` to stdout.
    #[must_use]
    pub fn start(session: TransferSession) -> Self {
        Self::with_writer(session, std::io::stdout())
    }

    /// Start reporting to an arbitrary writer. Split out for tests.
    #[must_use]
    pub fn with_writer<W>(session: TransferSession, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let (shutdown, mailbox) = mpsc::channel(1);
        let task = tokio::spawn(run(session, mailbox, writer));
        Self { shutdown, task }
    }

    /// Stop the reporter.
    ///
    /// Resolves only once the reporter has written its final newline and
    /// acknowledged the request; until then the caller must not print.
    pub async fn shutdown(self) {
        let (ack, done) = oneshot::channel();
        if self.shutdown.send(ack).await.is_ok() {
            // Acknowledged only after the final output is flushed.
            let _ = done.await;
        }
        let _ = self.task.await;
    }
}

async fn run<W>(
    session: TransferSession,
    mut mailbox: mpsc::Receiver<oneshot::Sender<()>>,
    mut out: W,
) where
    W: Write + Send + 'static,
{
    let mut ticker = tokio::time::interval(TICK);
    // Width of the previous line, for the pad-then-rewrite erase.
    let mut erase = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Nothing to report until the first byte moves.
                if let Some(snapshot) = session.snapshot() {
                    let line = render(&snapshot);
                    let _ = write!(out, "\r{:erase$}\r{line}", "");
                    let _ = out.flush();
                    erase = line.len();
                }
            }
            ack = mailbox.recv() => {
                trace!("progress reporter draining");
                let _ = writeln!(out);
                let _ = out.flush();
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                return;
            }
        }
    }
}

/// Render one status line from a snapshot.
fn render(snapshot: &TransferSnapshot) -> String {
    let rate = snapshot.current_rate;
    let (scaled, unit) = if rate >= MBPS_DISPLAY_FLOOR {
        (rate / MBPS_DISPLAY_FLOOR, "Mbps")
    } else {
        (rate / KBPS_IN_BYTES, "kbps")
    };
    format!(
        "Progress: {scaled:8.2} {unit}, {} / {} ({:3.0}%) ETA {:>8}",
        snapshot.bytes,
        snapshot.total_bytes,
        snapshot.percent(),
        snapshot
            .eta()
            .map_or_else(|| "--".to_string(), format_duration),
    )
}

/// Compact "1h2m3s" rendering for ETA values.
fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer double collecting everything the reporter prints.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn shutdown_prints_exactly_one_newline() {
        let session = TransferSession::new(1000);
        session.record(250);

        let buf = SharedBuf::default();
        let reporter = ProgressReporter::with_writer(session, buf.clone());
        // The first interval tick fires immediately; give it a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        reporter.shutdown().await;

        let printed = buf.contents();
        assert_eq!(printed.matches('\n').count(), 1);
        assert!(printed.ends_with('\n'));
        assert!(printed.contains("Progress:"));
        assert!(printed.contains("250 / 1000"));
    }

    #[tokio::test]
    async fn reporter_is_silent_before_the_first_byte() {
        let session = TransferSession::new(1000);
        let buf = SharedBuf::default();
        let reporter = ProgressReporter::with_writer(session, buf.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        reporter.shutdown().await;

        // Only the final newline from the drain.
        assert_eq!(buf.contents(), "\n");
    }

    #[test]
    fn render_scales_to_mbps_at_1000_kbps() {
        let snapshot = TransferSnapshot {
            bytes: 5_000_000,
            total_bytes: 10_000_000,
            elapsed: Duration::from_secs(40),
            current_rate: 125_000.0,
        };
        let line = render(&snapshot);
        assert!(line.contains("Mbps"), "{line}");
        assert!(line.contains("( 50%)"), "{line}");
        assert!(line.contains("40s"), "{line}");
    }

    #[test]
    fn render_uses_kbps_below_the_threshold() {
        let snapshot = TransferSnapshot {
            bytes: 1_000,
            total_bytes: 10_000,
            elapsed: Duration::from_secs(1),
            current_rate: 12_500.0,
        };
        let line = render(&snapshot);
        assert!(line.contains("kbps"), "{line}");
        assert!(!line.contains("Mbps"), "{line}");
    }

    #[test]
    fn eta_formats_compactly() {
        assert_eq!(format_duration(Duration::from_secs(3750)), "1h2m30s");
        assert_eq!(format_duration(Duration::from_secs(95)), "1m35s");
        assert_eq!(format_duration(Duration::from_secs(9)), "9s");
    }
}
