//! Upload configuration.
//!
//! The rate ceiling, its daily window, and the progress toggle arrive from
//! the surrounding application as one explicit [`UploadConfig`] value passed
//! into the transport constructors; there is no process-global state.

use crate::error::Result;
use crate::window::RateWindow;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// kbit/s to bytes/s: 1000 bits / 8 bits-per-byte.
pub const KBPS_IN_BYTES_PER_SEC: u64 = 125;

/// Configuration for the throttled upload transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload ceiling in kbit/s. `0` means unlimited.
    pub rate_kbps: u64,
    /// Daily window during which the ceiling applies, as "HH:MM-HH:MM" in
    /// local time. Empty means the ceiling applies around the clock.
    pub rate_window: String,
    /// Print a live single-line progress display during the upload.
    pub show_progress: bool,
    /// Connection timeout for the HTTP executor.
    pub connect_timeout: Duration,
    /// Total per-request timeout for the HTTP executor. `None` leaves slow
    /// requests unbounded; a throttled chunk can legitimately take hours.
    pub request_timeout: Option<Duration>,
    /// User agent presented by the HTTP executor.
    pub user_agent: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            rate_kbps: 0,
            rate_window: String::new(),
            show_progress: false,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("slipstream/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl UploadConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder::default()
    }

    /// Effective ceiling in bytes per second. `0` means unlimited.
    #[must_use]
    pub fn rate_bytes_per_sec(&self) -> u64 {
        self.rate_kbps * KBPS_IN_BYTES_PER_SEC
    }

    /// Parse the configured window string.
    ///
    /// The empty string is the "no schedule" sentinel and yields `None`:
    /// with a rate configured the ceiling then applies around the clock.
    pub fn window(&self) -> Result<Option<RateWindow>> {
        if self.rate_window.is_empty() {
            return Ok(None);
        }
        RateWindow::parse(&self.rate_window).map(Some)
    }

    /// Whether any throttling can apply at all.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.rate_kbps > 0
    }
}

/// Builder for [`UploadConfig`].
#[derive(Debug, Clone, Default)]
pub struct UploadConfigBuilder {
    config: UploadConfig,
}

impl UploadConfigBuilder {
    /// Set the upload ceiling in kbit/s (`0` = unlimited).
    #[must_use]
    pub fn rate_kbps(mut self, rate_kbps: u64) -> Self {
        self.config.rate_kbps = rate_kbps;
        self
    }

    /// Set the daily "HH:MM-HH:MM" window the ceiling applies in.
    #[must_use]
    pub fn rate_window(mut self, rate_window: impl Into<String>) -> Self {
        self.config.rate_window = rate_window.into();
        self
    }

    /// Toggle the live progress display.
    #[must_use]
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.config.show_progress = show_progress;
        self
    }

    /// Set the connection timeout for the HTTP executor.
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = connect_timeout;
        self
    }

    /// Set the total per-request timeout for the HTTP executor.
    #[must_use]
    pub fn request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Set the user agent presented by the HTTP executor.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> UploadConfig {
        self.config
    }
}
