//! Throttled, observable upload transport.
//!
//! This crate is the transport layer under a chunked media upload:
//!
//! - **Rate gating** with a token bucket ([`RateGate`]), optionally
//!   confined to a recurring daily window
//! - **Session statistics** that survive the several sequential HTTP
//!   requests of one logical upload ([`TransferSession`])
//! - **A transport decorator** that throttles only upload-payload requests
//!   ([`ThrottlingTransport`])
//! - **A live progress line** with a deterministic shutdown handshake
//!   ([`ProgressReporter`])
//!
//! # Example
//!
//! ```no_run
//! use slipstream_core::UploadConfig;
//! use slipstream_transport::{
//!     HttpClient, ProgressReporter, ThrottlingTransport, Transport, UploadBody,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig::builder()
//!     .rate_kbps(800)
//!     .rate_window("22:00-06:00")
//!     .show_progress(true)
//!     .build();
//!
//! let file_size = 10_000_000;
//! let transport =
//!     ThrottlingTransport::new(HttpClient::new(&config)?, &config, file_size)?;
//!
//! let reporter = config
//!     .show_progress
//!     .then(|| ProgressReporter::start(transport.session()));
//!
//! // One logical upload, possibly many sequential requests; metadata
//! // requests on the same transport pass through unthrottled.
//! let request = http::Request::builder()
//!     .method(http::Method::PUT)
//!     .uri("https://upload.example.com/session/1")
//!     .header(http::header::CONTENT_TYPE, "video/mp4")
//!     .body(UploadBody::from(vec![0u8; 65536]))?;
//! let response = transport.execute(request).await?;
//!
//! // Resolve the handshake before printing anything else.
//! if let Some(reporter) = reporter {
//!     reporter.shutdown().await;
//! }
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

mod client;
mod progress;
mod session;
mod stream;
mod throttle;
mod transport;

pub use client::HttpClient;
pub use progress::ProgressReporter;
pub use session::{TransferSession, TransferSnapshot};
pub use stream::{ByteStream, RatePolicy, ThrottledReader};
pub use throttle::RateGate;
pub use transport::{ThrottlingTransport, Transport, TransportError, UploadBody};
