//! Shared foundation for the slipstream upload transport.
//!
//! This crate provides the types the transport layer builds on:
//! - Upload configuration ([`UploadConfig`]): rate ceiling, daily rate
//!   window, progress toggle, HTTP executor knobs
//! - Recurring daily rate windows ([`RateWindow`]) with midnight-span and
//!   day-rollover handling
//! - Error types ([`Error`])

pub mod config;
pub mod error;
pub mod window;

pub use config::{KBPS_IN_BYTES_PER_SEC, UploadConfig, UploadConfigBuilder};
pub use error::{Error, Result};
pub use window::RateWindow;
