//! The round-tripper seam and its throttling decorator.
//!
//! [`Transport`] is the boundary between this crate and whatever stack
//! actually speaks HTTP. [`ThrottlingTransport`] decorates any transport:
//! requests whose body is upload payload get their body swapped for a
//! throttled stream feeding one shared [`TransferSession`]; every other
//! request passes through untouched.

use crate::session::TransferSession;
use crate::stream::{ByteStream, RatePolicy, ThrottledReader};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use http::{Request, Response, header};
use slipstream_core::UploadConfig;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Content-Type prefixes that mark a request body as upload payload.
///
/// The remote media API sends `multipart/related` when the whole file fits
/// in one request and `video/...` for the chunks of a resumable upload.
const UPLOAD_CONTENT_TYPES: [&str; 2] = ["multipart/related", "video"];

/// Errors surfaced by transports.
///
/// The throttling decorator originates none of these: whatever the wrapped
/// transport returns is surfaced unchanged.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP exchange failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the upload body failed.
    #[error("upload body error: {0}")]
    Io(#[from] io::Error),

    /// The request URI is not a fetchable URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Request body handed to a [`Transport`].
pub struct UploadBody {
    stream: ByteStream,
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBody").finish_non_exhaustive()
    }
}

impl UploadBody {
    /// Body from any byte stream.
    #[must_use]
    pub fn from_stream(stream: ByteStream) -> Self {
        Self { stream }
    }

    /// Body with no payload.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            stream: Box::pin(stream::empty::<io::Result<Bytes>>()),
        }
    }

    /// Consume into the underlying stream.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }
}

impl From<Bytes> for UploadBody {
    fn from(bytes: Bytes) -> Self {
        Self {
            stream: Box::pin(stream::iter([Ok::<_, io::Error>(bytes)])),
        }
    }
}

impl From<Vec<u8>> for UploadBody {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

/// An HTTP round-tripper: carries a prepared request to the remote API and
/// returns its response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one HTTP exchange.
    async fn execute(
        &self,
        request: Request<UploadBody>,
    ) -> Result<Response<Bytes>, TransportError>;
}

/// Transport decorator that throttles upload payloads and accounts them
/// into one [`TransferSession`].
///
/// The session is seeded with the logical upload's total size at
/// construction and shared by every matching request, so statistics
/// continue across chunk boundaries instead of resetting with each HTTP
/// exchange. Likewise the rate window's day roll-forward survives request
/// boundaries because the policy is shared, not rebuilt.
pub struct ThrottlingTransport<T> {
    inner: T,
    policy: Arc<RatePolicy>,
    session: TransferSession,
}

impl<T> std::fmt::Debug for ThrottlingTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottlingTransport")
            .field("policy", &self.policy)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<T> ThrottlingTransport<T> {
    /// Decorate `inner` for one logical upload of `total_bytes`.
    ///
    /// Fails only if the configured window string does not parse.
    pub fn new(inner: T, config: &UploadConfig, total_bytes: u64) -> slipstream_core::Result<Self> {
        Ok(Self {
            inner,
            policy: Arc::new(RatePolicy::from_config(config)?),
            session: TransferSession::new(total_bytes),
        })
    }

    /// Handle to the shared transfer session, e.g. for a progress reporter.
    #[must_use]
    pub fn session(&self) -> TransferSession {
        self.session.clone()
    }
}

fn is_upload_payload<B>(request: &Request<B>) -> bool {
    let Some(content_type) = request.headers().get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    UPLOAD_CONTENT_TYPES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}

#[async_trait]
impl<T: Transport> Transport for ThrottlingTransport<T> {
    async fn execute(
        &self,
        request: Request<UploadBody>,
    ) -> Result<Response<Bytes>, TransportError> {
        let request = if is_upload_payload(&request) {
            trace!(uri = %request.uri(), "throttling upload payload");
            let (parts, body) = request.into_parts();
            let throttled = ThrottledReader::new(
                body.into_stream(),
                Arc::clone(&self.policy),
                self.session.clone(),
            );
            Request::from_parts(parts, UploadBody::from_stream(Box::pin(throttled)))
        } else {
            trace!(uri = %request.uri(), "not upload payload, passing through");
            request
        };
        self.inner.execute(request).await
    }
}
