//! Concrete HTTP executor over reqwest.
//!
//! Request construction belongs to the surrounding API client; this
//! executor only carries a prepared request across the wire, streaming its
//! body rather than buffering it.

use crate::transport::{Transport, TransportError, UploadBody};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use slipstream_core::UploadConfig;
use tracing::{debug, trace};
use url::Url;

/// Pooled rustls HTTP client implementing [`Transport`].
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build an executor from configuration.
    pub fn new(config: &UploadConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .tcp_nodelay(true)
            .use_rustls_tls();

        // A throttled chunk can legitimately take hours, so only a caller
        // who asked for a total timeout gets one.
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(
        &self,
        request: Request<UploadBody>,
    ) -> Result<Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let url = Url::parse(&parts.uri.to_string())
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", parts.uri)))?;

        debug!(method = %parts.method, url = %url, "executing request");

        let response = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .body(reqwest::Body::wrap_stream(body.into_stream()))
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        trace!(%status, "response received");
        let bytes = response.bytes().await?;

        let mut response = Response::new(bytes);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
