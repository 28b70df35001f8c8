//! Server-push transport seam.
//!
//! A [`Transport`] opens one long-lived connection and hands back the raw
//! body as a byte stream. The HTTP implementation uses reqwest; tests swap in
//! scripted transports.

use async_trait::async_trait;
use futures::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;

/// Raw body chunks of an open stream.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Recoverable connection failures. All of these feed the reconnection policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Connect did not complete in time
    #[error("connection timed out after {0}s")]
    Timeout(u64),

    /// Server answered with a non-success status
    #[error("HTTP error: {0}")]
    Status(u16),

    /// Body read failed mid-stream
    #[error("stream read failed: {0}")]
    Read(String),

    /// Server ended the stream
    #[error("stream closed by server")]
    Closed,
}

/// Opens server-push connections.
///
/// Implementations cannot attach custom headers carrying credentials; the
/// token travels in the URL.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection to `url`. Returns once the stream is established.
    async fn connect(&self, url: &Url) -> Result<ByteStream, TransportError>;
}

/// reqwest-backed SSE transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    connect_timeout: Duration,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self::with_client(client, connect_timeout))
    }

    /// Create a transport with a custom HTTP client (for testing).
    pub fn with_client(client: Client, connect_timeout: Duration) -> Self {
        Self {
            client,
            connect_timeout,
        }
    }

    fn classify_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.connect_timeout.as_secs())
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self, url: &Url) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let stream = response.bytes_stream().map(|result| {
            result
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Read(e.to_string()))
        });

        Ok(Box::pin(stream))
    }
}
