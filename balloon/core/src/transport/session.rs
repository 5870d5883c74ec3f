//! Session Channel Client
//!
//! One Unix-domain stream connection per outbound request:
//! connect, write the request, half-close, read until the peer closes,
//! parse the status line.
//!
//! Any failure along the way collapses into a synthesized
//! `500 Internal Server Error` so the pipeline only ever reasons about
//! status codes.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::keyed_text::{RequestMessage, ResponseMessage};
use super::TransportError;
use crate::context::Endpoint;
use crate::pipeline::{Method, Request};

/// Protocol version of the session channel
pub const SESSION_VERSION: &str = "SSTP/1.1";

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Sends outbound requests to the ghost's session socket
#[derive(Debug, Clone)]
pub struct SessionClient {
    sender: String,
    connect_timeout: Duration,
}

impl SessionClient {
    /// Create a client identifying itself as `sender`
    pub fn new(sender: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            sender: sender.into(),
            connect_timeout,
        }
    }

    /// Value of the `Sender` header
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Build the wire message for `request`
    #[must_use]
    pub fn compose(&self, request: &Request, session_id: &str) -> RequestMessage {
        let mut msg = RequestMessage::new(request.method.as_str(), SESSION_VERSION)
            .with_header("Charset", "UTF-8")
            .with_header("Sender", self.sender.as_str())
            .with_header("Option", "nodescript")
            .with_header("Ai", session_id);
        match request.method {
            Method::Execute => msg.push_header("Command", request.name.as_str()),
            Method::Notify => msg.push_header("Event", request.name.as_str()),
            Method::Send => msg.push_header("Script", request.script.as_str()),
        }
        msg.push_indexed("Reference", &request.args);
        msg
    }

    /// Deliver one request, never failing
    ///
    /// Transport or parse errors are logged and reported as status `500`.
    pub async fn deliver(&self, endpoint: Option<&Endpoint>, request: &Request) -> ResponseMessage {
        match self.try_deliver(endpoint, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, method = %request.method, name = %request.name, "Session delivery failed");
                internal_error()
            }
        }
    }

    async fn try_deliver(
        &self,
        endpoint: Option<&Endpoint>,
        request: &Request,
    ) -> Result<ResponseMessage, TransportError> {
        let endpoint = endpoint.ok_or(TransportError::NoEndpoint)?;
        let message = self.compose(request, &endpoint.session_id).to_string();

        let connect = UnixStream::connect(&endpoint.path);
        let mut stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::ConnectionFailed {
                path: endpoint.path.clone(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| TransportError::ConnectionFailed {
                path: endpoint.path.clone(),
                reason: e.to_string(),
            })?;

        stream.write_all(message.as_bytes()).await?;
        stream.shutdown().await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        let text = String::from_utf8_lossy(&raw);
        debug!(path = ?endpoint.path, bytes = raw.len(), "Session response received");

        Ok(ResponseMessage::parse(&text)?)
    }
}

fn internal_error() -> ResponseMessage {
    ResponseMessage::new(SESSION_VERSION, 500, "Internal Server Error")
}
