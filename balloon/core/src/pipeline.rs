//! Outbound Notification Pipeline
//!
//! A single background task that drains the batch queue and delivers each
//! request to the ghost over the session channel.
//!
//! # Ordering
//!
//! - Batches are delivered strictly in submission order.
//! - Requests inside a batch are delivered one at a time, in order.
//! - The first response that is not `204` abandons the rest of its batch.
//!   Later batches still run.
//!
//! The task exits the first time it wakes to a non-empty queue after the
//! control channel has closed.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::SharedContext;
#[cfg(unix)]
use crate::transport::SessionClient;

/// Status code that lets a batch continue
pub const STATUS_NO_CONTENT: u16 = 204;

/// Which payload header an outbound request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `EXECUTE` with a `Command` header
    Execute,
    /// `NOTIFY` with an `Event` header
    Notify,
    /// `SEND` with a `Script` header
    Send,
}

impl Method {
    /// Wire token for the request line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "EXECUTE",
            Self::Notify => "NOTIFY",
            Self::Send => "SEND",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Command or event name (unused for [`Method::Send`])
    pub name: String,
    /// Positional `Reference{N}` values
    pub args: Vec<String>,
    /// Script body (only used for [`Method::Send`])
    pub script: String,
}

impl Request {
    /// `EXECUTE` request
    pub fn execute(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            method: Method::Execute,
            name: name.into(),
            args,
            script: String::new(),
        }
    }

    /// `NOTIFY` request
    pub fn notify(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            method: Method::Notify,
            name: name.into(),
            args,
            script: String::new(),
        }
    }

    /// `SEND` request carrying a script body
    pub fn send(script: impl Into<String>) -> Self {
        Self {
            method: Method::Send,
            name: String::new(),
            args: Vec::new(),
            script: script.into(),
        }
    }
}

/// Ordered group of requests delivered as one sequencing unit
///
/// An empty batch is the shutdown sentinel and is skipped.
pub type Batch = Vec<Request>;

/// The sender task
#[cfg(unix)]
pub struct NotificationPipeline {
    context: Arc<SharedContext>,
    client: SessionClient,
}

#[cfg(unix)]
impl NotificationPipeline {
    /// Create a pipeline delivering through `client`
    pub fn new(context: Arc<SharedContext>, client: SessionClient) -> Self {
        Self { context, client }
    }

    /// Run until the control channel closes
    pub async fn run(self) {
        info!("Notification pipeline started");
        while let Some(batches) = self.context.next_batches().await {
            for batch in batches {
                self.deliver_batch(&batch).await;
            }
        }
        info!("Notification pipeline stopped");
    }

    /// Deliver one batch, stopping at the first non-success status
    ///
    /// Returns the number of requests that were attempted.
    pub async fn deliver_batch(&self, batch: &[Request]) -> usize {
        let endpoint = self.context.endpoint();
        for (attempted, request) in batch.iter().enumerate() {
            let response = self.client.deliver(endpoint.as_ref(), request).await;
            if response.status() != STATUS_NO_CONTENT {
                warn!(
                    method = %request.method,
                    name = %request.name,
                    status = response.status(),
                    skipped = batch.len() - attempted - 1,
                    "Request failed, abandoning rest of batch"
                );
                return attempted + 1;
            }
            debug!(method = %request.method, name = %request.name, "Request delivered");
        }
        batch.len()
    }
}
