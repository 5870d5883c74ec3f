//! Transport Layer for the Ghost Channels
//!
//! Two channels connect the overlay to its ghost process:
//! - **Control channel** (inbound): length-prefixed keyed-text requests on
//!   stdin, each answered synchronously on stdout. See [`receiver`].
//! - **Session channel** (outbound): one Unix-domain stream connection per
//!   request to the endpoint announced by the ghost. See [`session`].
//!
//! Both channels speak the same line-oriented keyed-text grammar, implemented
//! once in [`keyed_text`]. Only the control channel is framed ([`frame`]); the
//! session channel delimits a message by half-closing the connection.

pub mod frame;
pub mod keyed_text;
pub mod receiver;
#[cfg(unix)]
pub mod session;

use std::path::PathBuf;

use thiserror::Error;

pub use frame::{Frame, FrameDecoder, MAX_FRAME_SIZE};
pub use keyed_text::{ProtocolError, RequestMessage, ResponseMessage};
pub use receiver::ControlReceiver;
#[cfg(unix)]
pub use session::SessionClient;

/// Errors raised while moving bytes over either channel
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared frame length is larger than [`MAX_FRAME_SIZE`]
    ///
    /// The limit is a fixed safety cap, not part of the wire format. The
    /// receiver ends the session when it is hit.
    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared payload length
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// The stream ended part-way through a frame
    #[error("Stream ended inside a frame ({buffered} bytes buffered)")]
    TruncatedFrame {
        /// Bytes that were buffered when the stream closed
        buffered: usize,
    },

    /// Keyed-text grammar violation
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No `Endpoint` request has been received yet
    #[error("No session endpoint has been announced")]
    NoEndpoint,

    /// Connection to the session endpoint failed
    #[error("Connection to {path} failed: {reason}")]
    ConnectionFailed {
        /// Endpoint path
        path: PathBuf,
        /// Human-readable cause
        reason: String,
    },
}
