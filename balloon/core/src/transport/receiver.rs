//! Control-Channel Receiver
//!
//! Reads framed keyed-text requests from the ghost, turns them into queued
//! [`Command`]s, and answers every one of them on the same channel before
//! reading the next.
//!
//! Two requests never reach the queue:
//! - `Initialize <dir>` records the working directory.
//! - `Endpoint <path> <session id>` records where outbound requests go and
//!   releases startup.
//!
//! The loop ends on a zero-length frame, end of stream, or a stream error.
//! Whatever the cause, the shared context is shut down on the way out.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::frame::{self, Frame, FrameDecoder};
use super::keyed_text::{RequestMessage, ResponseMessage};
use super::TransportError;
use crate::command::Command;
use crate::context::{Endpoint, SharedContext};

/// Protocol version of the control channel
pub const CONTROL_VERSION: &str = "SORAKADO/1.0";

/// Header carrying the command name
const NAME_HEADER: &str = "Command";

/// Prefix of positional fields
const FIELD_PREFIX: &str = "Argument";

/// Reads the control channel until the ghost hangs up
pub struct ControlReceiver<R, W> {
    reader: R,
    writer: W,
    context: Arc<SharedContext>,
}

impl<R, W> ControlReceiver<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a receiver over a byte-stream pair
    pub fn new(reader: R, writer: W, context: Arc<SharedContext>) -> Self {
        Self {
            reader,
            writer,
            context,
        }
    }

    /// Serve requests until the channel closes, then shut the context down
    ///
    /// # Errors
    ///
    /// Returns the stream or framing error that ended the loop. A clean end
    /// marker or end of stream on a frame boundary is `Ok(())`.
    pub async fn run(mut self) -> Result<(), TransportError> {
        let result = self.serve().await;
        match &result {
            Ok(()) => info!("Control channel closed"),
            Err(e) => warn!(error = %e, "Control channel failed"),
        }
        self.context.shutdown();
        result
    }

    async fn serve(&mut self) -> Result<(), TransportError> {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 4096];

        loop {
            while let Some(frame) = decoder.decode()? {
                match frame {
                    Frame::End => return Ok(()),
                    Frame::Payload(payload) => {
                        self.handle(&payload);
                        self.reply().await?;
                    }
                }
            }

            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                let buffered = decoder.available();
                if buffered > 0 {
                    return Err(TransportError::TruncatedFrame { buffered });
                }
                return Ok(());
            }
            decoder.push(&buf[..n]);
        }
    }

    fn handle(&self, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        let request = match RequestMessage::parse(&text) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Dropping malformed control request");
                return;
            }
        };

        let name = request.header(NAME_HEADER).unwrap_or_default();
        let fields = request.indexed(FIELD_PREFIX);

        match (name, fields.as_slice()) {
            ("Initialize", [dir, ..]) => {
                info!(dir = %dir, "Working directory announced");
                self.context.set_working_dir(dir);
                return;
            }
            ("Endpoint", [path, session_id, ..]) => {
                info!(path = %path, "Session endpoint announced");
                self.context.set_endpoint(Endpoint {
                    path: PathBuf::from(path),
                    session_id: session_id.clone(),
                });
                return;
            }
            _ => {}
        }

        debug!(command = %name, args = fields.len(), "Command queued");
        self.context.push_command(Command::new(name, fields));
    }

    async fn reply(&mut self) -> Result<(), TransportError> {
        let response = ResponseMessage::new(CONTROL_VERSION, 204, "No Content")
            .with_header("Charset", "UTF-8");
        let bytes = frame::encode(response.to_string().as_bytes())?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
