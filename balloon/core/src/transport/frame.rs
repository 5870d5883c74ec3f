//! Control-Channel Framing
//!
//! Every message on the control channel is a native-endian length prefix
//! followed by exactly that many bytes of keyed text.
//!
//! # Frame Format
//!
//! ```text
//! +----------------+------------------------------------------+
//! | Length (4)     | Keyed-text payload (variable)            |
//! | native u32     | request or response                      |
//! +----------------+------------------------------------------+
//! ```
//!
//! A length of zero is the ghost's end-of-session marker. The decoder reports
//! it as [`Frame::End`] rather than as an empty payload.

use tracing::warn;

use super::TransportError;

/// Safety limit on a single control frame (16 MB)
///
/// A larger declared length is read as a corrupted stream and ends the
/// session.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Length prefix size
const HEADER_SIZE: usize = 4;

/// One decoded unit of the control channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete payload
    Payload(Vec<u8>),
    /// Zero-length frame: the peer is done talking
    End,
}

/// Encode a payload into a length-prefixed frame
///
/// # Errors
///
/// Returns `TransportError::FrameTooLarge` if the payload exceeds
/// [`MAX_FRAME_SIZE`]. An empty payload encodes the end-of-session marker.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&len.to_ne_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decoder state machine for streaming frame parsing
///
/// Buffers incoming bytes and yields complete frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
        }
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        // Compact buffer if we've consumed a lot
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Get the number of bytes available in the buffer
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Try to decode the next frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame (or the end marker) was decoded
    /// - `Ok(None)` if more data is needed
    /// - `Err(TransportError::FrameTooLarge)` if the declared length is absurd
    pub fn decode(&mut self) -> Result<Option<Frame>, TransportError> {
        let available = self.available();
        if available < HEADER_SIZE {
            return Ok(None);
        }

        let len_bytes = &self.buffer[self.read_pos..self.read_pos + HEADER_SIZE];
        let len =
            u32::from_ne_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        if len == 0 {
            self.read_pos += HEADER_SIZE;
            return Ok(Some(Frame::End));
        }

        if len > MAX_FRAME_SIZE {
            warn!(size = len, max = MAX_FRAME_SIZE, "Declared frame length over limit");
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        if available < HEADER_SIZE + len {
            return Ok(None);
        }

        let payload_start = self.read_pos + HEADER_SIZE;
        let payload_end = payload_start + len;
        let payload = self.buffer[payload_start..payload_end].to_vec();
        self.read_pos = payload_end;

        Ok(Some(Frame::Payload(payload)))
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_native_endian_prefix() {
        let frame = encode(b"abc").unwrap();
        assert_eq!(&frame[..4], &3u32.to_ne_bytes());
        assert_eq!(&frame[4..], b"abc");
    }

    #[test]
    fn test_empty_payload_encodes_end_marker() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&encode(b"").unwrap());
        assert_eq!(decoder.decode().unwrap(), Some(Frame::End));
    }

    #[test]
    fn test_decoder_partial_frame() {
        let frame = encode(b"EXECUTE SORAKADO/1.0\r\n\r\n").unwrap();
        let mut decoder = FrameDecoder::new();

        decoder.push(&frame[..2]);
        assert!(decoder.decode().unwrap().is_none());

        decoder.push(&frame[2..10]);
        assert!(decoder.decode().unwrap().is_none());

        decoder.push(&frame[10..]);
        assert_eq!(
            decoder.decode().unwrap(),
            Some(Frame::Payload(b"EXECUTE SORAKADO/1.0\r\n\r\n".to_vec()))
        );
        assert_eq!(decoder.available(), 0);
    }

    #[test]
    fn test_decoder_multiple_frames_in_one_push() {
        let mut bytes = encode(b"first").unwrap();
        bytes.extend(encode(b"second").unwrap());

        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);

        assert_eq!(decoder.decode().unwrap(), Some(Frame::Payload(b"first".to_vec())));
        assert_eq!(decoder.decode().unwrap(), Some(Frame::Payload(b"second".to_vec())));
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_zero_length_is_end_marker() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&0u32.to_ne_bytes());
        decoder.push(&encode(b"ignored").unwrap());

        assert_eq!(decoder.decode().unwrap(), Some(Frame::End));
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut decoder = FrameDecoder::new();
        #[allow(clippy::cast_possible_truncation)]
        let len = (MAX_FRAME_SIZE + 1) as u32;
        decoder.push(&len.to_ne_bytes());

        match decoder.decode() {
            Err(TransportError::FrameTooLarge { size, .. }) => assert_eq!(size, MAX_FRAME_SIZE + 1),
            other => panic!("expected FrameTooLarge, got {other:?}"),
        }
    }
}
