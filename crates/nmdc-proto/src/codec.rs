//! Frame codec for tokio.
//!
//! NMDC frames are terminated by `|`; a single TCP read may contain
//! fragments and multiple frames, so the decoder keeps its scan position
//! across calls. The wire is Latin-1: decoding maps each byte to the char
//! with the same code point and encoding maps it back, so arbitrary bytes
//! survive a round trip.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtoError;
use crate::message::Message;

/// Default maximum frame length. Search results are the largest frames a
/// well-behaved client produces and stay well under this.
pub const MAX_FRAME_LEN: usize = 65536;

/// `|`-delimited frame codec yielding raw frame bodies.
pub struct NmdcCodec {
    /// Index of the next byte to check for the delimiter.
    next_index: usize,
    /// Maximum frame length.
    max_len: usize,
}

impl NmdcCodec {
    /// Create a codec with the default frame limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_FRAME_LEN,
        }
    }

    /// Create a codec with a custom frame limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for NmdcCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn encode_latin1(s: &str, dst: &mut BytesMut) {
    for ch in s.chars() {
        let cp = ch as u32;
        dst.put_u8(if cp < 256 { cp as u8 } else { b'?' });
    }
}

impl Decoder for NmdcCodec {
    type Item = String;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtoError> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'|') {
            let frame = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if frame.len() > self.max_len {
                return Err(ProtoError::FrameTooLong {
                    actual: frame.len(),
                    limit: self.max_len,
                });
            }

            // Drop the trailing delimiter.
            Ok(Some(decode_latin1(&frame[..frame.len() - 1])))
        } else {
            // No complete frame yet; remember where we stopped scanning.
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtoError::FrameTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for NmdcCodec {
    type Error = ProtoError;

    fn encode(&mut self, frame: String, dst: &mut BytesMut) -> Result<(), ProtoError> {
        dst.reserve(frame.len() + 1);
        encode_latin1(&frame, dst);
        dst.put_u8(b'|');
        Ok(())
    }
}

impl Encoder<&Message> for NmdcCodec {
    type Error = ProtoError;

    fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<(), ProtoError> {
        self.encode(msg.to_string(), dst)
    }
}
