//! Wire-format frame: header + payload + CRC.
//!
//! ```text
//! byte 0      seq (u8)
//! byte 1      kind (0 = DATA, 1 = ACK)
//! bytes 2-3   length (u16, big-endian)
//! bytes 4..   payload (length bytes)
//! last 2      crc16 over header || payload (big-endian)
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::crc::{crc16, crc16_is_valid};
use crate::error::FrameError;

/// Maximum payload size for a DATA frame.
pub const MAX_PAYLOAD: usize = 100;

const HEADER_LEN: usize = 4;
const CRC_LEN: usize = 2;
const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;

/// Discriminates a data-carrying frame from an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Ack,
}

impl FrameKind {
    fn to_byte(self) -> u8 {
        match self {
            FrameKind::Data => 0,
            FrameKind::Ack => 1,
        }
    }

    fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            FrameKind::Data
        } else {
            FrameKind::Ack
        }
    }
}

/// A single frame, either carrying a chunk of the message or
/// acknowledging one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u8,
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a DATA frame. `payload` must be at most [`MAX_PAYLOAD`] bytes;
    /// the sender's fragmentation step guarantees this.
    pub fn data(seq: u8, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            seq,
            kind: FrameKind::Data,
            payload,
        }
    }

    /// Build an ACK frame for sequence number `seq`.
    pub fn ack(seq: u8) -> Self {
        Self {
            seq,
            kind: FrameKind::Ack,
            payload: Vec::new(),
        }
    }

    /// Serializes the frame to its wire representation, appending a
    /// freshly computed CRC.
    pub fn serialize(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(HEADER_LEN + self.payload.len() + CRC_LEN);
        body.push(self.seq);
        body.push(self.kind.to_byte());
        body.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.payload);

        let crc = crc16(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        body
    }

    /// Parses a frame from `bytes`. Returns the frame together with a
    /// `crc_valid` flag -- the frame is returned even when the CRC check
    /// fails, so a caller may still inspect the claimed sequence number,
    /// but `crc_valid` is the authoritative integrity signal. Fails only
    /// on structural problems: too short, or a declared length the
    /// buffer can't back.
    pub fn deserialize(bytes: &[u8]) -> Result<(Frame, bool), FrameError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        let seq = bytes[0];
        let kind = FrameKind::from_byte(bytes[1]);
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let total = HEADER_LEN + length + CRC_LEN;

        if bytes.len() < total {
            return Err(FrameError::LengthMismatch {
                declared: length,
                available: bytes.len(),
            });
        }

        let payload = bytes[HEADER_LEN..HEADER_LEN + length].to_vec();
        let crc_valid = crc16_is_valid(&bytes[..total]);

        Ok((Frame { seq, kind, payload }, crc_valid))
    }
}

/// `tokio_util` codec over [`Frame`], for driving frames through a
/// `FramedRead`/`FramedWrite` pair. Not used by [`crate::channel`]'s
/// in-process simulation, which talks `Vec<u8>` directly, but kept as the
/// byte-stream-oriented entry point for a real serial/socket transport.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Encoder<Frame> for FrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.serialize());
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        if src.len() < MIN_FRAME_LEN {
            return Ok(None);
        }

        let length = u16::from_be_bytes([src[2], src[3]]) as usize;
        let total = HEADER_LEN + length + CRC_LEN;
        if src.len() < total {
            return Ok(None);
        }

        let bytes = src.split_to(total);
        match Frame::deserialize(&bytes) {
            Ok((frame, true)) => Ok(Some(frame)),
            Ok((_, false)) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "frame failed CRC check",
            )),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        }
    }
}
