//! Error types for the frame codec, bit codec, and session driver.
//!
//! Transient protocol events -- loss, corruption, out-of-order arrival --
//! are never surfaced as `Err`; they are counted by the sender/receiver and
//! handled per the Go-Back-N retransmission policy. Only structural
//! deserialization failures and terminal session abandonment are errors.

use thiserror::Error;

/// Structural failures when parsing a frame off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short: {len} bytes, need at least 6")]
    TooShort { len: usize },

    #[error("declared length {declared} exceeds available bytes {available}")]
    LengthMismatch { declared: usize, available: usize },
}

/// Failures in the HDLC bit-stuffing / flag-delimiting codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitCodecError {
    #[error("no complete FLAG-delimited frame found")]
    NotFramed,
}

/// Terminal failure of a Go-Back-N session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("frame {seq} abandoned after {attempts} attempts without acknowledgment")]
    Abandoned { seq: u8, attempts: u32 },
}
