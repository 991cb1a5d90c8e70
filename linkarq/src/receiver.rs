//! Go-Back-N receiver: strict in-order acceptance and cumulative ACKs.
//!
//! Mirrors [`crate::sender`]: the receiver owns no reference to the
//! channel or sender, only the frames that reach it. [`crate::session`]
//! wires the two together through a [`crate::channel::Channel`].

use crate::frame::{Frame, FrameKind};

/// Running counters for a receiver's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Accumulates in-order DATA frames and decides what ACK, if any, to
/// send back for each one received.
pub struct Receiver {
    last_accepted: Option<u8>,
    delivered: Vec<Vec<u8>>,
    stats: ReceiverStats,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            last_accepted: None,
            delivered: Vec::new(),
            stats: ReceiverStats::default(),
        }
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn last_accepted(&self) -> Option<u8> {
        self.last_accepted
    }

    pub fn frames_delivered(&self) -> usize {
        self.delivered.len()
    }

    /// Processes bytes that arrived over the channel. Returns the ACK
    /// frame to send back, or `None` if nothing should be acknowledged
    /// at all -- either the frame failed its structural or CRC check
    /// (discarded silently, no ACK, no NAK), or it wasn't even a DATA
    /// frame to begin with.
    pub fn on_frame(&mut self, bytes: &[u8]) -> Option<Frame> {
        let (frame, crc_valid) = match Frame::deserialize(bytes) {
            Ok(result) => result,
            Err(_) => {
                self.stats.rejected += 1;
                return None;
            }
        };

        if !crc_valid || frame.kind != FrameKind::Data {
            self.stats.rejected += 1;
            return None;
        }

        let expected = self.last_accepted.map_or(0u8, |s| s.wrapping_add(1));

        if frame.seq == expected {
            self.delivered.push(frame.payload);
            self.last_accepted = Some(frame.seq);
            self.stats.accepted += 1;
            Some(Frame::ack(frame.seq))
        } else {
            // Out of order or a duplicate of something already accepted:
            // re-send the last cumulative ACK, never a NAK.
            self.stats.rejected += 1;
            self.last_accepted.map(Frame::ack)
        }
    }

    /// Concatenates accepted payloads in sequence order.
    pub fn reassemble(&self) -> Vec<u8> {
        self.delivered.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_order_frames_and_reassembles() {
        let mut receiver = Receiver::new();
        let ack0 = receiver.on_frame(&Frame::data(0, b"foo".to_vec()).serialize());
        let ack1 = receiver.on_frame(&Frame::data(1, b"bar".to_vec()).serialize());

        assert_eq!(ack0, Some(Frame::ack(0)));
        assert_eq!(ack1, Some(Frame::ack(1)));
        assert_eq!(receiver.reassemble(), b"foobar".to_vec());
        assert_eq!(receiver.stats(), ReceiverStats { accepted: 2, rejected: 0 });
    }

    #[test]
    fn out_of_order_frame_is_rejected_with_duplicate_ack() {
        let mut receiver = Receiver::new();
        receiver.on_frame(&Frame::data(0, b"foo".to_vec()).serialize());
        let ack = receiver.on_frame(&Frame::data(2, b"baz".to_vec()).serialize());

        assert_eq!(ack, Some(Frame::ack(0)));
        assert_eq!(receiver.stats().rejected, 1);
        assert_eq!(receiver.reassemble(), b"foo".to_vec());
    }

    #[test]
    fn duplicate_of_last_accepted_gets_no_nak_just_a_repeat_ack() {
        let mut receiver = Receiver::new();
        receiver.on_frame(&Frame::data(0, b"foo".to_vec()).serialize());
        let ack = receiver.on_frame(&Frame::data(0, b"foo".to_vec()).serialize());

        assert_eq!(ack, Some(Frame::ack(0)));
        assert_eq!(receiver.frames_delivered(), 1);
    }

    #[test]
    fn rejection_before_any_acceptance_emits_no_ack() {
        let mut receiver = Receiver::new();
        let ack = receiver.on_frame(&Frame::data(1, b"bar".to_vec()).serialize());
        assert_eq!(ack, None);
        assert_eq!(receiver.stats().rejected, 1);
    }

    #[test]
    fn crc_failure_is_silently_discarded() {
        let mut receiver = Receiver::new();
        let mut bytes = Frame::data(0, b"foo".to_vec()).serialize();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let ack = receiver.on_frame(&bytes);
        assert_eq!(ack, None);
        assert_eq!(receiver.stats().rejected, 1);
        assert_eq!(receiver.frames_delivered(), 0);
    }

    #[test]
    fn too_short_buffer_is_silently_discarded() {
        let mut receiver = Receiver::new();
        assert_eq!(receiver.on_frame(&[1, 2, 3]), None);
        assert_eq!(receiver.stats().rejected, 1);
    }

    #[test]
    fn declared_length_beyond_buffer_counts_as_rejected() {
        let mut receiver = Receiver::new();
        // Header claims a 100-byte payload but none is present -- a
        // structural failure, not a CRC mismatch.
        let bytes = [0u8, 0u8, 0u8, 100u8, 0u8, 0u8];
        assert_eq!(receiver.on_frame(&bytes), None);
        assert_eq!(receiver.stats().rejected, 1);
    }

    #[test]
    fn ack_frame_sent_to_receiver_is_rejected_not_accepted() {
        let mut receiver = Receiver::new();
        let ack = receiver.on_frame(&Frame::ack(0).serialize());
        assert_eq!(ack, None);
        assert_eq!(receiver.stats().rejected, 1);
    }
}
