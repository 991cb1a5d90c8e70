//! Session driver: wires sender, receiver, and channel into a single
//! cooperative loop and reports what happened.
//!
//! One `async fn` owns the event
//! loop, state mutation happens synchronously between awaits, and every
//! phase transition is logged via `crate::tracing::prelude`.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};

use crate::channel::Channel;
use crate::error::SessionError;
use crate::frame::{Frame, FrameKind};
use crate::receiver::Receiver;
use crate::sender::{Sender, SenderConfig};
use crate::tracing::prelude::*;

/// Tunables for a session, with the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub window_size: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let defaults = SenderConfig::default();
        Self {
            window_size: defaults.window_size,
            timeout: defaults.timeout,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// Outcome of driving one message to completion or terminal failure.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub sent: u64,
    pub retransmitted: u64,
    pub acks: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub duration: Duration,
    pub success: bool,
    pub retransmission_rate: f64,
}

/// Composes a [`Sender`], a [`Receiver`], and a [`Channel`] and drives
/// one message transmission.
pub struct Session {
    channel: Box<dyn Channel>,
    sender: Sender,
    receiver: Receiver,
    idle_tick: Duration,
}

impl Session {
    pub fn new(channel: Box<dyn Channel>, message: &[u8], config: SessionConfig) -> Self {
        let idle_tick = (config.timeout / 20).max(Duration::from_millis(1));
        let sender_config = SenderConfig {
            window_size: config.window_size,
            timeout: config.timeout,
            max_attempts: config.max_attempts,
        };

        Self {
            channel,
            sender: Sender::new(message, sender_config),
            receiver: Receiver::new(),
            idle_tick,
        }
    }

    /// Drives the session to completion or abandonment and returns the
    /// final report. The reassembled bytes are available afterwards via
    /// [`Session::reassembled`].
    pub async fn run(&mut self) -> SessionReport {
        let start = Instant::now();
        let mut failure: Option<SessionError> = None;

        while !self.sender.is_complete() {
            if let Some(err) = self.step().await {
                failure = Some(err);
                break;
            }
        }

        let duration = start.elapsed();
        let sender_stats = self.sender.stats();
        let receiver_stats = self.receiver.stats();

        match &failure {
            Some(err) => error!("session failed: {err}"),
            None => info!(
                sent = sender_stats.frames_sent,
                retransmitted = sender_stats.frames_retransmitted,
                acks = sender_stats.acks_received,
                "session complete"
            ),
        }

        let total_transmissions = sender_stats.frames_sent + sender_stats.frames_retransmitted;
        let retransmission_rate = if total_transmissions > 0 {
            sender_stats.frames_retransmitted as f64 / total_transmissions as f64
        } else {
            0.0
        };

        SessionReport {
            sent: sender_stats.frames_sent,
            retransmitted: sender_stats.frames_retransmitted,
            acks: sender_stats.acks_received,
            accepted: receiver_stats.accepted,
            rejected: receiver_stats.rejected,
            duration,
            success: failure.is_none(),
            retransmission_rate,
        }
    }

    /// The reassembled message, valid whether or not the session
    /// succeeded (a failed session simply hasn't delivered everything).
    pub fn reassembled(&self) -> Vec<u8> {
        self.receiver.reassemble()
    }

    /// One round of the Go-Back-N loop. `Some(err)` means a frame was
    /// just abandoned and the session is over.
    async fn step(&mut self) -> Option<SessionError> {
        let now = Instant::now();

        if self.sender.base_timed_out(now) {
            return self.retransmit_window().await;
        }

        let unsent = self.sender.unsent_in_window();
        if unsent.is_empty() {
            sleep(self.idle_tick).await;
            return None;
        }

        for i in unsent {
            self.transmit_data_frame(i, false).await;
            if self.sender.is_complete() {
                break;
            }
        }

        None
    }

    async fn retransmit_window(&mut self) -> Option<SessionError> {
        for &i in &self.sender.window_indices() {
            if self.sender.would_abandon(i) {
                let attempts = self.sender.attempts_for(i);
                warn!(seq = i as u8, attempts, "abandoning frame");
                return Some(SessionError::Abandoned { seq: i as u8, attempts });
            }
        }

        for i in self.sender.window_indices() {
            self.transmit_data_frame(i, true).await;
        }

        None
    }

    async fn transmit_data_frame(&mut self, i: usize, is_retransmit: bool) {
        let frame = self.sender.build_frame(i);
        trace!(
            seq = frame.seq,
            len = frame.payload.len(),
            retransmit = is_retransmit,
            "sending data frame"
        );
        self.sender.record_transmission(i, Instant::now(), is_retransmit);

        let Some(received) = self.channel.transmit(frame.serialize()).await else {
            return;
        };

        let Some(ack_frame) = self.receiver.on_frame(&received) else {
            return;
        };

        let Some(ack_bytes) = self.channel.transmit(ack_frame.serialize()).await else {
            return;
        };

        if let Ok((ack, true)) = Frame::deserialize(&ack_bytes) {
            if ack.kind == FrameKind::Ack {
                self.sender.apply_ack(ack.seq);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SimChannel;
    use async_trait::async_trait;

    fn config() -> SessionConfig {
        SessionConfig {
            window_size: 5,
            timeout: Duration::from_millis(250),
            max_attempts: 5,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lossless_channel_delivers_message_with_no_retransmissions() {
        let message = vec![7u8; 250]; // 3 fragments: 100, 100, 50
        let mut session = Session::new(Box::new(SimChannel::perfect()), &message, config());
        let report = session.run().await;

        assert!(report.success);
        assert_eq!(report.retransmitted, 0);
        assert_eq!(report.sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reassembled_bytes_match_original_message() {
        let message = vec![7u8; 250]; // 3 fragments: 100, 100, 50
        let mut session = Session::new(Box::new(SimChannel::perfect()), &message, config());
        let report = session.run().await;

        assert!(report.success);
        assert_eq!(session.reassembled(), message);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_message_completes_immediately_with_nothing_sent() {
        let mut session = Session::new(Box::new(SimChannel::perfect()), &[], config());
        let report = session.run().await;

        assert!(report.success);
        assert_eq!(report.sent, 0);
        assert_eq!(session.reassembled(), Vec::<u8>::new());
    }

    /// Drops the very first attempt at a chosen DATA sequence number,
    /// then behaves as a perfect channel. Forces exactly one timeout
    /// and retransmission without otherwise perturbing the session.
    struct DropOnceChannel {
        drop_seq: u8,
        dropped: bool,
    }

    #[async_trait]
    impl Channel for DropOnceChannel {
        async fn transmit(&mut self, bytes: Vec<u8>) -> Option<Vec<u8>> {
            if let Ok((frame, _)) = Frame::deserialize(&bytes) {
                if !self.dropped && frame.kind == FrameKind::Data && frame.seq == self.drop_seq {
                    self.dropped = true;
                    return None;
                }
            }
            Some(bytes)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_frame_is_retransmitted_after_timeout_and_still_delivered() {
        let message = b"AAABBBCCC".to_vec();
        let channel = DropOnceChannel { drop_seq: 0, dropped: false };
        let mut session = Session::new(Box::new(channel), &message, config());
        let report = session.run().await;

        assert!(report.success);
        assert!(report.retransmitted >= 1);
        assert_eq!(session.reassembled(), message);
    }

    /// Never delivers frame 0's DATA, forcing the sender to exhaust its
    /// retry budget and abandon.
    struct AlwaysDropSeq {
        seq: u8,
    }

    #[async_trait]
    impl Channel for AlwaysDropSeq {
        async fn transmit(&mut self, bytes: Vec<u8>) -> Option<Vec<u8>> {
            if let Ok((frame, _)) = Frame::deserialize(&bytes) {
                if frame.kind == FrameKind::Data && frame.seq == self.seq {
                    return None;
                }
            }
            Some(bytes)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_retries_abandons_the_session() {
        let message = b"AAABBBCCC".to_vec();
        let channel = AlwaysDropSeq { seq: 0 };
        let mut session = Session::new(
            Box::new(channel),
            &message,
            SessionConfig {
                window_size: 5,
                timeout: Duration::from_millis(10),
                max_attempts: 3,
            },
        );
        let report = session.run().await;

        assert!(!report.success);
        assert_eq!(report.accepted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn narrow_window_still_delivers_message_in_order() {
        let message = vec![3u8; 500]; // 5 fragments
        let mut session = Session::new(
            Box::new(SimChannel::perfect()),
            &message,
            SessionConfig {
                window_size: 2,
                timeout: Duration::from_millis(250),
                max_attempts: 5,
            },
        );
        let report = session.run().await;

        assert!(report.success);
        assert_eq!(session.reassembled(), message);
    }
}
