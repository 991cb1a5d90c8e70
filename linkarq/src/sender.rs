//! Go-Back-N sender: fragmentation, window management, timers, and
//! cumulative-ACK bookkeeping.
//!
//! The sender holds no reference to the channel or receiver; [`crate::session`]
//! drives it through these primitives, keeping the state machine testable
//! in isolation (see the tests below). Sender and receiver share no
//! mutable state directly -- only the channel mediates between them.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::frame::{Frame, MAX_PAYLOAD};

/// Tunables for a sender, with the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct SenderConfig {
    pub window_size: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            timeout: Duration::from_millis(250),
            max_attempts: 5,
        }
    }
}

/// Statistics accumulated over a sender's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SenderStats {
    pub frames_sent: u64,
    pub frames_retransmitted: u64,
    pub acks_received: u64,
}

/// Go-Back-N sender state for a single message.
pub struct Sender {
    frames: Vec<Vec<u8>>,
    base: usize,
    window_size: usize,
    timeout: Duration,
    max_attempts: u32,
    attempts: Vec<u32>,
    send_time: Vec<Option<Instant>>,
    ack_set: BTreeSet<u8>,
    stats: SenderStats,
}

impl Sender {
    /// Fragments `message` into chunks of at most [`MAX_PAYLOAD`] bytes,
    /// preserving order.
    pub fn new(message: &[u8], config: SenderConfig) -> Self {
        let frames: Vec<Vec<u8>> = if message.is_empty() {
            Vec::new()
        } else {
            message.chunks(MAX_PAYLOAD).map(|c| c.to_vec()).collect()
        };
        let n = frames.len();

        Self {
            frames,
            base: 0,
            window_size: config.window_size,
            timeout: config.timeout,
            max_attempts: config.max_attempts,
            attempts: vec![0; n],
            send_time: vec![None; n],
            ack_set: BTreeSet::new(),
            stats: SenderStats::default(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn is_complete(&self) -> bool {
        self.base >= self.frames.len()
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    pub fn attempts_for(&self, i: usize) -> u32 {
        self.attempts[i]
    }

    fn window_end(&self) -> usize {
        (self.base + self.window_size).min(self.frames.len())
    }

    /// Indices in the current window, in order.
    pub fn window_indices(&self) -> Vec<usize> {
        (self.base..self.window_end()).collect()
    }

    /// Indices in the current window that have never been transmitted.
    pub fn unsent_in_window(&self) -> Vec<usize> {
        self.window_indices()
            .into_iter()
            .filter(|&i| self.attempts[i] == 0)
            .collect()
    }

    /// Builds the DATA frame for index `i`.
    pub fn build_frame(&self, i: usize) -> Frame {
        Frame::data(i as u8, self.frames[i].clone())
    }

    /// Whether transmitting frame `i` again would exceed `max_attempts`.
    pub fn would_abandon(&self, i: usize) -> bool {
        self.attempts[i] >= self.max_attempts
    }

    /// Records that frame `i` was just put on the wire.
    pub fn record_transmission(&mut self, i: usize, now: Instant, is_retransmit: bool) {
        self.send_time[i] = Some(now);
        self.attempts[i] += 1;
        if is_retransmit {
            self.stats.frames_retransmitted += 1;
        } else {
            self.stats.frames_sent += 1;
        }
    }

    /// Whether the oldest unacknowledged frame has exceeded `timeout`.
    pub fn base_timed_out(&self, now: Instant) -> bool {
        if self.base >= self.frames.len() {
            return false;
        }
        match self.send_time[self.base] {
            Some(sent_at) => now.duration_since(sent_at) > self.timeout,
            None => false,
        }
    }

    /// Applies a cumulative ACK for sequence `k`: every frame in
    /// `base..=k` becomes acknowledged, and the window advances past any
    /// now-contiguous run of acknowledged frames at its base.
    pub fn apply_ack(&mut self, k: u8) {
        self.stats.acks_received += 1;

        let upper = k as usize;
        for j in self.base..=upper.min(self.frames.len().saturating_sub(1)) {
            if j > upper {
                break;
            }
            self.ack_set.insert(j as u8);
            self.send_time[j] = None;
        }

        self.advance_window();
    }

    fn advance_window(&mut self) {
        while self.base < self.frames.len() && self.ack_set.contains(&(self.base as u8)) {
            self.ack_set.remove(&(self.base as u8));
            self.base += 1;
        }
        self.ack_set.retain(|&s| (s as usize) >= self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(message: &[u8], window: usize) -> Sender {
        Sender::new(
            message,
            SenderConfig {
                window_size: window,
                timeout: Duration::from_millis(250),
                max_attempts: 5,
            },
        )
    }

    #[test]
    fn fragments_respect_max_payload() {
        let message = vec![0u8; 250];
        let sender = sender(&message, 5);
        assert_eq!(sender.frame_count(), 3);
    }

    #[test]
    fn fragment_sizes_match_boundary_scenario() {
        let message = vec![0u8; 250];
        let sender = sender(&message, 5);
        let sizes: Vec<usize> = (0..sender.frame_count())
            .map(|i| sender.build_frame(i).payload.len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn empty_message_yields_zero_frames_and_is_immediately_complete() {
        let sender = sender(&[], 5);
        assert_eq!(sender.frame_count(), 0);
        assert!(sender.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn base_times_out_after_configured_duration() {
        let mut sender = sender(b"AAABBBCCC", 5);
        sender.record_transmission(0, Instant::now(), false);
        assert!(!sender.base_timed_out(Instant::now()));

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(sender.base_timed_out(Instant::now()));
    }

    #[test]
    fn cumulative_ack_advances_base_past_acknowledged_run() {
        let message = vec![0u8; 250]; // 3 frames: 100, 100, 50
        let mut sender = sender(&message, 5);
        let now = tokio::time::Instant::now();
        for i in sender.unsent_in_window() {
            sender.record_transmission(i, now, false);
        }
        sender.apply_ack(1); // acks frames 0 and 1 cumulatively
        assert_eq!(sender.base(), 2);
    }

    #[test]
    fn duplicate_ack_below_base_is_a_no_op() {
        let message = vec![0u8; 9];
        let mut sender = sender(&message, 5);
        for i in sender.unsent_in_window() {
            sender.record_transmission(i, Instant::now(), false);
        }
        sender.apply_ack(0);
        assert_eq!(sender.base(), 1);
        sender.apply_ack(0); // stale duplicate, base already past it
        assert_eq!(sender.base(), 1);
    }

    #[test]
    fn would_abandon_true_once_attempts_reach_max() {
        let message = vec![0u8; 9];
        let mut sender = sender(&message, 5);
        for _ in 0..5 {
            sender.record_transmission(0, Instant::now(), true);
        }
        assert!(sender.would_abandon(0));
    }

    #[test]
    fn base_is_monotonically_non_decreasing_across_acks() {
        let message = vec![0u8; 500]; // 5 frames
        let mut sender = sender(&message, 5);
        let now = tokio::time::Instant::now();
        for i in sender.unsent_in_window() {
            sender.record_transmission(i, now, false);
        }
        let mut last_base = sender.base();
        for k in 0..5u8 {
            sender.apply_ack(k);
            assert!(sender.base() >= last_base);
            last_base = sender.base();
        }
        assert_eq!(sender.base(), 5);
    }
}
