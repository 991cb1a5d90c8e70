//! The simulated unreliable channel.
//!
//! An external collaborator from the protocol engine's point of view: a
//! pure transport that accepts a byte vector and returns either the
//! (possibly bit-flipped) bytes or an indication of loss, after sleeping
//! for a random delay.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::tracing::prelude::*;

/// External collaborator consumed by the sender and receiver: an opaque
/// byte transport that may drop, corrupt, or delay what it's given.
#[async_trait]
pub trait Channel: Send {
    async fn transmit(&mut self, bytes: Vec<u8>) -> Option<Vec<u8>>;
}

/// Running counters for a channel instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub transmitted: u64,
    pub lost: u64,
    pub corrupted: u64,
}

/// A channel that drops frames with probability `p_loss`, otherwise
/// flips one random bit with probability `p_error`, after a uniform
/// random delay in `[0, max_delay]`.
pub struct SimChannel {
    p_error: f64,
    p_loss: f64,
    max_delay: Duration,
    rng: CounterRng,
    stats: ChannelStats,
}

impl SimChannel {
    pub fn new(p_error: f64, p_loss: f64, max_delay: Duration) -> Self {
        Self {
            p_error,
            p_loss,
            max_delay,
            rng: CounterRng::new(),
            stats: ChannelStats::default(),
        }
    }

    /// A channel that never loses, corrupts, or delays -- useful as a
    /// deterministic baseline in tests.
    pub fn perfect() -> Self {
        Self::new(0.0, 0.0, Duration::ZERO)
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}

#[async_trait]
impl Channel for SimChannel {
    async fn transmit(&mut self, bytes: Vec<u8>) -> Option<Vec<u8>> {
        let delay = self.rng.duration_up_to(self.max_delay);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        if self.rng.chance(self.p_loss) {
            self.stats.lost += 1;
            trace!("channel dropped a frame");
            return None;
        }

        self.stats.transmitted += 1;

        if self.rng.chance(self.p_error) {
            self.stats.corrupted += 1;
            let corrupted = flip_one_bit(bytes, &mut self.rng);
            trace!("channel corrupted a frame");
            return Some(corrupted);
        }

        Some(bytes)
    }
}

fn flip_one_bit(mut data: Vec<u8>, rng: &mut CounterRng) -> Vec<u8> {
    if data.is_empty() {
        return data;
    }
    let byte_idx = rng.index(data.len());
    let bit_idx = rng.index(8);
    data[byte_idx] ^= 1 << bit_idx;
    data
}

/// A counter hashed through `RandomState`, yielding a fresh pseudo-random
/// stream per process without pulling in an external RNG crate.
struct CounterRng {
    state: RandomState,
    step: u64,
}

impl CounterRng {
    fn new() -> Self {
        Self {
            state: RandomState::new(),
            step: 0,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u64(self.step);
        self.step = self.step.wrapping_add(1);
        hasher.finish()
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.next_f64() < probability
    }

    fn index(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }

    fn duration_up_to(&mut self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        max.mul_f64(self.next_f64())
    }
}
