//! `linkarq`: a Go-Back-N ARQ data-link layer over a simulated unreliable
//! byte channel.
//!
//! A message is fragmented into frames, each wrapped in a CRC-16 checked
//! wire format ([`frame`]); a sender and receiver state machine
//! ([`sender`], [`receiver`]) run the Go-Back-N sliding-window protocol
//! over an abstract [`channel::Channel`]; [`session`] drives one message
//! through to completion or terminal abandonment. [`bitcode`] is a
//! separate HDLC bit-stuffing/flag-framing codec, kept independent of the
//! byte-level wire path.

pub mod bitcode;
pub mod channel;
pub mod crc;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod tracing;

pub use channel::{Channel, ChannelStats, SimChannel};
pub use error::{BitCodecError, FrameError, SessionError};
pub use frame::{Frame, FrameCodec, FrameKind};
pub use receiver::{Receiver, ReceiverStats};
pub use sender::{Sender, SenderConfig, SenderStats};
pub use session::{Session, SessionConfig, SessionReport};
