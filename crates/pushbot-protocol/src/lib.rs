//! Frame types and envelope framing for the GroupMe push bus.
//!
//! The push bus speaks a Bayeux-style protocol over a persistent websocket
//! connection. Every transport message is a JSON array carrying one or more
//! frames, and every frame names the logical channel it belongs to.
//!
//! # Protocol Overview
//!
//! Establishing a live subscription is a three-phase negotiation driven over
//! reserved meta-channels:
//!
//! - `/meta/handshake` — the client announces its protocol version and the
//!   connection types it supports; the server issues a client id.
//! - `/meta/subscribe` — the client subscribes to a resource channel
//!   (e.g. `/user/{id}`), authenticating through the `ext` field.
//! - `/meta/connect` — the client opens the long-poll cycle; the server
//!   prompts on the same channel whenever the cycle must be re-armed.
//!
//! Everything that is not a meta-channel is an application resource channel
//! and carries opaque `data` payloads.
//!
//! # Example
//!
//! ```rust
//! use pushbot_protocol::{Frame, decode_frames, encode_frame};
//!
//! let frame = Frame::handshake();
//! let bytes = encode_frame(&frame).unwrap();
//! let decoded = decode_frames(&bytes).unwrap();
//! assert_eq!(decoded, vec![frame]);
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_frames, encode_frame, encode_frames};
pub use types::{Channel, Frame, NegotiationOutcome};

/// Protocol version announced in handshake frames.
pub const PROTOCOL_VERSION: &str = "1.0";

/// The only connection type this client speaks.
pub const CONNECTION_TYPE: &str = "websocket";

/// Maximum envelope size (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
