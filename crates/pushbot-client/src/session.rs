//! Per-connection session state and the outbound frame queue.
//!
//! Both bots of the original platform kept the request counter and client
//! id in process globals; here they live in a [`Session`] owned by one
//! connection, so a reconnect (or a second concurrent connection) always
//! starts from a clean sequence.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use pushbot_protocol::Frame;

use crate::error::{ClientError, ClientResult};

/// Mutable state for one bus connection.
#[derive(Debug)]
pub struct Session {
    client_id: Option<String>,
    next_request_id: u64,
}

impl Session {
    /// Creates a fresh session; request ids start at 1.
    pub fn new() -> Self {
        Self {
            client_id: None,
            next_request_id: 1,
        }
    }

    /// Returns the current request id and advances the counter.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Stamps an outbound frame with the next request id and the current
    /// client id (which may still be unset before the handshake completes).
    /// Consumes one id per call.
    pub fn attach(&mut self, mut frame: Frame) -> Frame {
        frame.id = Some(self.next_id());
        frame.client_id = self.client_id.clone();
        frame
    }

    /// Records the server-issued client id from the handshake reply.
    /// Calling it again overwrites the stored value.
    pub fn record_client_id(&mut self, client_id: impl Into<String>) {
        self.client_id = Some(client_id.into());
    }

    /// The session identifier, once the handshake assigned one.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound frame queue for one connection.
///
/// Frames are stamped at enqueue time and drained in order by the
/// connection loop, so request ids are strictly increasing in send order.
#[derive(Clone)]
pub struct Outbox {
    session: Arc<Mutex<Session>>,
    queue: mpsc::UnboundedSender<Frame>,
}

impl Outbox {
    /// Creates an outbox feeding the given queue.
    pub fn new(session: Arc<Mutex<Session>>, queue: mpsc::UnboundedSender<Frame>) -> Self {
        Self { session, queue }
    }

    /// Stamps and queues one outbound frame.
    pub fn send(&self, frame: Frame) -> ClientResult<()> {
        let frame = self.session.lock().attach(frame);
        self.queue
            .send(frame)
            .map_err(|_| ClientError::Transport("outbound queue closed".to_string()))
    }
}
