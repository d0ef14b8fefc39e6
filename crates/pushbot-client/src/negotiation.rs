//! Three-phase negotiation: handshake, subscribe, connect.
//!
//! The negotiator drives one connection's subscription lifecycle purely off
//! inbound meta-channel frames. Each phase arms the next phase's one-shot
//! subscription only after the previous phase completed, so a duplicate or
//! out-of-order server prompt finds no handler and is dropped instead of
//! consuming the wrong one-shot.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use pushbot_protocol::{Channel, Frame, NegotiationOutcome};

use crate::error::ClientResult;
use crate::router::ChannelRouter;
use crate::session::{Outbox, Session};

/// Lifecycle of one connection's negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing sent yet.
    Unstarted,
    /// Handshake sent, waiting for the server's reply.
    Handshaking,
    /// Subscribe sent, waiting for the acknowledgement.
    Subscribing,
    /// Steady state: the connect cycle re-arms on every server prompt.
    Connected,
    /// The server rejected a phase; the connection must be re-dialed.
    Retry,
}

/// Drives the handshake → subscribe → connect sequence for one connection.
pub struct Negotiator {
    state: Arc<Mutex<NegotiationState>>,
    session: Arc<Mutex<Session>>,
    outbox: Outbox,
    resource: Channel,
    access_token: String,
    subscribe_armed: bool,
    connect_armed: bool,
}

impl Negotiator {
    /// Creates a negotiator for the given resource channel.
    pub fn new(
        session: Arc<Mutex<Session>>,
        outbox: Outbox,
        resource: Channel,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(NegotiationState::Unstarted)),
            session,
            outbox,
            resource,
            access_token: access_token.into(),
            subscribe_armed: false,
            connect_armed: false,
        }
    }

    /// Current negotiation state.
    pub fn state(&self) -> NegotiationState {
        *self.state.lock()
    }

    /// The resource channel this negotiation subscribes to.
    pub fn resource(&self) -> &Channel {
        &self.resource
    }

    /// Sends the handshake and arms its one-shot reply subscription.
    /// Called once, when the transport opens.
    pub fn start(&mut self, router: &mut ChannelRouter) -> ClientResult<()> {
        let state = Arc::clone(&self.state);
        let session = Arc::clone(&self.session);
        let outbox = self.outbox.clone();
        let subscription = self.resource.to_string();
        let access_token = self.access_token.clone();

        router.once(
            Channel::Handshake,
            Box::new(move |frame: &Frame| {
                match frame.outcome() {
                    NegotiationOutcome::Rejected(reason) => {
                        warn!(
                            reason = reason.as_deref().unwrap_or("unspecified"),
                            "handshake rejected"
                        );
                        *state.lock() = NegotiationState::Retry;
                    }
                    NegotiationOutcome::Ok => {
                        let Some(client_id) = frame.client_id.clone() else {
                            warn!("handshake reply carried no client id");
                            *state.lock() = NegotiationState::Retry;
                            return Ok(());
                        };
                        debug!(client_id = %client_id, "handshake acknowledged");
                        session.lock().record_client_id(client_id);
                        outbox.send(Frame::subscribe(subscription.clone(), &access_token))?;
                        *state.lock() = NegotiationState::Subscribing;
                    }
                }
                Ok(())
            }),
        );

        self.outbox.send(Frame::handshake())?;
        *self.state.lock() = NegotiationState::Handshaking;
        info!("handshake sent");
        Ok(())
    }

    /// Arms the subscriptions required by the current state.
    ///
    /// The connection loop calls this after every dispatch, so each phase's
    /// one-shot only becomes live once the previous phase's reply has been
    /// processed.
    pub fn sync(&mut self, router: &mut ChannelRouter) {
        match self.state() {
            NegotiationState::Subscribing if !self.subscribe_armed => {
                self.subscribe_armed = true;
                self.arm_subscribe_ack(router);
            }
            NegotiationState::Connected if !self.connect_armed => {
                self.connect_armed = true;
                self.arm_connect_loop(router);
            }
            _ => {}
        }
    }

    fn arm_subscribe_ack(&self, router: &mut ChannelRouter) {
        let state = Arc::clone(&self.state);
        let outbox = self.outbox.clone();
        let resource = self.resource.clone();

        router.once(
            Channel::Subscribe,
            Box::new(move |frame: &Frame| {
                match frame.outcome() {
                    NegotiationOutcome::Rejected(reason) => {
                        warn!(
                            channel = %resource,
                            reason = reason.as_deref().unwrap_or("unspecified"),
                            "subscription rejected"
                        );
                        *state.lock() = NegotiationState::Retry;
                    }
                    NegotiationOutcome::Ok => {
                        info!(channel = %resource, "subscription acknowledged");
                        outbox.send(Frame::connect())?;
                        *state.lock() = NegotiationState::Connected;
                    }
                }
                Ok(())
            }),
        );
    }

    fn arm_connect_loop(&self, router: &mut ChannelRouter) {
        let state = Arc::clone(&self.state);
        let outbox = self.outbox.clone();

        router.on(
            Channel::Connect,
            Box::new(move |frame: &Frame| {
                if let NegotiationOutcome::Rejected(reason) = frame.outcome() {
                    warn!(
                        reason = reason.as_deref().unwrap_or("unspecified"),
                        "connect rejected"
                    );
                    *state.lock() = NegotiationState::Retry;
                    return Ok(());
                }
                // The server prompts on /meta/connect whenever it wants the
                // long-poll cycle re-armed; answer each prompt with exactly
                // one fresh connect frame.
                debug!("re-arming connect");
                outbox.send(Frame::connect())
            }),
        );
    }
}
