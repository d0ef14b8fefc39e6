//! Connection loop: dial, negotiate, dispatch, reconnect.
//!
//! All protocol work happens on one task, in reaction to transport events:
//! inbound messages are decoded and published frame by frame, outbound
//! frames are drained from the queue the subscribers feed. A transport
//! failure (or a server-side rejection) ends the connection and the bot
//! re-dials with bounded exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use pushbot_api::MessagePoster;
use pushbot_core::Trigger;
use pushbot_protocol::{Channel, Frame, decode_frames, encode_frame};

use crate::command::{CommandHandler, reply_worker};
use crate::config::BotConfig;
use crate::error::{ClientError, ClientResult};
use crate::negotiation::{NegotiationState, Negotiator};
use crate::router::ChannelRouter;
use crate::session::{Outbox, Session};

/// Reconnect delay with exponential growth and a hard cap.
#[derive(Debug)]
pub struct Backoff {
    next: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial` and capped at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial,
            initial,
            max,
        }
    }

    /// Returns the delay to wait before the next attempt and doubles it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    /// Resets to the initial delay after a healthy connection.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// The push bot: keeps a live subscription to the user's message stream and
/// answers the trigger command.
pub struct PushClient {
    config: BotConfig,
    poster: Arc<dyn MessagePoster>,
}

impl PushClient {
    /// Creates a client that replies through the given poster.
    pub fn new(config: BotConfig, poster: Arc<dyn MessagePoster>) -> Self {
        Self { config, poster }
    }

    /// Runs the bot until the task is cancelled.
    ///
    /// Every connection end — transport error, server close, send failure
    /// or negotiation rejection — re-dials after the backoff delay; the
    /// delay resets once a connection reaches `Connected`.
    pub async fn run(&self) -> ClientResult<()> {
        let mut backoff = Backoff::new(self.config.initial_backoff(), self.config.max_backoff());
        loop {
            match self.run_connection(&mut backoff).await {
                Ok(()) => info!("connection closed by server"),
                Err(err) => warn!(error = %err, "connection failed"),
            }
            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
            tokio::time::sleep(delay).await;
        }
    }

    /// Dials the push endpoint and services one connection to completion.
    async fn run_connection(&self, backoff: &mut Backoff) -> ClientResult<()> {
        info!(url = %self.config.push_url, "connecting");
        let (stream, _response) = connect_async(self.config.push_url.as_str()).await?;
        let (mut sink, mut inbound) = stream.split();

        // Everything below is per-connection: a reconnect starts over with
        // a fresh session, router and negotiator.
        let session = Arc::new(Mutex::new(Session::new()));
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        let outbox = Outbox::new(Arc::clone(&session), frame_tx);

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let replies = tokio::spawn(reply_worker(Arc::clone(&self.poster), reply_rx));

        let mut router = ChannelRouter::new();
        let resource = Channel::user(&self.config.user_id);
        let mut negotiator = Negotiator::new(
            session,
            outbox,
            resource.clone(),
            self.config.access_token.clone(),
        );
        negotiator.start(&mut router)?;

        let mut command_installed = false;

        let result: ClientResult<()> = loop {
            negotiator.sync(&mut router);
            match negotiator.state() {
                NegotiationState::Connected if !command_installed => {
                    let handler = CommandHandler::new(
                        Trigger::exact(self.config.trigger.as_str()),
                        self.config.reply.as_str(),
                        reply_tx.clone(),
                    );
                    router.on(resource.clone(), handler.into_handler());
                    command_installed = true;
                    backoff.reset();
                    info!(channel = %resource, "subscription active; watching for commands");
                }
                NegotiationState::Retry => {
                    break Err(ClientError::Transport(
                        "negotiation rejected by server".to_string(),
                    ));
                }
                _ => {}
            }

            tokio::select! {
                outbound = frame_rx.recv() => {
                    let Some(frame) = outbound else {
                        break Err(ClientError::Transport("outbound queue closed".to_string()));
                    };
                    match Self::to_message(&frame) {
                        Ok(message) => {
                            debug!(channel = %frame.channel, id = ?frame.id, "sending frame");
                            // An unsendable connection cannot keep
                            // negotiating; bail out and reconnect.
                            if let Err(err) = sink.send(message).await {
                                break Err(err.into());
                            }
                        }
                        Err(err) => break Err(err),
                    }
                }
                message = inbound.next() => {
                    match message {
                        None => break Ok(()),
                        Some(Err(err)) => break Err(err.into()),
                        Some(Ok(Message::Text(text))) => {
                            Self::dispatch(text.as_bytes(), &mut router);
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            Self::dispatch(&bytes, &mut router);
                        }
                        Some(Ok(Message::Close(_))) => break Ok(()),
                        // Ping/pong is the websocket layer's business.
                        Some(Ok(_)) => {}
                    }
                }
            }
        };

        // Let queued replies drain before tearing the connection down.
        drop(router);
        drop(reply_tx);
        let _ = replies.await;

        result
    }

    /// Decodes one transport payload and publishes its frames in wire
    /// order. A malformed payload is dropped; the connection stays up.
    fn dispatch(payload: &[u8], router: &mut ChannelRouter) {
        match decode_frames(payload) {
            Ok(frames) => {
                for frame in &frames {
                    debug!(channel = %frame.channel, "frame received");
                    router.publish(frame);
                }
            }
            Err(err) => {
                warn!(error = %err, "dropping undecodable message");
            }
        }
    }

    fn to_message(frame: &Frame) -> ClientResult<Message> {
        let payload = encode_frame(frame)?;
        let text = String::from_utf8(payload)
            .map_err(|err| ClientError::Transport(format!("encoded frame was not UTF-8: {err}")))?;
        Ok(Message::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pushbot_api::ApiResult;
    use pushbot_protocol::encode_frames;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::accept_async;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(8));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8]);

        backoff.reset();
        assert_eq!(backoff.next_delay().as_secs(), 1);
    }

    #[test]
    fn malformed_payloads_leave_the_router_alone() {
        let mut router = ChannelRouter::new();
        let hits = Arc::new(std::sync::Mutex::new(0usize));
        let seen = Arc::clone(&hits);
        router.on(
            Channel::Connect,
            Box::new(move |_frame: &Frame| {
                *seen.lock().unwrap() += 1;
                Ok(())
            }),
        );

        PushClient::dispatch(br#"{ "channel": "/meta/connect" }"#, &mut router);
        PushClient::dispatch(b"garbage", &mut router);
        assert_eq!(*hits.lock().unwrap(), 0);

        PushClient::dispatch(br#"[{ "channel": "/meta/connect" }]"#, &mut router);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    struct QueuePoster(mpsc::UnboundedSender<(String, String)>);

    #[async_trait]
    impl MessagePoster for QueuePoster {
        async fn post_group_message(&self, group_id: &str, text: &str) -> ApiResult<()> {
            let _ = self.0.send((group_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn post_bot_message(&self, _bot_id: &str, _text: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    async fn read_batch(
        ws: &mut WebSocketStream<tokio::net::TcpStream>,
    ) -> Vec<Frame> {
        let message = ws.next().await.unwrap().unwrap();
        decode_frames(message.into_text().unwrap().as_bytes()).unwrap()
    }

    async fn send_batch(ws: &mut WebSocketStream<tokio::net::TcpStream>, frames: &[Frame]) {
        let text = String::from_utf8(encode_frames(frames).unwrap()).unwrap();
        ws.send(Message::text(text)).await.unwrap();
    }

    /// Plays the server side of one full negotiation, then delivers the
    /// connect ack and a message event in a single multi-frame batch.
    async fn fake_push_server(listener: TcpListener) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let handshake = read_batch(&mut ws).await;
        assert_eq!(handshake[0].channel, Channel::Handshake);
        assert_eq!(handshake[0].id, Some(1));

        let mut reply = Frame::new(Channel::Handshake);
        reply.successful = Some(true);
        reply.client_id = Some("abc".to_string());
        send_batch(&mut ws, &[reply]).await;

        let subscribe = read_batch(&mut ws).await;
        assert_eq!(subscribe[0].channel, Channel::Subscribe);
        assert_eq!(subscribe[0].id, Some(2));
        assert_eq!(subscribe[0].client_id.as_deref(), Some("abc"));
        assert_eq!(subscribe[0].subscription.as_deref(), Some("/user/185"));
        assert_eq!(subscribe[0].ext.as_ref().unwrap()["access_token"], "tok");

        let mut ack = Frame::new(Channel::Subscribe);
        ack.successful = Some(true);
        send_batch(&mut ws, &[ack]).await;

        let connect = read_batch(&mut ws).await;
        assert_eq!(connect[0].channel, Channel::Connect);
        assert_eq!(connect[0].id, Some(3));

        let mut connect_ack = Frame::new(Channel::Connect);
        connect_ack.successful = Some(true);
        let event = Frame::publish(
            Channel::user("185"),
            json!({
                "type": "line.create",
                "subject": { "group_id": "42", "text": "!Ping" },
            }),
        );
        send_batch(&mut ws, &[connect_ack, event]).await;

        // The connect ack re-arms the cycle exactly once.
        let rearmed = read_batch(&mut ws).await;
        assert_eq!(rearmed[0].channel, Channel::Connect);

        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn end_to_end_ping_gets_exactly_one_pong() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(fake_push_server(listener));

        let mut config = BotConfig::default();
        config.user_id = "185".to_string();
        config.access_token = "tok".to_string();
        config.push_url = format!("ws://{addr}");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = PushClient::new(config, Arc::new(QueuePoster(tx)));
        let bot = tokio::spawn(async move { client.run().await });

        let (group_id, text) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for the reply")
            .expect("reply channel closed");
        assert_eq!(group_id, "42");
        assert_eq!(text, "Pong!");

        // No second reply sneaks in behind the first.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        bot.abort();
        server.await.unwrap();
    }
}
