//! Application command handling: recognize the trigger, queue the reply.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use pushbot_api::MessagePoster;
use pushbot_core::{PushEvent, Trigger};
use pushbot_protocol::Frame;

use crate::router::Handler;

/// A reply queued for delivery through the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    /// Group the triggering message came from.
    pub group_id: String,
    /// Reply text to post there.
    pub text: String,
}

/// Watches the subscribed resource channel for the trigger message.
///
/// Anything that is not a new-message event with matching text is ignored:
/// other event kinds, attachment-only messages, and payloads that fail to
/// decode.
pub struct CommandHandler {
    trigger: Trigger,
    reply: String,
    replies: mpsc::UnboundedSender<ReplyRequest>,
}

impl CommandHandler {
    /// Creates a handler that queues replies onto the given channel.
    pub fn new(
        trigger: Trigger,
        reply: impl Into<String>,
        replies: mpsc::UnboundedSender<ReplyRequest>,
    ) -> Self {
        Self {
            trigger,
            reply: reply.into(),
            replies,
        }
    }

    /// Inspects one frame from the subscribed channel.
    pub fn on_frame(&self, frame: &Frame) {
        let Some(data) = frame.data.as_ref() else {
            return;
        };
        let event: PushEvent = match serde_json::from_value(data.clone()) {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "ignoring undecodable channel payload");
                return;
            }
        };
        if !event.is_message_created() {
            return;
        }
        let Some(subject) = event.subject else {
            return;
        };
        let Some(text) = subject.text.as_deref() else {
            return;
        };
        if !self.trigger.matches(text) {
            return;
        }

        debug!(group_id = %subject.group_id, "trigger matched");
        let request = ReplyRequest {
            group_id: subject.group_id,
            text: self.reply.clone(),
        };
        if self.replies.send(request).is_err() {
            debug!("reply worker gone; dropping reply");
        }
    }

    /// Wraps the handler for router registration.
    pub fn into_handler(self) -> Handler {
        Box::new(move |frame: &Frame| {
            self.on_frame(frame);
            Ok(())
        })
    }
}

/// Drains queued replies and posts them.
///
/// Delivery is fire-and-forget from the connection's point of view: a
/// failure is logged and never feeds back into negotiation or message
/// processing. The worker exits when every sender is gone.
pub(crate) async fn reply_worker(
    poster: Arc<dyn MessagePoster>,
    mut replies: mpsc::UnboundedReceiver<ReplyRequest>,
) {
    while let Some(request) = replies.recv().await {
        if let Err(err) = poster.post_group_message(&request.group_id, &request.text).await {
            warn!(group_id = %request.group_id, error = %err, "reply delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushbot_protocol::Channel;
    use serde_json::json;

    fn fixture() -> (CommandHandler, mpsc::UnboundedReceiver<ReplyRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CommandHandler::new(Trigger::exact("!ping"), "Pong!", tx), rx)
    }

    fn message_frame(text: &str) -> Frame {
        Frame::publish(
            Channel::user("185"),
            json!({
                "type": "line.create",
                "subject": { "group_id": "42", "text": text },
            }),
        )
    }

    #[test]
    fn exact_trigger_queues_one_reply() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&message_frame("!Ping"));

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.group_id, "42");
        assert_eq!(reply.text, "Pong!");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn near_misses_do_not_trigger() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&message_frame("ping!"));
        handler.on_frame(&message_frame("please !ping now"));
        handler.on_frame(&message_frame("pong"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn other_event_kinds_are_ignored() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&Frame::publish(
            Channel::user("185"),
            json!({ "type": "typing", "subject": { "group_id": "42", "text": "!ping" } }),
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn frames_without_data_are_ignored() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&Frame::new(Channel::user("185")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn undecodable_payloads_are_ignored() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&Frame::publish(Channel::user("185"), json!("not an event")));
        handler.on_frame(&Frame::publish(Channel::user("185"), json!({ "no": "type" })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn attachment_only_messages_are_ignored() {
        let (handler, mut rx) = fixture();
        handler.on_frame(&Frame::publish(
            Channel::user("185"),
            json!({ "type": "line.create", "subject": { "group_id": "42" } }),
        ));
        assert!(rx.try_recv().is_err());
    }
}
