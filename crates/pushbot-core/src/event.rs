//! Message event payloads shared by both bots.
//!
//! The push bus delivers events as the `data` field of an application frame;
//! the webhook bot receives a flattened callback body instead. Both shapes
//! are defined here so the two bots stay in agreement about the platform's
//! data model.

use serde::{Deserialize, Serialize};

/// Event kind for a newly created group message.
pub const MESSAGE_CREATED: &str = "line.create";

/// An event delivered on a user's resource channel.
///
/// Only message-creation events carry a subject; other kinds (typing
/// indicators, membership changes) are ignored by the bots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Event kind, e.g. `line.create`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The message this event is about, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<MessageSubject>,
}

impl PushEvent {
    /// True for a new-message event.
    pub fn is_message_created(&self) -> bool {
        self.kind == MESSAGE_CREATED
    }
}

/// The message carried by a [`PushEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSubject {
    /// Message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Group the message was posted in.
    pub group_id: String,

    /// Author's user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Author's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Message text; absent for attachment-only messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body of the `POST /bot` callback the platform sends for every group
/// message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotCallback {
    /// Message text.
    pub text: String,

    /// Group the message was posted in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Author's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `user`, `bot` or `system`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<String>,

    /// Author's id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}
