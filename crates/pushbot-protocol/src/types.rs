//! Frame and channel types for the push bus protocol.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{CONNECTION_TYPE, PROTOCOL_VERSION};

/// A logical channel name.
///
/// The three negotiation channels form a closed enumeration so a typo in a
/// meta-channel cannot slip past the compiler; everything else is an open
/// application resource channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `/meta/handshake` — version negotiation and client id assignment.
    Handshake,
    /// `/meta/subscribe` — resource channel subscription.
    Subscribe,
    /// `/meta/connect` — the long-poll cycle.
    Connect,
    /// An application resource channel, e.g. `/user/185`.
    App(String),
}

impl Channel {
    /// Returns the wire representation of the channel name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Handshake => "/meta/handshake",
            Self::Subscribe => "/meta/subscribe",
            Self::Connect => "/meta/connect",
            Self::App(name) => name,
        }
    }

    /// Builds the resource channel for a user's message stream.
    pub fn user(user_id: &str) -> Self {
        Self::App(format!("/user/{user_id}"))
    }

    /// True for the reserved negotiation channels.
    pub fn is_meta(&self) -> bool {
        !matches!(self, Self::App(_))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        match name {
            "/meta/handshake" => Self::Handshake,
            "/meta/subscribe" => Self::Subscribe,
            "/meta/connect" => Self::Connect,
            _ => Self::App(name.to_string()),
        }
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        match name.as_str() {
            "/meta/handshake" => Self::Handshake,
            "/meta/subscribe" => Self::Subscribe,
            "/meta/connect" => Self::Connect,
            _ => Self::App(name),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name))
    }
}

/// One protocol message, the atomic unit exchanged over the transport.
///
/// The channel determines routing; every other field is optional payload.
/// Unknown inbound fields are ignored, and absent fields are omitted on the
/// wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Routing key; the only mandatory field.
    pub channel: Channel,

    /// Request id, attached to every outbound frame and echoed by the
    /// server. Some bus implementations echo it as a numeric string.
    #[serde(
        default,
        deserialize_with = "request_id_compat",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u64>,

    /// Session identifier issued at handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Protocol version (handshake frames).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Connection types the client supports (handshake frames).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,

    /// Connection type in use (connect frames).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,

    /// Target resource channel (subscribe frames).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    /// Acknowledgement flag on server replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,

    /// Server-supplied failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Protocol extensions; carries the access token on subscribe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    /// Application payload on resource channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Creates an empty frame on the given channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            id: None,
            client_id: None,
            version: None,
            supported_connection_types: None,
            connection_type: None,
            subscription: None,
            successful: None,
            error: None,
            ext: None,
            data: None,
        }
    }

    /// Builds the handshake request frame.
    pub fn handshake() -> Self {
        let mut frame = Self::new(Channel::Handshake);
        frame.version = Some(PROTOCOL_VERSION.to_string());
        frame.supported_connection_types = Some(vec![CONNECTION_TYPE.to_string()]);
        frame
    }

    /// Builds a subscribe request for the given resource channel,
    /// authenticated through the `ext` field.
    pub fn subscribe(subscription: impl Into<String>, access_token: &str) -> Self {
        let mut frame = Self::new(Channel::Subscribe);
        frame.subscription = Some(subscription.into());
        frame.ext = Some(json!({ "access_token": access_token }));
        frame
    }

    /// Builds a connect request frame.
    pub fn connect() -> Self {
        let mut frame = Self::new(Channel::Connect);
        frame.connection_type = Some(CONNECTION_TYPE.to_string());
        frame
    }

    /// Builds an application frame carrying a data payload.
    pub fn publish(channel: Channel, data: Value) -> Self {
        let mut frame = Self::new(channel);
        frame.data = Some(data);
        frame
    }

    /// Interprets this frame as a phase acknowledgement.
    ///
    /// Only an explicit `successful: false` counts as a rejection; the
    /// server omits the flag on frames that are not acknowledgements.
    pub fn outcome(&self) -> NegotiationOutcome {
        match self.successful {
            Some(false) => NegotiationOutcome::Rejected(self.error.clone()),
            _ => NegotiationOutcome::Ok,
        }
    }
}

/// Result of one negotiation phase, read off the server's reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The phase was acknowledged (or the reply carried no verdict).
    Ok,
    /// The server rejected the phase, with its reason when given.
    Rejected(Option<String>),
}

impl NegotiationOutcome {
    /// True unless the server explicitly rejected the phase.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Deserializes a request id that may arrive as an integer or as a numeric
/// string, depending on the bus implementation echoing it.
fn request_id_compat<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RequestId;

    impl<'de> Visitor<'de> for RequestId {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a request id as an integer or numeric string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom("request id must not be negative"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            value.parse::<u64>().map(Some).map_err(E::custom)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(RequestId)
}
