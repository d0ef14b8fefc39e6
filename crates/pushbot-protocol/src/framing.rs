//! Envelope framing: JSON arrays of frames.
//!
//! The peer exchanges batches, so a single outbound frame is still wrapped
//! in an array:
//!
//! ```text
//! [ { "channel": "/meta/handshake", "id": 1, ... }, ... ]
//! ```
//!
//! Decoding surfaces the whole batch in wire order; consumers must not
//! assume batches ever hold exactly one frame.

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::Frame;

/// Encodes a batch of frames to a wire envelope.
///
/// # Example
///
/// ```rust
/// use pushbot_protocol::{Frame, encode_frames};
///
/// let bytes = encode_frames(&[Frame::handshake()]).unwrap();
/// assert_eq!(bytes.first(), Some(&b'['));
/// ```
pub fn encode_frames(frames: &[Frame]) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(frames)?;
    if json.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len() as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(json)
}

/// Encodes a single frame as a batch of one.
pub fn encode_frame(frame: &Frame) -> ProtocolResult<Vec<u8>> {
    encode_frames(std::slice::from_ref(frame))
}

/// Decodes a wire envelope into its frames, in wire order.
///
/// Anything that is not a well-formed JSON array of frames fails with
/// [`ProtocolError::MalformedEnvelope`]. The failure is scoped to this one
/// payload; callers report it and drop the message.
pub fn decode_frames(data: &[u8]) -> ProtocolResult<Vec<Frame>> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len() as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let envelope: serde_json::Value = serde_json::from_slice(data)
        .map_err(|err| ProtocolError::malformed(format!("invalid JSON: {err}")))?;

    let serde_json::Value::Array(items) = envelope else {
        return Err(ProtocolError::malformed("payload is not a frame array"));
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|err| ProtocolError::malformed(format!("invalid frame: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;
    use serde_json::json;

    #[test]
    fn single_frame_round_trips_as_batch_of_one() {
        let frame = Frame::subscribe("/user/185", "tok");
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(decode_frames(&bytes).unwrap(), vec![frame]);
    }

    #[test]
    fn encode_always_wraps_in_an_array() {
        let bytes = encode_frame(&Frame::connect()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn multi_frame_batches_preserve_wire_order() {
        let batch = vec![
            Frame::handshake(),
            Frame::connect(),
            Frame::publish(Channel::user("185"), json!({ "type": "ping" })),
        ];
        let bytes = encode_frames(&batch).unwrap();
        let decoded = decode_frames(&bytes).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn empty_batch_decodes_to_no_frames() {
        assert!(decode_frames(b"[]").unwrap().is_empty());
    }

    #[test]
    fn bare_object_is_a_malformed_envelope() {
        let result = decode_frames(br#"{ "channel": "/meta/connect" }"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn invalid_json_is_a_malformed_envelope() {
        let result = decode_frames(b"not json at all");
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn frame_without_a_channel_is_malformed() {
        let result = decode_frames(br#"[{ "id": 1 }]"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let data = vec![b' '; (MAX_MESSAGE_SIZE + 1) as usize];
        assert!(matches!(
            decode_frames(&data),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }
}
