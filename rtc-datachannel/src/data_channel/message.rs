use bytes::Bytes;

/// RTCDataChannelMessage represents a message received from the
/// data channel. IsString will be set to true if the incoming
/// message is of the string type. Otherwise, the message is of
/// a binary type.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCDataChannelMessage {
    pub is_string: bool,
    pub data: Bytes,
}

impl RTCDataChannelMessage {
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            is_string: false,
            data: data.into(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self {
            is_string: true,
            data: Bytes::from(s.into()),
        }
    }
}
