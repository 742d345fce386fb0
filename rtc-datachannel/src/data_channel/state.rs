use serde::{Deserialize, Serialize};
use std::fmt;

const UNSPECIFIED_STR: &str = "Unspecified";

/// RTCDataChannelState indicates the state of a data channel.
///
/// ```text
/// Connecting → Open → Closing → Closed
/// ```
///
/// Transitions never go backwards. `Closed` is terminal and an abrupt close
/// reaches it from any earlier state, always passing through `Closing`.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannelstate
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RTCDataChannelState {
    #[default]
    Unspecified,

    /// Connecting indicates that the data channel is being established.
    /// This is the initial state of DataChannel, whether created with
    /// create_data_channel, or dispatched as a part of an DataChannelEvent.
    Connecting,

    /// Open indicates that the data channel is established and
    /// communication is possible.
    Open,

    /// Closing indicates that the procedure to close down the data
    /// channel has started.
    Closing,

    /// Closed indicates that the data channel has been closed or could
    /// not be established.
    Closed,
}

const DATA_CHANNEL_STATE_CONNECTING_STR: &str = "connecting";
const DATA_CHANNEL_STATE_OPEN_STR: &str = "open";
const DATA_CHANNEL_STATE_CLOSING_STR: &str = "closing";
const DATA_CHANNEL_STATE_CLOSED_STR: &str = "closed";

impl From<u8> for RTCDataChannelState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCDataChannelState::Connecting,
            2 => RTCDataChannelState::Open,
            3 => RTCDataChannelState::Closing,
            4 => RTCDataChannelState::Closed,
            _ => RTCDataChannelState::Unspecified,
        }
    }
}

impl From<&str> for RTCDataChannelState {
    fn from(raw: &str) -> Self {
        match raw {
            DATA_CHANNEL_STATE_CONNECTING_STR => RTCDataChannelState::Connecting,
            DATA_CHANNEL_STATE_OPEN_STR => RTCDataChannelState::Open,
            DATA_CHANNEL_STATE_CLOSING_STR => RTCDataChannelState::Closing,
            DATA_CHANNEL_STATE_CLOSED_STR => RTCDataChannelState::Closed,
            _ => RTCDataChannelState::Unspecified,
        }
    }
}

impl fmt::Display for RTCDataChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCDataChannelState::Connecting => DATA_CHANNEL_STATE_CONNECTING_STR,
            RTCDataChannelState::Open => DATA_CHANNEL_STATE_OPEN_STR,
            RTCDataChannelState::Closing => DATA_CHANNEL_STATE_CLOSING_STR,
            RTCDataChannelState::Closed => DATA_CHANNEL_STATE_CLOSED_STR,
            RTCDataChannelState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// HandshakeRole is the part a channel plays in the in-band DCEP handshake.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeRole {
    /// Sends DATA_CHANNEL_OPEN and waits for the ACK.
    #[default]
    Opener,
    /// Answers a received DATA_CHANNEL_OPEN with an ACK.
    Acker,
    /// Negotiated out-of-band, no handshake.
    None,
}

/// HandshakeState tracks progress through the DCEP open handshake.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    Init,
    ShouldSendOpen,
    ShouldSendAck,
    WaitingForAck,
    Ready,
}

impl From<HandshakeRole> for HandshakeState {
    fn from(role: HandshakeRole) -> Self {
        match role {
            HandshakeRole::None => HandshakeState::Ready,
            HandshakeRole::Opener => HandshakeState::ShouldSendOpen,
            HandshakeRole::Acker => HandshakeState::ShouldSendAck,
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            HandshakeState::Init => "init",
            HandshakeState::ShouldSendOpen => "should-send-open",
            HandshakeState::ShouldSendAck => "should-send-ack",
            HandshakeState::WaitingForAck => "waiting-for-ack",
            HandshakeState::Ready => "ready",
        };
        write!(f, "{s}")
    }
}
