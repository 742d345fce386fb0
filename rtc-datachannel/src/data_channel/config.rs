use super::state::HandshakeRole;
use crate::message::message_channel_open::*;
use crate::message::Message;
use crate::message::message_type::MESSAGE_TYPE_ACK;
use crate::sid_allocator::{SctpSid, MAX_SCTP_SID};
use bytes::Bytes;
use log::error;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use shared::marshal::*;
use std::fmt;
use std::time::Duration;

/// Labels and sub-protocols are length-prefixed by a u16 on the wire.
pub const MAX_LABEL_LENGTH: usize = u16::MAX as usize;
pub const MAX_PROTOCOL_LENGTH: usize = u16::MAX as usize;

/// RTCPriorityType is the relative priority of a data channel.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-priority/#rtc-priority-type
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCPriorityType {
    VeryLow,
    #[default]
    Low,
    Medium,
    High,
}

impl From<RTCPriorityType> for u16 {
    fn from(p: RTCPriorityType) -> Self {
        match p {
            RTCPriorityType::VeryLow => CHANNEL_PRIORITY_BELOW_NORMAL,
            RTCPriorityType::Low => CHANNEL_PRIORITY_NORMAL,
            RTCPriorityType::Medium => CHANNEL_PRIORITY_HIGH,
            RTCPriorityType::High => CHANNEL_PRIORITY_EXTRA_HIGH,
        }
    }
}

impl From<u16> for RTCPriorityType {
    fn from(v: u16) -> Self {
        if v <= CHANNEL_PRIORITY_BELOW_NORMAL {
            RTCPriorityType::VeryLow
        } else if v <= CHANNEL_PRIORITY_NORMAL {
            RTCPriorityType::Low
        } else if v <= CHANNEL_PRIORITY_HIGH {
            RTCPriorityType::Medium
        } else {
            RTCPriorityType::High
        }
    }
}

impl fmt::Display for RTCPriorityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCPriorityType::VeryLow => "very-low",
            RTCPriorityType::Low => "low",
            RTCPriorityType::Medium => "medium",
            RTCPriorityType::High => "high",
        };
        write!(f, "{s}")
    }
}

/// RTCDataChannelInit can be used to configure properties of the underlying
/// channel such as data reliability.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannelinit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDataChannelInit {
    /// ordered indicates if data is allowed to be delivered out of order. The
    /// default value of true, guarantees that data will be delivered in order.
    pub ordered: bool,

    /// max_packet_life_time limits the time (in milliseconds) during which the
    /// channel will transmit or retransmit data if not acknowledged.
    pub max_packet_life_time: Option<u16>,

    /// max_retransmits limits the number of times a channel will retransmit data
    /// if not successfully delivered.
    pub max_retransmits: Option<u16>,

    /// protocol describes the subprotocol name used for this channel.
    pub protocol: String,

    /// negotiated describes if the data channel is created by the local peer or
    /// the remote peer. The default value of false tells the user agent to
    /// announce the channel in-band and instruct the other peer to dispatch a
    /// corresponding DataChannel. If set to true, it is up to the application
    /// to negotiate the channel and create an DataChannel with the same id
    /// at the other peer.
    pub negotiated: bool,

    /// id sets the stream id of the channel. None lets the id be allocated
    /// once the DTLS role is known.
    pub id: Option<u16>,

    pub priority: RTCPriorityType,
}

impl Default for RTCDataChannelInit {
    fn default() -> Self {
        Self {
            ordered: true,
            max_packet_life_time: None,
            max_retransmits: None,
            protocol: String::new(),
            negotiated: false,
            id: None,
            priority: RTCPriorityType::default(),
        }
    }
}

/// DataChannelConfig is the immutable configuration of one data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannelConfig {
    pub label: String,
    pub protocol: String,
    pub ordered: bool,
    pub max_retransmits: Option<u16>,
    pub max_packet_life_time: Option<u16>,
    pub negotiated: bool,
    pub id: Option<SctpSid>,
    pub priority: u16,
    pub handshake_role: HandshakeRole,

    /// handshake_timeout bounds the wait for DATA_CHANNEL_ACK after the OPEN
    /// was sent. None waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl Default for DataChannelConfig {
    fn default() -> Self {
        Self::new("", RTCDataChannelInit::default())
    }
}

impl DataChannelConfig {
    /// new builds the configuration of a locally created channel. The
    /// handshake role follows from `negotiated`.
    pub fn new(label: impl Into<String>, init: RTCDataChannelInit) -> Self {
        Self {
            label: label.into(),
            protocol: init.protocol,
            ordered: init.ordered,
            max_retransmits: init.max_retransmits,
            max_packet_life_time: init.max_packet_life_time,
            negotiated: init.negotiated,
            id: init.id,
            priority: init.priority.into(),
            handshake_role: if init.negotiated {
                HandshakeRole::None
            } else {
                HandshakeRole::Opener
            },
            handshake_timeout: None,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// from_open builds the acker side configuration from a received
    /// DATA_CHANNEL_OPEN on stream `sid`.
    pub fn from_open(sid: SctpSid, payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        let open = match Message::unmarshal(&mut buf)? {
            Message::DataChannelOpen(open) => open,
            Message::DataChannelAck(_) => return Err(Error::InvalidMessageType(MESSAGE_TYPE_ACK)),
        };

        let (max_retransmits, max_packet_life_time) = match open.channel_type {
            ChannelType::Reliable | ChannelType::ReliableUnordered => (None, None),
            ChannelType::PartialReliableRexmit | ChannelType::PartialReliableRexmitUnordered => {
                (Some(open.reliability_parameter.min(u16::MAX as u32) as u16), None)
            }
            ChannelType::PartialReliableTimed | ChannelType::PartialReliableTimedUnordered => {
                (None, Some(open.reliability_parameter.min(u16::MAX as u32) as u16))
            }
        };

        Ok(Self {
            label: String::from_utf8(open.label)?,
            protocol: String::from_utf8(open.protocol)?,
            ordered: open.channel_type.ordered(),
            max_retransmits,
            max_packet_life_time,
            negotiated: false,
            id: Some(sid),
            priority: open.priority,
            handshake_role: HandshakeRole::Acker,
            handshake_timeout: None,
        })
    }

    /// validate rejects configurations no data channel can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.max_retransmits.is_some() && self.max_packet_life_time.is_some() {
            error!("both max_retransmits and max_packet_life_time set on {:?}", self.label);
            return Err(Error::ErrRetransmitsOrPacketLifeTime);
        }
        if let Some(id) = self.id {
            if id > MAX_SCTP_SID {
                error!("data channel id {id} exceeds {MAX_SCTP_SID}");
                return Err(Error::ErrInvalidDataChannelId(id as i32));
            }
        }
        if self.label.len() > MAX_LABEL_LENGTH {
            return Err(Error::ErrStringSizeLimit);
        }
        if self.protocol.len() > MAX_PROTOCOL_LENGTH {
            return Err(Error::ErrProtocolTooLarge);
        }
        Ok(())
    }

    pub fn channel_type(&self) -> (ChannelType, u32) {
        ChannelType::from_reliability(
            self.ordered,
            self.max_retransmits,
            self.max_packet_life_time,
        )
    }

    /// open_message encodes the DATA_CHANNEL_OPEN announcing this channel.
    pub fn open_message(&self) -> Result<Bytes> {
        let (channel_type, reliability_parameter) = self.channel_type();
        Message::DataChannelOpen(DataChannelOpen {
            channel_type,
            priority: self.priority,
            reliability_parameter,
            label: self.label.bytes().collect(),
            protocol: self.protocol.bytes().collect(),
        })
        .marshal_frozen()
    }
}
