use crate::sid_allocator::SctpSid;
use bytes::Bytes;
use shared::error::{Error, Result};
use std::fmt;

/// PayloadProtocolIdentifier is an enum for DataChannel payload types
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-25>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    Binary = 53,
    StringEmpty = 56,
    BinaryEmpty = 57,
    #[default]
    Unknown,
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::StringEmpty => "WebRTC String (Empty)",
            PayloadProtocolIdentifier::BinaryEmpty => "WebRTC Binary (Empty)",
            _ => "Unknown Payload Protocol Identifier",
        };
        write!(f, "{s}")
    }
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> PayloadProtocolIdentifier {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            53 => PayloadProtocolIdentifier::Binary,
            56 => PayloadProtocolIdentifier::StringEmpty,
            57 => PayloadProtocolIdentifier::BinaryEmpty,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

/// DataMessageType classifies a user message carried on a data channel stream.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataMessageType {
    Text,
    #[default]
    Binary,
    Control,
}

impl DataMessageType {
    /// to_ppi maps a message to the PPID and payload put on the wire.
    ///
    /// SCTP does not support empty user messages, so an empty message goes out
    /// as a single zero byte tagged with the matching "empty" PPID.
    /// <https://www.rfc-editor.org/rfc/rfc8831#section-6.6>
    pub fn to_ppi(self, payload: &Bytes) -> (PayloadProtocolIdentifier, Bytes) {
        let ppi = match (self, payload.is_empty()) {
            (DataMessageType::Control, _) => PayloadProtocolIdentifier::Dcep,
            (DataMessageType::Text, false) => PayloadProtocolIdentifier::String,
            (DataMessageType::Text, true) => PayloadProtocolIdentifier::StringEmpty,
            (DataMessageType::Binary, false) => PayloadProtocolIdentifier::Binary,
            (DataMessageType::Binary, true) => PayloadProtocolIdentifier::BinaryEmpty,
        };

        if payload.is_empty() && self != DataMessageType::Control {
            (ppi, Bytes::from_static(&[0]))
        } else {
            (ppi, payload.clone())
        }
    }

    /// from_ppi is the inverse of `to_ppi`; messages with an "empty" PPID are
    /// returned with an empty payload.
    pub fn from_ppi(ppi: PayloadProtocolIdentifier, payload: Bytes) -> Result<(Self, Bytes)> {
        match ppi {
            PayloadProtocolIdentifier::Dcep => Ok((DataMessageType::Control, payload)),
            PayloadProtocolIdentifier::String => Ok((DataMessageType::Text, payload)),
            PayloadProtocolIdentifier::Binary => Ok((DataMessageType::Binary, payload)),
            PayloadProtocolIdentifier::StringEmpty => Ok((DataMessageType::Text, Bytes::new())),
            PayloadProtocolIdentifier::BinaryEmpty => Ok((DataMessageType::Binary, Bytes::new())),
            PayloadProtocolIdentifier::Unknown => {
                Err(Error::InvalidPayloadProtocolIdentifier(ppi as u32))
            }
        }
    }
}

/// SendDataParams accompany every message handed to the transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct SendDataParams {
    pub data_message_type: DataMessageType,
    pub ordered: bool,
    pub max_rtx_count: Option<u16>,
    pub max_rtx_ms: Option<u16>,
}

/// ReceiveDataParams describe a message delivered by the transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReceiveDataParams {
    pub sid: SctpSid,
    pub data_message_type: DataMessageType,
}

/// DataChannelTransport is the SCTP side a data channel talks to.
///
/// Implementations route inbound messages and stream reset notifications back
/// to the channel through its `on_*` methods.
pub trait DataChannelTransport {
    /// send_data hands one user message to the stream `sid`.
    ///
    /// Returns `Err(Error::ErrStreamBlocked)` when the message cannot be
    /// accepted right now; any other error is treated as fatal for the channel.
    fn send_data(&mut self, sid: SctpSid, params: &SendDataParams, payload: &Bytes) -> Result<()>;

    /// connect_data_channel registers the channel as the delivery target for
    /// its stream. Returns false when no transport exists yet.
    fn connect_data_channel(&mut self, internal_id: u64) -> bool;

    fn disconnect_data_channel(&mut self, internal_id: u64);

    /// add_sctp_data_stream opens the outgoing stream `sid`.
    fn add_sctp_data_stream(&mut self, sid: SctpSid);

    /// remove_sctp_data_stream resets the outgoing stream `sid`, starting the
    /// closing procedure. Completion is reported later through
    /// `DataChannel::on_closing_procedure_complete`.
    fn remove_sctp_data_stream(&mut self, sid: SctpSid);

    /// ready_to_send_data reports whether the transport is currently writable.
    fn ready_to_send_data(&self) -> bool;
}

impl<T: DataChannelTransport + ?Sized> DataChannelTransport for Box<T> {
    fn send_data(&mut self, sid: SctpSid, params: &SendDataParams, payload: &Bytes) -> Result<()> {
        (**self).send_data(sid, params, payload)
    }

    fn connect_data_channel(&mut self, internal_id: u64) -> bool {
        (**self).connect_data_channel(internal_id)
    }

    fn disconnect_data_channel(&mut self, internal_id: u64) {
        (**self).disconnect_data_channel(internal_id)
    }

    fn add_sctp_data_stream(&mut self, sid: SctpSid) {
        (**self).add_sctp_data_stream(sid)
    }

    fn remove_sctp_data_stream(&mut self, sid: SctpSid) {
        (**self).remove_sctp_data_stream(sid)
    }

    fn ready_to_send_data(&self) -> bool {
        (**self).ready_to_send_data()
    }
}
