#![allow(dead_code)]

#[cfg(test)]
mod error_test;

use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum Error {
    //Marshal
    #[error(
        "DataChannel message is not long enough to determine type: (expected: {expected}, actual: {actual})"
    )]
    UnexpectedEndOfBuffer { expected: usize, actual: usize },
    #[error("Unknown MessageType {0}")]
    InvalidMessageType(u8),
    #[error("Unknown ChannelType {0}")]
    InvalidChannelType(u8),
    #[error("Unknown PayloadProtocolIdentifier {0}")]
    InvalidPayloadProtocolIdentifier(u32),

    //SCTP stream
    /// ErrStreamBlocked is returned by a transport that cannot accept a
    /// message right now. The sender should retry later without reordering.
    #[error("sctp stream blocked")]
    ErrStreamBlocked,
    #[error("Stream not existed")]
    ErrStreamNotExisted,
    #[error("Max Data Channel ID")]
    ErrMaxDataChannelID,
    #[error("sctp stream id {0} is out of range")]
    ErrInvalidSctpSid(u16),

    //Data Channel configuration
    /// ErrRetransmitsOrPacketLifeTime indicates that an attempt to create a data
    /// channel was made with both options max_packet_life_time and max_retransmits
    /// set together. Such configuration is not allowed by the W3C API
    /// and is mutually exclusive.
    #[error("both max_packet_life_time and max_retransmits was set")]
    ErrRetransmitsOrPacketLifeTime,

    /// ErrInvalidDataChannelId indicates a negotiated id outside of 0..=1023.
    #[error("data channel id {0} is out of range")]
    ErrInvalidDataChannelId(i32),

    /// ErrStringSizeLimit indicates that the character size limit of string is
    /// exceeded. The limit is hardcoded to 65535 according to specifications.
    #[error("data channel label exceeds size limit")]
    ErrStringSizeLimit,

    /// ErrProtocolTooLarge indicates that value given for a DataChannelInit protocol is
    /// longer then 65535 bytes
    #[error("protocol is larger then 65535 bytes")]
    ErrProtocolTooLarge,

    //Data Channel runtime
    /// ErrDataChannelNotOpen is returned by send() unless the channel is open.
    /// The channel state is left untouched.
    #[error("DataChannel is not opened")]
    ErrDataChannelNotOpen,

    /// ErrOutboundQueueFull is returned by send() when queueing the message
    /// would exceed the maximum send queue size. The channel stays open.
    #[error("outbound queue of the data channel is full")]
    ErrOutboundQueueFull,

    #[error("sctp stream id is already assigned")]
    ErrSctpSidAlreadySet,
    #[error("data channel is no longer connecting")]
    ErrDataChannelNotConnecting,

    /// ErrDataChannelActorGone indicates that the task owning a data channel
    /// has exited, so the command could not be delivered.
    #[error("data channel task has exited")]
    ErrDataChannelActorGone,

    /// ErrDataChannelFailure classifies an abrupt close caused by the data
    /// channel itself, e.g. when queued received data exceeds its cap.
    #[error("data channel failure: {0}")]
    ErrDataChannelFailure(String),

    /// ErrNetworkError classifies an abrupt close caused by the transport,
    /// e.g. a failed send or a torn down association.
    #[error("network error: {0}")]
    ErrNetworkError(String),

    #[error("utf-8 error: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// is_network_error reports whether the error was classified as a
    /// transport failure.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::ErrNetworkError(_))
    }

    /// is_data_channel_failure reports whether the error was classified as a
    /// failure of the data channel itself, such as resource exhaustion.
    pub fn is_data_channel_failure(&self) -> bool {
        matches!(self, Error::ErrDataChannelFailure(_))
    }
}
