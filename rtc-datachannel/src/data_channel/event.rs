use super::message::RTCDataChannelMessage;
use super::state::RTCDataChannelState;

/// Events produced by a data channel, drained with `DataChannel::poll_event`.
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCDataChannelEvent {
    /// Fired on every public lifecycle transition.
    OnStateChange(RTCDataChannelState),
    /// A message delivered to the registered observer.
    OnMessage(RTCDataChannelMessage),
    /// Size in bytes of a message that was just handed to the transport.
    OnBufferedAmountChange(usize),
    /// The buffered amount dropped to or below the low threshold.
    OnBufferedAmountLow,
}
