use super::state::RTCDataChannelState;
use crate::sid_allocator::SctpSid;
use serde::{Deserialize, Serialize};

/// DataChannelStats is a snapshot of the counters of one data channel.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://www.w3.org/TR/webrtc-stats/#dcstats-dict*
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannelStats {
    pub internal_id: u64,
    pub label: String,
    pub protocol: String,
    pub data_channel_identifier: Option<SctpSid>,
    pub state: RTCDataChannelState,
    pub messages_sent: usize,
    pub bytes_sent: usize,
    pub messages_received: usize,
    pub bytes_received: usize,
    pub buffered_amount: usize,
}
