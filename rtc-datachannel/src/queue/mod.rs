
use crate::data_channel::message::RTCDataChannelMessage;
use std::collections::VecDeque;

/// PacketQueue is a FIFO of messages that keeps a running byte count.
///
/// It does not enforce any cap itself; owners check `byte_count()` before
/// pushing.
#[derive(Default, Debug, Clone)]
pub struct PacketQueue {
    packets: VecDeque<RTCDataChannelMessage>,
    byte_count: usize,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// byte_count returns the sum of payload sizes of all queued messages.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    pub fn push_back(&mut self, packet: RTCDataChannelMessage) {
        self.byte_count += packet.data.len();
        self.packets.push_back(packet);
    }

    /// push_front puts a message back at the head, e.g. after a send attempt
    /// was blocked, so that retries keep the original order.
    pub fn push_front(&mut self, packet: RTCDataChannelMessage) {
        self.byte_count += packet.data.len();
        self.packets.push_front(packet);
    }

    pub fn pop_front(&mut self) -> Option<RTCDataChannelMessage> {
        let packet = self.packets.pop_front()?;
        self.byte_count -= packet.data.len();
        Some(packet)
    }

    pub fn clear(&mut self) {
        self.packets.clear();
        self.byte_count = 0;
    }

    /// take moves all queued messages out, leaving the queue empty.
    pub fn take(&mut self) -> PacketQueue {
        std::mem::take(self)
    }
}
