use crate::data_channel::event::RTCDataChannelEvent;
use crate::data_channel::message::RTCDataChannelMessage;
use crate::data_channel::state::RTCDataChannelState;

/// DataChannelObserver receives the events of one data channel.
///
/// Callbacks run on the task owning the channel, after the command that
/// produced them has completed. Calls made through a `DataChannelHandle` from
/// inside a callback are queued behind the current one.
pub trait DataChannelObserver: Send {
    fn on_state_change(&mut self, state: RTCDataChannelState);

    fn on_message(&mut self, message: RTCDataChannelMessage);

    /// on_buffered_amount_change reports the size of a message that was just
    /// handed to the transport.
    fn on_buffered_amount_change(&mut self, _sent_data_size: usize) {}

    fn on_buffered_amount_low(&mut self) {}
}

pub(crate) fn dispatch_event(observer: &mut dyn DataChannelObserver, event: RTCDataChannelEvent) {
    match event {
        RTCDataChannelEvent::OnStateChange(state) => observer.on_state_change(state),
        RTCDataChannelEvent::OnMessage(message) => observer.on_message(message),
        RTCDataChannelEvent::OnBufferedAmountChange(size) => {
            observer.on_buffered_amount_change(size)
        }
        RTCDataChannelEvent::OnBufferedAmountLow => observer.on_buffered_amount_low(),
    }
}
