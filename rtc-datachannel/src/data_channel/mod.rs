
pub mod config;
pub mod event;
pub mod message;
pub mod state;
pub mod stats;
pub mod transport;

use crate::message::message_channel_ack::DataChannelAck;
use crate::message::Message;
use crate::queue::PacketQueue;
use crate::sid_allocator::{SctpSid, MAX_SCTP_SID};
use bytes::Bytes;
use config::DataChannelConfig;
use event::RTCDataChannelEvent;
use log::{debug, error, info, trace, warn};
use message::RTCDataChannelMessage;
use shared::error::{Error, Result};
use shared::marshal::*;
use state::{HandshakeState, RTCDataChannelState};
use stats::DataChannelStats;
use std::collections::VecDeque;
use std::time::Instant;
use transport::{DataChannelTransport, DataMessageType, ReceiveDataParams, SendDataParams};

/// Maximum number of bytes buffered by send() before it starts failing.
pub const MAX_QUEUED_SEND_DATA_BYTES: usize = 16 * 1024 * 1024;

/// Maximum number of bytes received before an observer is attached. Going
/// over closes the channel.
pub const MAX_QUEUED_RECEIVED_DATA_BYTES: usize = 16 * 1024 * 1024;

/// InternalIdGenerator hands out the debug-visible identifiers of the data
/// channels created by one owner.
#[derive(Default, Debug, Clone)]
pub struct InternalIdGenerator {
    next_id: u64,
}

impl InternalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

enum SendOutcome {
    Sent,
    Blocked(RTCDataChannelMessage),
    Failed(Error),
}

/// DataChannel is the per-channel protocol state machine.
///
/// It owns the public lifecycle (`RTCDataChannelState`), the DCEP handshake,
/// and three queues: outbound data, outbound control and inbound data. The
/// transport is driven through `T`; the transport reports back through the
/// `on_*` methods. Observable events are queued and drained with
/// `poll_event`, so nothing is called back while a method is running.
pub struct DataChannel<T: DataChannelTransport> {
    internal_id: u64,
    config: DataChannelConfig,
    sid: Option<SctpSid>,
    transport: T,

    state: RTCDataChannelState,
    handshake_state: HandshakeState,
    connected_to_transport: bool,
    writable: bool,
    started_closing_procedure: bool,
    has_observer: bool,
    error: Option<Error>,
    handshake_deadline: Option<Instant>,

    queued_send_data: PacketQueue,
    queued_control_data: PacketQueue,
    queued_received_data: PacketQueue,
    buffered_amount_low_threshold: usize,

    event_outs: VecDeque<RTCDataChannelEvent>,

    // stats
    messages_sent: usize,
    messages_received: usize,
    bytes_sent: usize,
    bytes_received: usize,
}

impl<T: DataChannelTransport> DataChannel<T> {
    /// new validates `config` and creates the channel in `Connecting`.
    ///
    /// The channel tries to connect to `transport` right away and, if the
    /// transport is already writable, starts the handshake.
    pub fn new(internal_id: u64, config: DataChannelConfig, transport: T) -> Result<Self> {
        if let Err(err) = config.validate() {
            error!(
                "Failed to initialize the data channel {:?} due to invalid config: {}",
                config.label, err
            );
            return Err(err);
        }

        let handshake_state = HandshakeState::from(config.handshake_role);
        let mut data_channel = Self {
            internal_id,
            sid: config.id,
            config,
            transport,

            state: RTCDataChannelState::Connecting,
            handshake_state,
            connected_to_transport: false,
            writable: false,
            started_closing_procedure: false,
            has_observer: false,
            error: None,
            handshake_deadline: None,

            queued_send_data: PacketQueue::new(),
            queued_control_data: PacketQueue::new(),
            queued_received_data: PacketQueue::new(),
            buffered_amount_low_threshold: 0,

            event_outs: VecDeque::new(),

            messages_sent: 0,
            messages_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
        };

        debug!(
            "data channel {} {:?} created with sid {:?}, handshake {}",
            internal_id, data_channel.config.label, data_channel.sid, handshake_state
        );

        data_channel.on_transport_registered();
        if data_channel.transport.ready_to_send_data() {
            data_channel.on_transport_ready(true);
        }

        Ok(data_channel)
    }

    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    pub fn config(&self) -> &DataChannelConfig {
        &self.config
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// sid returns the stream id, None until one is assigned.
    pub fn sid(&self) -> Option<SctpSid> {
        self.sid
    }

    pub fn state(&self) -> RTCDataChannelState {
        self.state
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake_state
    }

    /// error returns the reason of an abrupt close. It is set before the
    /// `Closed` state change is queued.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// buffered_amount returns the number of bytes queued by send() that
    /// have not been handed to the transport yet.
    pub fn buffered_amount(&self) -> usize {
        self.queued_send_data.byte_count()
    }

    pub fn buffered_amount_low_threshold(&self) -> usize {
        self.buffered_amount_low_threshold
    }

    pub fn set_buffered_amount_low_threshold(&mut self, threshold: usize) {
        self.buffered_amount_low_threshold = threshold;
    }

    /// MessagesSent returns the number of messages sent
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    /// MessagesReceived returns the number of messages received
    pub fn messages_received(&self) -> usize {
        self.messages_received
    }

    /// BytesSent returns the number of bytes sent
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// BytesReceived returns the number of bytes received
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    pub fn stats(&self) -> DataChannelStats {
        DataChannelStats {
            internal_id: self.internal_id,
            label: self.config.label.clone(),
            protocol: self.config.protocol.clone(),
            data_channel_identifier: self.sid,
            state: self.state,
            messages_sent: self.messages_sent,
            bytes_sent: self.bytes_sent,
            messages_received: self.messages_received,
            bytes_received: self.bytes_received,
            buffered_amount: self.buffered_amount(),
        }
    }

    /// poll_event returns the next queued event.
    pub fn poll_event(&mut self) -> Option<RTCDataChannelEvent> {
        self.event_outs.pop_front()
    }

    /// poll_timeout returns the deadline of the pending DATA_CHANNEL_ACK, if
    /// a handshake timeout is configured.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.handshake_deadline
    }

    /// handle_timeout closes the channel when the ACK did not arrive in time.
    pub fn handle_timeout(&mut self, now: Instant) {
        let Some(deadline) = self.handshake_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.handshake_deadline = None;

        if self.handshake_state == HandshakeState::WaitingForAck
            && self.state != RTCDataChannelState::Closed
        {
            warn!(
                "data channel {} timed out waiting for DATA_CHANNEL_ACK, sid = {:?}",
                self.internal_id, self.sid
            );
            self.close_abruptly_with_error(Error::ErrNetworkError(
                "timed out waiting for DATA_CHANNEL_ACK".to_owned(),
            ));
        }
    }

    /// register_observer attaches the application and delivers any message
    /// received while no observer was attached.
    pub fn register_observer(&mut self) {
        self.has_observer = true;
        self.deliver_queued_received_data();
    }

    pub fn unregister_observer(&mut self) {
        self.has_observer = false;
    }

    /// send hands `buffer` to the transport, or queues it behind messages
    /// that are already waiting.
    ///
    /// Fails with `ErrDataChannelNotOpen` unless the channel is open, and with
    /// `ErrOutboundQueueFull` when the message does not fit into the send
    /// queue. Neither failure changes the channel state. A transport failure
    /// closes the channel; inspect `error()` after observing `Closed`.
    pub fn send(&mut self, buffer: RTCDataChannelMessage) -> Result<()> {
        if self.state != RTCDataChannelState::Open {
            return Err(Error::ErrDataChannelNotOpen);
        }

        // If the queue is non-empty, we're waiting for the transport to get
        // writable again, so just add to the end of the queue and keep waiting.
        if !self.queued_send_data.is_empty() {
            return self.queue_send_data_message(buffer, false);
        }

        match self.send_data_message(buffer) {
            SendOutcome::Sent => Ok(()),
            SendOutcome::Blocked(buffer) => self.queue_send_data_message(buffer, true),
            SendOutcome::Failed(err) => {
                error!(
                    "Closing data channel {} due to a failure to send data: {}",
                    self.internal_id, err
                );
                self.close_abruptly_with_error(Error::ErrNetworkError(format!(
                    "failure to send data: {err}"
                )));
                Ok(())
            }
        }
    }

    /// close starts the closing procedure. Queued data is still sent before
    /// the outgoing stream is reset. Calling close more than once is a no-op.
    pub fn close(&mut self) {
        if self.state == RTCDataChannelState::Closing || self.state == RTCDataChannelState::Closed
        {
            return;
        }

        self.set_state(RTCDataChannelState::Closing);
        self.update_state();
    }

    /// set_sctp_sid binds a stream id to a channel created without one.
    ///
    /// Only allowed while connecting and only once; setting the same id
    /// again is a no-op.
    pub fn set_sctp_sid(&mut self, sid: SctpSid) -> Result<()> {
        if self.sid == Some(sid) {
            return Ok(());
        }
        if self.sid.is_some() {
            return Err(Error::ErrSctpSidAlreadySet);
        }
        if self.state != RTCDataChannelState::Connecting {
            return Err(Error::ErrDataChannelNotConnecting);
        }
        if sid > MAX_SCTP_SID {
            return Err(Error::ErrInvalidSctpSid(sid));
        }

        debug!("data channel {} bound to sid {}", self.internal_id, sid);
        self.sid = Some(sid);
        self.config.id = Some(sid);
        self.transport.add_sctp_data_stream(sid);
        self.update_state();

        Ok(())
    }

    /// on_transport_registered is called once the transport exists, so the
    /// channel can connect to it and open its stream.
    pub fn on_transport_registered(&mut self) {
        if !self.connected_to_transport {
            self.connected_to_transport = self.transport.connect_data_channel(self.internal_id);
        }
        // The sid may have been unassigned when the channel got connected, so
        // always add the stream even if already connected.
        if let Some(sid) = self.sid {
            self.transport.add_sctp_data_stream(sid);
        }
        self.update_state();
    }

    /// on_transport_ready is called whenever the writability of the
    /// transport changes.
    pub fn on_transport_ready(&mut self, writable: bool) {
        trace!(
            "data channel {} transport writable = {}",
            self.internal_id,
            writable
        );
        self.writable = writable;
        if !writable {
            return;
        }

        self.send_queued_control_messages();
        self.send_queued_data_messages();

        self.update_state();
    }

    /// on_data_received handles a message the transport delivered on this
    /// channel's stream.
    pub fn on_data_received(&mut self, params: ReceiveDataParams, payload: Bytes) {
        if self.state == RTCDataChannelState::Closed {
            debug!(
                "data channel {} is closed, dropping {} bytes, sid = {}",
                self.internal_id,
                payload.len(),
                params.sid
            );
            return;
        }

        if params.data_message_type == DataMessageType::Control {
            if self.handshake_state != HandshakeState::WaitingForAck {
                // Ignore it if we are not expecting an ACK message.
                warn!(
                    "data channel {} received unexpected CONTROL message, sid = {}",
                    self.internal_id, params.sid
                );
                return;
            }
            if Message::is_open_ack(&payload) {
                // We can send unordered as soon as we receive the ACK message.
                self.handshake_ready();
                info!(
                    "data channel {} received DATA_CHANNEL_ACK message, sid = {}",
                    self.internal_id, params.sid
                );
            } else {
                warn!(
                    "data channel {} failed to parse DATA_CHANNEL_ACK message, sid = {}",
                    self.internal_id, params.sid
                );
            }
            return;
        }

        // We can send unordered as soon as we receive any DATA message since
        // the remote side must have received the OPEN (and old clients do not
        // send ACK).
        if self.handshake_state == HandshakeState::WaitingForAck {
            self.handshake_ready();
        }

        let buffer = RTCDataChannelMessage {
            is_string: params.data_message_type == DataMessageType::Text,
            data: payload,
        };

        if self.state == RTCDataChannelState::Open && self.has_observer {
            self.deliver(buffer);
            return;
        }

        if self.queued_received_data.byte_count() + buffer.data.len()
            > MAX_QUEUED_RECEIVED_DATA_BYTES
        {
            error!(
                "data channel {}: queued received data exceeds the max buffer size",
                self.internal_id
            );
            self.queued_received_data.clear();
            self.close_abruptly_with_error(Error::ErrDataChannelFailure(
                "queued received data exceeds the max buffer size".to_owned(),
            ));
            return;
        }
        self.queued_received_data.push_back(buffer);
    }

    /// on_closing_procedure_started_remotely is called when the peer reset
    /// its outgoing stream `sid`.
    pub fn on_closing_procedure_started_remotely(&mut self, sid: SctpSid) {
        if self.sid != Some(sid)
            || self.state == RTCDataChannelState::Closing
            || self.state == RTCDataChannelState::Closed
        {
            return;
        }

        debug!(
            "data channel {} closing procedure started remotely, sid = {}",
            self.internal_id, sid
        );
        // Queued data is not sent, the side that initiated the closure would
        // not receive it anyway. The transport resets our outgoing stream and
        // reports completion through on_closing_procedure_complete.
        self.queued_control_data.clear();
        self.queued_send_data.clear();
        self.started_closing_procedure = true;
        self.set_state(RTCDataChannelState::Closing);
    }

    /// on_closing_procedure_complete is called once both directions of
    /// stream `sid` have been reset.
    pub fn on_closing_procedure_complete(&mut self, sid: SctpSid) {
        if self.sid != Some(sid) || self.state == RTCDataChannelState::Closed {
            return;
        }

        if self.state != RTCDataChannelState::Closing {
            warn!(
                "data channel {} closing procedure completed while {}",
                self.internal_id, self.state
            );
            self.queued_control_data.clear();
            self.queued_send_data.clear();
            self.set_state(RTCDataChannelState::Closing);
        }

        self.disconnect_from_transport();
        self.set_state(RTCDataChannelState::Closed);
    }

    /// on_transport_closed is called when the transport became unusable, e.g.
    /// the association or the DTLS transport was closed.
    pub fn on_transport_closed(&mut self, err: Option<Error>) {
        let err = match err {
            Some(err) if err.is_network_error() || err.is_data_channel_failure() => err,
            Some(err) => Error::ErrNetworkError(err.to_string()),
            None => Error::ErrNetworkError("transport channel closed".to_owned()),
        };
        self.close_abruptly_with_error(err);
    }

    fn update_state(&mut self) {
        match self.state {
            RTCDataChannelState::Connecting => {
                if !self.connected_to_transport || !self.writable || self.sid.is_none() {
                    return;
                }

                if self.queued_control_data.is_empty() {
                    match self.handshake_state {
                        HandshakeState::ShouldSendOpen => match self.config.open_message() {
                            Ok(payload) => self.send_control_message(payload),
                            Err(err) => error!(
                                "data channel {} failed to marshal DATA_CHANNEL_OPEN: {}",
                                self.internal_id, err
                            ),
                        },
                        HandshakeState::ShouldSendAck => {
                            match Message::DataChannelAck(DataChannelAck {}).marshal_frozen() {
                                Ok(payload) => self.send_control_message(payload),
                                Err(err) => error!(
                                    "data channel {} failed to marshal DATA_CHANNEL_ACK: {}",
                                    self.internal_id, err
                                ),
                            }
                        }
                        _ => {}
                    }
                }

                if self.state == RTCDataChannelState::Connecting
                    && self.writable
                    && (self.handshake_state == HandshakeState::Ready
                        || self.handshake_state == HandshakeState::WaitingForAck)
                {
                    self.set_state(RTCDataChannelState::Open);
                    self.deliver_queued_received_data();
                }
            }
            RTCDataChannelState::Closing => {
                let Some(sid) = self.sid.filter(|_| self.connected_to_transport) else {
                    // Without a transport or a stream there is nothing to
                    // reset, so go to Closed directly.
                    debug!(
                        "data channel {} closed without a stream to reset, sid = {:?}",
                        self.internal_id, self.sid
                    );
                    self.queued_send_data.clear();
                    self.queued_control_data.clear();
                    self.handshake_deadline = None;
                    self.disconnect_from_transport();
                    self.set_state(RTCDataChannelState::Closed);
                    return;
                };

                // Wait for all queued data to be sent before beginning the
                // closing procedure.
                if !self.queued_send_data.is_empty() || !self.queued_control_data.is_empty() {
                    return;
                }
                if !self.started_closing_procedure {
                    debug!(
                        "data channel {} resetting outgoing stream {}",
                        self.internal_id, sid
                    );
                    self.started_closing_procedure = true;
                    self.transport.remove_sctp_data_stream(sid);
                }
            }
            RTCDataChannelState::Open
            | RTCDataChannelState::Closed
            | RTCDataChannelState::Unspecified => {}
        }
    }

    fn set_state(&mut self, state: RTCDataChannelState) {
        if self.state == state {
            return;
        }

        info!(
            "data channel {} {:?} state changed: {} -> {}",
            self.internal_id, self.config.label, self.state, state
        );
        self.state = state;
        self.event_outs
            .push_back(RTCDataChannelEvent::OnStateChange(state));
    }

    fn handshake_ready(&mut self) {
        self.handshake_state = HandshakeState::Ready;
        self.handshake_deadline = None;
    }

    fn deliver(&mut self, buffer: RTCDataChannelMessage) {
        self.messages_received += 1;
        self.bytes_received += buffer.data.len();
        self.event_outs
            .push_back(RTCDataChannelEvent::OnMessage(buffer));
    }

    fn deliver_queued_received_data(&mut self) {
        if !self.has_observer || self.state != RTCDataChannelState::Open {
            return;
        }

        while let Some(buffer) = self.queued_received_data.pop_front() {
            self.deliver(buffer);
        }
    }

    fn send_queued_data_messages(&mut self) {
        if self.queued_send_data.is_empty() {
            return;
        }

        let start_buffered_amount = self.queued_send_data.byte_count();
        while let Some(buffer) = self.queued_send_data.pop_front() {
            match self.send_data_message(buffer) {
                SendOutcome::Sent => {}
                SendOutcome::Blocked(buffer) => {
                    // Return the message to the front of the queue.
                    self.queued_send_data.push_front(buffer);
                    break;
                }
                SendOutcome::Failed(err) => {
                    error!(
                        "Closing data channel {} due to a failure to send queued data: {}",
                        self.internal_id, err
                    );
                    self.close_abruptly_with_error(Error::ErrNetworkError(format!(
                        "failure to send data: {err}"
                    )));
                    return;
                }
            }
        }

        let buffered_amount = self.queued_send_data.byte_count();
        if start_buffered_amount > self.buffered_amount_low_threshold
            && buffered_amount <= self.buffered_amount_low_threshold
        {
            self.event_outs
                .push_back(RTCDataChannelEvent::OnBufferedAmountLow);
        }
    }

    fn send_data_message(&mut self, buffer: RTCDataChannelMessage) -> SendOutcome {
        let Some(sid) = self.sid else {
            return SendOutcome::Failed(Error::ErrStreamNotExisted);
        };

        let mut params = SendDataParams {
            data_message_type: if buffer.is_string {
                DataMessageType::Text
            } else {
                DataMessageType::Binary
            },
            ordered: self.config.ordered,
            max_rtx_count: self.config.max_retransmits,
            max_rtx_ms: self.config.max_packet_life_time,
        };

        // Send as ordered if it is still going through OPEN/ACK signaling.
        if self.handshake_state != HandshakeState::Ready && !self.config.ordered {
            trace!(
                "data channel {} sends ordered until DATA_CHANNEL_ACK arrives",
                self.internal_id
            );
            params.ordered = true;
        }

        match self.transport.send_data(sid, &params, &buffer.data) {
            Ok(()) => {
                let size = buffer.data.len();
                self.messages_sent += 1;
                self.bytes_sent += size;
                if size > 0 {
                    self.event_outs
                        .push_back(RTCDataChannelEvent::OnBufferedAmountChange(size));
                }
                SendOutcome::Sent
            }
            Err(Error::ErrStreamBlocked) => SendOutcome::Blocked(buffer),
            Err(err) => SendOutcome::Failed(err),
        }
    }

    fn queue_send_data_message(
        &mut self,
        buffer: RTCDataChannelMessage,
        at_front: bool,
    ) -> Result<()> {
        if self.queued_send_data.byte_count() + buffer.data.len() > MAX_QUEUED_SEND_DATA_BYTES {
            warn!(
                "data channel {} can't buffer any more data, {} bytes queued",
                self.internal_id,
                self.queued_send_data.byte_count()
            );
            return Err(Error::ErrOutboundQueueFull);
        }

        if at_front {
            self.queued_send_data.push_front(buffer);
        } else {
            self.queued_send_data.push_back(buffer);
        }
        Ok(())
    }

    fn send_queued_control_messages(&mut self) {
        let mut control_packets = self.queued_control_data.take();
        while let Some(buffer) = control_packets.pop_front() {
            if self.state == RTCDataChannelState::Closed {
                return;
            }
            self.send_control_message(buffer.data);
        }
    }

    fn send_control_message(&mut self, payload: Bytes) {
        let Some(sid) = self.sid else {
            return;
        };

        let is_open_message = self.handshake_state == HandshakeState::ShouldSendOpen;
        let params = SendDataParams {
            data_message_type: DataMessageType::Control,
            // The OPEN message is always sent ordered.
            ordered: self.config.ordered || is_open_message,
            max_rtx_count: self.config.max_retransmits,
            max_rtx_ms: self.config.max_packet_life_time,
        };

        match self.transport.send_data(sid, &params, &payload) {
            Ok(()) => {
                debug!(
                    "data channel {} sent control message in handshake {}, sid = {}",
                    self.internal_id, self.handshake_state, sid
                );
                match self.handshake_state {
                    HandshakeState::ShouldSendAck => {
                        self.handshake_state = HandshakeState::Ready;
                    }
                    HandshakeState::ShouldSendOpen => {
                        self.handshake_state = HandshakeState::WaitingForAck;
                        self.handshake_deadline = self
                            .config
                            .handshake_timeout
                            .map(|timeout| Instant::now() + timeout);
                    }
                    _ => {}
                }
            }
            Err(Error::ErrStreamBlocked) => {
                self.queued_control_data
                    .push_back(RTCDataChannelMessage::binary(payload));
            }
            Err(err) => {
                error!(
                    "Closing data channel {} due to a failure to send the control message: {}",
                    self.internal_id, err
                );
                self.close_abruptly_with_error(Error::ErrNetworkError(format!(
                    "failure to send control message: {err}"
                )));
            }
        }
    }

    fn disconnect_from_transport(&mut self) {
        if !self.connected_to_transport {
            return;
        }

        self.transport.disconnect_data_channel(self.internal_id);
        self.connected_to_transport = false;
    }

    /// close_abruptly_with_error drops all queued outbound messages and goes
    /// to `Closed` without the closing handshake.
    fn close_abruptly_with_error(&mut self, err: Error) {
        if self.state == RTCDataChannelState::Closed {
            return;
        }

        self.disconnect_from_transport();

        // Closing abruptly means any queued data gets thrown away.
        self.queued_send_data.clear();
        self.queued_control_data.clear();
        self.handshake_deadline = None;

        // Still go to Closing before Closed, since observers may be expecting that.
        self.set_state(RTCDataChannelState::Closing);
        self.error = Some(err);
        self.set_state(RTCDataChannelState::Closed);
    }
}
