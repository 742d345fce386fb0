#[cfg(test)]
mod actor_test;

pub mod observer;

use crate::data_channel::message::RTCDataChannelMessage;
use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::stats::DataChannelStats;
use crate::data_channel::transport::{DataChannelTransport, ReceiveDataParams};
use crate::data_channel::DataChannel;
use crate::sid_allocator::SctpSid;
use bytes::Bytes;
use log::{debug, trace, warn};
use observer::{dispatch_event, DataChannelObserver};
use shared::error::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Called once with the stream id of the channel after it reached `Closed`,
/// so the owner can release the id back to its allocator.
pub type ReleaseFn = Box<dyn FnOnce(u64, Option<SctpSid>) + Send>;

enum DataChannelCommand {
    Send(RTCDataChannelMessage, Option<oneshot::Sender<Result<()>>>),
    Close,
    RegisterObserver(Box<dyn DataChannelObserver>),
    UnregisterObserver,
    SetSctpSid(SctpSid, oneshot::Sender<Result<()>>),
    SetBufferedAmountLowThreshold(usize),

    TransportRegistered,
    TransportReady(bool),
    DataReceived(ReceiveDataParams, Bytes),
    ClosingProcedureStartedRemotely(SctpSid),
    ClosingProcedureComplete(SctpSid),
    TransportClosed(Option<Error>),

    State(oneshot::Sender<RTCDataChannelState>),
    Stats(oneshot::Sender<DataChannelStats>),
    Error(oneshot::Sender<Option<Error>>),
}

/// DataChannelHandle is a cloneable reference to a data channel owned by its
/// own task.
///
/// Every call is queued to that task, so the channel is only ever touched
/// from one place. Calls that do not need an answer never wait, which makes
/// them usable from observer callbacks and from transport code.
#[derive(Clone)]
pub struct DataChannelHandle {
    internal_id: u64,
    label: String,
    tx: mpsc::UnboundedSender<DataChannelCommand>,
}

impl DataChannelHandle {
    /// spawn moves `data_channel` into a new task and returns a handle to it.
    ///
    /// The task ends after the channel reached `Closed`, or when every handle
    /// was dropped, and calls `on_release` exactly once before it ends.
    pub fn spawn<T>(data_channel: DataChannel<T>, on_release: ReleaseFn) -> (Self, JoinHandle<()>)
    where
        T: DataChannelTransport + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            internal_id: data_channel.internal_id(),
            label: data_channel.label().to_owned(),
            tx,
        };

        let actor = DataChannelActor {
            data_channel,
            observer: None,
            rx,
            on_release: Some(on_release),
        };
        let join_handle = tokio::spawn(actor.run());

        (handle, join_handle)
    }

    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// is_closed reports whether the owning task has ended.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn post(&self, command: DataChannelCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::ErrDataChannelActorGone)
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> DataChannelCommand,
    ) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(command(reply_tx))?;
        reply_rx.await.map_err(|_| Error::ErrDataChannelActorGone)
    }

    /// send waits until the channel accepted or rejected `message`.
    pub async fn send(&self, message: RTCDataChannelMessage) -> Result<()> {
        self.request(|reply| DataChannelCommand::Send(message, Some(reply)))
            .await?
    }

    pub async fn send_text(&self, s: impl Into<String>) -> Result<()> {
        self.send(RTCDataChannelMessage::text(s)).await
    }

    /// post_send queues `message` without waiting for the result. Rejections
    /// are only visible in the logs.
    pub fn post_send(&self, message: RTCDataChannelMessage) -> Result<()> {
        self.post(DataChannelCommand::Send(message, None))
    }

    pub fn close(&self) -> Result<()> {
        self.post(DataChannelCommand::Close)
    }

    /// register_observer replaces the current observer. Messages received
    /// while no observer was registered are delivered to it.
    pub fn register_observer(&self, observer: impl DataChannelObserver + 'static) -> Result<()> {
        self.post(DataChannelCommand::RegisterObserver(Box::new(observer)))
    }

    pub fn unregister_observer(&self) -> Result<()> {
        self.post(DataChannelCommand::UnregisterObserver)
    }

    pub async fn set_sctp_sid(&self, sid: SctpSid) -> Result<()> {
        self.request(|reply| DataChannelCommand::SetSctpSid(sid, reply))
            .await?
    }

    pub fn set_buffered_amount_low_threshold(&self, threshold: usize) -> Result<()> {
        self.post(DataChannelCommand::SetBufferedAmountLowThreshold(threshold))
    }

    pub async fn state(&self) -> Result<RTCDataChannelState> {
        self.request(DataChannelCommand::State).await
    }

    pub async fn stats(&self) -> Result<DataChannelStats> {
        self.request(DataChannelCommand::Stats).await
    }

    /// error returns the reason of an abrupt close, if any.
    pub async fn error(&self) -> Result<Option<Error>> {
        self.request(DataChannelCommand::Error).await
    }

    pub fn on_transport_registered(&self) -> Result<()> {
        self.post(DataChannelCommand::TransportRegistered)
    }

    pub fn on_transport_ready(&self, writable: bool) -> Result<()> {
        self.post(DataChannelCommand::TransportReady(writable))
    }

    pub fn on_data_received(&self, params: ReceiveDataParams, payload: Bytes) -> Result<()> {
        self.post(DataChannelCommand::DataReceived(params, payload))
    }

    pub fn on_closing_procedure_started_remotely(&self, sid: SctpSid) -> Result<()> {
        self.post(DataChannelCommand::ClosingProcedureStartedRemotely(sid))
    }

    pub fn on_closing_procedure_complete(&self, sid: SctpSid) -> Result<()> {
        self.post(DataChannelCommand::ClosingProcedureComplete(sid))
    }

    pub fn on_transport_closed(&self, err: Option<Error>) -> Result<()> {
        self.post(DataChannelCommand::TransportClosed(err))
    }
}

struct DataChannelActor<T: DataChannelTransport> {
    data_channel: DataChannel<T>,
    observer: Option<Box<dyn DataChannelObserver>>,
    rx: mpsc::UnboundedReceiver<DataChannelCommand>,
    on_release: Option<ReleaseFn>,
}

impl<T: DataChannelTransport> DataChannelActor<T> {
    async fn run(mut self) {
        let internal_id = self.data_channel.internal_id();
        debug!("data channel {internal_id} task started");

        loop {
            self.dispatch_events();
            if self.data_channel.state() == RTCDataChannelState::Closed {
                break;
            }

            let command = match self.data_channel.poll_timeout() {
                Some(deadline) => {
                    let timer = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                    tokio::pin!(timer);

                    tokio::select! {
                        command = self.rx.recv() => command,
                        _ = &mut timer => {
                            self.data_channel.handle_timeout(tokio::time::Instant::now().into_std());
                            continue;
                        }
                    }
                }
                None => self.rx.recv().await,
            };

            let Some(command) = command else {
                warn!("data channel {internal_id} lost all handles before it was closed");
                self.data_channel
                    .on_transport_closed(Some(Error::ErrDataChannelActorGone));
                self.dispatch_events();
                break;
            };
            self.handle_command(command);
        }

        if let Some(on_release) = self.on_release.take() {
            debug!(
                "data channel {internal_id} task ended, releasing sid {:?}",
                self.data_channel.sid()
            );
            on_release(internal_id, self.data_channel.sid());
        }
    }

    fn handle_command(&mut self, command: DataChannelCommand) {
        let dc = &mut self.data_channel;
        match command {
            DataChannelCommand::Send(message, reply) => {
                let result = dc.send(message);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(err) = result {
                            warn!("data channel {} dropped message: {}", dc.internal_id(), err);
                        }
                    }
                }
            }
            DataChannelCommand::Close => dc.close(),
            DataChannelCommand::RegisterObserver(observer) => {
                self.observer = Some(observer);
                dc.register_observer();
            }
            DataChannelCommand::UnregisterObserver => {
                self.observer = None;
                dc.unregister_observer();
            }
            DataChannelCommand::SetSctpSid(sid, reply) => {
                let _ = reply.send(dc.set_sctp_sid(sid));
            }
            DataChannelCommand::SetBufferedAmountLowThreshold(threshold) => {
                dc.set_buffered_amount_low_threshold(threshold)
            }
            DataChannelCommand::TransportRegistered => dc.on_transport_registered(),
            DataChannelCommand::TransportReady(writable) => dc.on_transport_ready(writable),
            DataChannelCommand::DataReceived(params, payload) => {
                dc.on_data_received(params, payload)
            }
            DataChannelCommand::ClosingProcedureStartedRemotely(sid) => {
                dc.on_closing_procedure_started_remotely(sid)
            }
            DataChannelCommand::ClosingProcedureComplete(sid) => {
                dc.on_closing_procedure_complete(sid)
            }
            DataChannelCommand::TransportClosed(err) => dc.on_transport_closed(err),
            DataChannelCommand::State(reply) => {
                let _ = reply.send(dc.state());
            }
            DataChannelCommand::Stats(reply) => {
                let _ = reply.send(dc.stats());
            }
            DataChannelCommand::Error(reply) => {
                let _ = reply.send(dc.error().cloned());
            }
        }
    }

    /// dispatch_events hands the queued events to the observer. Events are
    /// dropped while no observer is registered.
    fn dispatch_events(&mut self) {
        while let Some(event) = self.data_channel.poll_event() {
            match self.observer.as_mut() {
                Some(observer) => dispatch_event(observer.as_mut(), event),
                None => trace!(
                    "data channel {} has no observer for {:?}",
                    self.data_channel.internal_id(),
                    event
                ),
            }
        }
    }
}
