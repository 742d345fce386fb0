use super::*;
use crate::data_channel::config::{DataChannelConfig, RTCDataChannelInit};
use crate::data_channel::transport::{DataMessageType, SendDataParams};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct Record {
    sent: Vec<(SctpSid, SendDataParams, Bytes)>,
    removed_streams: Vec<SctpSid>,
}

#[derive(Clone, Default)]
struct SharedTransport {
    record: Arc<Mutex<Record>>,
}

impl DataChannelTransport for SharedTransport {
    fn send_data(&mut self, sid: SctpSid, params: &SendDataParams, payload: &Bytes) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        record.sent.push((sid, *params, payload.clone()));
        Ok(())
    }

    fn connect_data_channel(&mut self, _internal_id: u64) -> bool {
        true
    }

    fn disconnect_data_channel(&mut self, _internal_id: u64) {}

    fn add_sctp_data_stream(&mut self, _sid: SctpSid) {}

    fn remove_sctp_data_stream(&mut self, sid: SctpSid) {
        let mut record = self.record.lock().unwrap();
        record.removed_streams.push(sid);
    }

    fn ready_to_send_data(&self) -> bool {
        true
    }
}

#[derive(Debug, PartialEq)]
enum Observed {
    State(RTCDataChannelState),
    Message(RTCDataChannelMessage),
    BufferedAmountChange(usize),
    BufferedAmountLow,
}

struct ForwardingObserver {
    tx: mpsc::UnboundedSender<Observed>,
}

impl DataChannelObserver for ForwardingObserver {
    fn on_state_change(&mut self, state: RTCDataChannelState) {
        let _ = self.tx.send(Observed::State(state));
    }

    fn on_message(&mut self, message: RTCDataChannelMessage) {
        let _ = self.tx.send(Observed::Message(message));
    }

    fn on_buffered_amount_change(&mut self, sent_data_size: usize) {
        let _ = self.tx.send(Observed::BufferedAmountChange(sent_data_size));
    }

    fn on_buffered_amount_low(&mut self) {
        let _ = self.tx.send(Observed::BufferedAmountLow);
    }
}

/// EchoObserver sends every message back through the handle from inside the
/// callback.
struct EchoObserver {
    handle: DataChannelHandle,
}

impl DataChannelObserver for EchoObserver {
    fn on_state_change(&mut self, _state: RTCDataChannelState) {}

    fn on_message(&mut self, message: RTCDataChannelMessage) {
        let _ = self.handle.post_send(message);
    }
}

fn observer() -> (ForwardingObserver, UnboundedReceiver<Observed>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ForwardingObserver { tx }, rx)
}

fn release_recorder() -> (ReleaseFn, Arc<Mutex<Vec<(u64, Option<SctpSid>)>>>) {
    let released = Arc::new(Mutex::new(vec![]));
    let recorder = Arc::clone(&released);
    let on_release: ReleaseFn = Box::new(move |internal_id: u64, sid: Option<SctpSid>| {
        recorder.lock().unwrap().push((internal_id, sid));
    });
    (on_release, released)
}

fn spawn_negotiated(
    sid: SctpSid,
    transport: SharedTransport,
) -> Result<(DataChannelHandle, JoinHandle<()>, Arc<Mutex<Vec<(u64, Option<SctpSid>)>>>)> {
    let config = DataChannelConfig::new(
        "actor",
        RTCDataChannelInit {
            negotiated: true,
            id: Some(sid),
            ..Default::default()
        },
    );
    let data_channel = DataChannel::new(3, config, transport)?;
    let (on_release, released) = release_recorder();
    let (handle, join_handle) = DataChannelHandle::spawn(data_channel, on_release);
    Ok((handle, join_handle, released))
}

#[tokio::test]
async fn test_actor_send_and_receive() -> Result<()> {
    env_logger::builder().is_test(true).try_init().ok();

    let transport = SharedTransport::default();
    let (handle, _join_handle, _released) = spawn_negotiated(4, transport.clone())?;
    assert_eq!(handle.internal_id(), 3);
    assert_eq!(handle.label(), "actor");

    let (observer, mut events) = observer();
    handle.register_observer(observer)?;

    handle.send_text("ping").await?;
    assert_eq!(events.recv().await, Some(Observed::BufferedAmountChange(4)));

    handle.on_data_received(
        ReceiveDataParams {
            sid: 4,
            data_message_type: DataMessageType::Text,
        },
        Bytes::from_static(b"pong"),
    )?;
    assert_eq!(
        events.recv().await,
        Some(Observed::Message(RTCDataChannelMessage::text("pong")))
    );

    assert_eq!(handle.state().await?, RTCDataChannelState::Open);
    let stats = handle.stats().await?;
    assert_eq!(stats.messages_sent, 1);
    assert_eq!(stats.messages_received, 1);

    let sent = transport.record.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0].2[..], b"ping");

    Ok(())
}

#[tokio::test]
async fn test_actor_send_errors_are_returned() -> Result<()> {
    let config = DataChannelConfig::new("pending", RTCDataChannelInit::default());
    let data_channel = DataChannel::new(5, config, SharedTransport::default())?;
    let (on_release, _released) = release_recorder();
    let (handle, _join_handle) = DataChannelHandle::spawn(data_channel, on_release);

    let result = handle.send_text("too early").await;
    assert_eq!(result, Err(Error::ErrDataChannelNotOpen));
    assert_eq!(handle.state().await?, RTCDataChannelState::Connecting);

    handle.set_sctp_sid(0).await?;
    assert_eq!(handle.state().await?, RTCDataChannelState::Open);
    assert_eq!(
        handle.set_sctp_sid(2).await,
        Err(Error::ErrSctpSidAlreadySet)
    );

    Ok(())
}

#[tokio::test]
async fn test_actor_close_releases_sid_once() -> Result<()> {
    let transport = SharedTransport::default();
    let (handle, join_handle, released) = spawn_negotiated(6, transport.clone())?;

    let (observer, mut events) = observer();
    handle.register_observer(observer)?;

    handle.close()?;
    handle.close()?;
    assert_eq!(
        events.recv().await,
        Some(Observed::State(RTCDataChannelState::Closing))
    );
    assert_eq!(transport.record.lock().unwrap().removed_streams, vec![6]);

    handle.on_closing_procedure_complete(6)?;
    assert_eq!(
        events.recv().await,
        Some(Observed::State(RTCDataChannelState::Closed))
    );

    join_handle.await.unwrap();
    assert_eq!(*released.lock().unwrap(), vec![(3, Some(6))]);

    assert!(handle.is_closed());
    assert_eq!(handle.close(), Err(Error::ErrDataChannelActorGone));
    assert_eq!(
        handle.state().await,
        Err(Error::ErrDataChannelActorGone)
    );

    Ok(())
}

#[tokio::test]
async fn test_actor_reentrant_observer() -> Result<()> {
    let transport = SharedTransport::default();
    let (handle, _join_handle, _released) = spawn_negotiated(8, transport.clone())?;

    handle.register_observer(EchoObserver {
        handle: handle.clone(),
    })?;
    handle.on_data_received(
        ReceiveDataParams {
            sid: 8,
            data_message_type: DataMessageType::Binary,
        },
        Bytes::from_static(b"echo"),
    )?;

    // The echo is queued while the message is delivered, so it is handled
    // before a query posted after the first reply.
    handle.stats().await?;
    let stats = handle.stats().await?;
    assert_eq!(stats.messages_received, 1);
    assert_eq!(stats.messages_sent, 1);

    let sent = transport.record.lock().unwrap().sent.clone();
    assert_eq!(&sent[0].2[..], b"echo");

    Ok(())
}

#[tokio::test]
async fn test_actor_handshake_timeout() -> Result<()> {
    let config = DataChannelConfig::new(
        "timed",
        RTCDataChannelInit {
            id: Some(0),
            ..Default::default()
        },
    )
    .with_handshake_timeout(Duration::from_millis(20));
    let data_channel = DataChannel::new(9, config, SharedTransport::default())?;
    let (on_release, released) = release_recorder();
    let (handle, join_handle) = DataChannelHandle::spawn(data_channel, on_release);

    let (observer, mut events) = observer();
    handle.register_observer(observer)?;

    assert_eq!(
        events.recv().await,
        Some(Observed::State(RTCDataChannelState::Closing))
    );
    assert_eq!(
        events.recv().await,
        Some(Observed::State(RTCDataChannelState::Closed))
    );

    join_handle.await.unwrap();
    assert_eq!(*released.lock().unwrap(), vec![(9, Some(0))]);

    Ok(())
}

#[tokio::test]
async fn test_actor_exits_when_handles_dropped() -> Result<()> {
    let (handle, join_handle, released) = spawn_negotiated(10, SharedTransport::default())?;

    drop(handle);

    join_handle.await.unwrap();
    assert_eq!(*released.lock().unwrap(), vec![(3, Some(10))]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_actor_handshake_timeout_with_paused_clock() -> Result<()> {
    let config = DataChannelConfig::new(
        "paused",
        RTCDataChannelInit {
            id: Some(2),
            ..Default::default()
        },
    )
    .with_handshake_timeout(Duration::from_secs(30));
    let data_channel = DataChannel::new(11, config, SharedTransport::default())?;
    let (on_release, released) = release_recorder();
    let (handle, join_handle) = DataChannelHandle::spawn(data_channel, on_release);

    let wall_clock = std::time::Instant::now();
    join_handle.await.unwrap();
    assert!(wall_clock.elapsed() < Duration::from_secs(5));

    assert_eq!(*released.lock().unwrap(), vec![(11, Some(2))]);
    assert!(handle.is_closed());

    Ok(())
}

#[tokio::test]
async fn test_actor_close_without_sid_releases() -> Result<()> {
    let config = DataChannelConfig::new("unbound", RTCDataChannelInit::default());
    let data_channel = DataChannel::new(12, config, SharedTransport::default())?;
    let (on_release, released) = release_recorder();
    let (handle, join_handle) = DataChannelHandle::spawn(data_channel, on_release);

    handle.close()?;

    join_handle.await.unwrap();
    assert_eq!(*released.lock().unwrap(), vec![(12, None)]);

    Ok(())
}
