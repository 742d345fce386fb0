#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod actor;
pub mod data_channel;
pub mod message;
pub mod queue;
pub mod sid_allocator;

pub use actor::observer::DataChannelObserver;
pub use actor::DataChannelHandle;
pub use data_channel::config::{DataChannelConfig, RTCDataChannelInit};
pub use data_channel::message::RTCDataChannelMessage;
pub use data_channel::state::RTCDataChannelState;
pub use data_channel::transport::DataChannelTransport;
pub use data_channel::{DataChannel, InternalIdGenerator};
pub use sid_allocator::{DTLSRole, SctpSid, SctpSidAllocator};
