#[cfg(test)]
mod sid_allocator_test;

use log::{debug, warn};
use shared::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;

/// Identifier of an SCTP stream carrying one data channel.
pub type SctpSid = u16;

/// Largest stream id handed out to data channels.
pub const MAX_SCTP_SID: SctpSid = 1023;

/// DTLSRole decides which half of the stream id space a peer allocates from.
///
/// The DTLS client picks even ids and the DTLS server picks odd ids, so both
/// peers can open channels concurrently without colliding.
/// <https://www.rfc-editor.org/rfc/rfc8832#section-6>
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DTLSRole {
    #[default]
    Client,
    Server,
}

impl fmt::Display for DTLSRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DTLSRole::Client => write!(f, "client"),
            DTLSRole::Server => write!(f, "server"),
        }
    }
}

/// SctpSidAllocator tracks the stream ids used by data channels of one
/// association. It is owned by the data channel manager and is not
/// synchronized.
#[derive(Default, Debug, Clone)]
pub struct SctpSidAllocator {
    used_sids: HashSet<SctpSid>,
}

impl SctpSidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// allocate returns the lowest free id matching the parity of `role`.
    pub fn allocate(&mut self, role: DTLSRole) -> Result<SctpSid> {
        let mut sid: SctpSid = if role == DTLSRole::Client { 0 } else { 1 };
        while sid <= MAX_SCTP_SID {
            if self.used_sids.insert(sid) {
                debug!("allocated sctp sid {sid} for {role}");
                return Ok(sid);
            }
            sid += 2;
        }

        warn!("sctp sid space exhausted for {role}");
        Err(Error::ErrMaxDataChannelID)
    }

    /// reserve marks a caller-chosen id as used, e.g. for a negotiated channel.
    pub fn reserve(&mut self, sid: SctpSid) -> bool {
        if sid > MAX_SCTP_SID {
            return false;
        }
        self.used_sids.insert(sid)
    }

    /// release returns `sid` to the pool. Releasing a free id is a no-op.
    pub fn release(&mut self, sid: SctpSid) {
        if self.used_sids.remove(&sid) {
            debug!("released sctp sid {sid}");
        }
    }

    /// is_sid_available reports whether `sid` is in range and not in use.
    pub fn is_sid_available(&self, sid: SctpSid) -> bool {
        sid <= MAX_SCTP_SID && !self.used_sids.contains(&sid)
    }
}
