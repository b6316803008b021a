use std::collections::{HashMap, VecDeque};

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::util::status::Status;

/// Number of routing events kept for display.
/// An 8K monitor at 8px per line shows 540 lines.
pub const MAX_ROUTING_EVENTS: usize = 512;

/// Which way an HTLC flowed through the node
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDirection {
    /// We originated the payment
    Send,
    /// We are the final recipient
    Receive,
    /// We forwarded between two channels
    Forward,
}

/// Resolution state of an HTLC
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    /// In flight
    Active,
    /// Settled with the preimage
    Settled,
    /// Failed back by the downstream node
    ForwardFailed,
    /// Failed locally before reaching the downstream node
    LinkFailed,
}

/// The fields that identify one HTLC across partial observations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingEventKey {
    /// Incoming short channel id
    pub incoming_channel_id: u64,
    /// HTLC index on the incoming channel
    pub incoming_htlc_id: u64,
    /// Outgoing short channel id
    pub outgoing_channel_id: u64,
    /// HTLC index on the outgoing channel
    pub outgoing_htlc_id: u64,
}

/// One observation of an HTLC routed through the node.
///
/// The node reports an HTLC several times as it moves through its states. All
/// observations share a [`RoutingEventKey`], and later ones are folded into the
/// first with [`RoutingEvent::update`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RoutingEvent {
    /// Which way the HTLC flowed
    pub direction: RoutingDirection,
    /// Resolution state
    pub status: RoutingStatus,
    /// Incoming short channel id, zero for sends
    #[serde(default)]
    pub incoming_channel_id: u64,
    /// Outgoing short channel id, zero for receives
    #[serde(default)]
    pub outgoing_channel_id: u64,
    /// HTLC index on the incoming channel
    #[serde(default)]
    pub incoming_htlc_id: u64,
    /// HTLC index on the outgoing channel
    #[serde(default)]
    pub outgoing_htlc_id: u64,
    /// Absolute expiry of the incoming HTLC
    #[serde(default)]
    pub incoming_timelock: u32,
    /// Absolute expiry of the outgoing HTLC
    #[serde(default)]
    pub outgoing_timelock: u32,
    /// Amount of the incoming HTLC, in msat
    #[serde(default)]
    pub amount_in_msat: u64,
    /// Amount of the outgoing HTLC, in msat
    #[serde(default)]
    pub amount_out_msat: u64,
    /// Time of this observation, in seconds since the epoch
    #[serde(default)]
    pub last_update: u64,
    /// Wire failure code, for link failures
    #[serde(default)]
    pub failure_code: Option<i32>,
    /// Human readable failure detail, for link failures
    #[serde(default)]
    pub failure_detail: Option<String>,
}

impl RoutingEvent {
    /// The identity of the HTLC this event describes
    pub fn key(&self) -> RoutingEventKey {
        RoutingEventKey {
            incoming_channel_id: self.incoming_channel_id,
            incoming_htlc_id: self.incoming_htlc_id,
            outgoing_channel_id: self.outgoing_channel_id,
            outgoing_htlc_id: self.outgoing_htlc_id,
        }
    }

    /// Whether `other` is an observation of the same HTLC
    pub fn same_htlc(&self, other: &RoutingEvent) -> bool {
        self.key() == other.key()
    }

    /// Fold a newer observation of the same HTLC into this one.
    ///
    /// Status and time always advance. Failure details are taken on a link
    /// failure. Amounts and timelocks are only filled when still unknown, since
    /// settle and fail notifications don't repeat them.
    pub fn update(&mut self, newer: &RoutingEvent) {
        debug_assert!(self.same_htlc(newer));
        self.status = newer.status;
        self.last_update = newer.last_update;
        if newer.status == RoutingStatus::LinkFailed {
            self.failure_code = newer.failure_code;
            self.failure_detail = newer.failure_detail.clone();
        }
        if self.amount_in_msat == 0 {
            self.amount_in_msat = newer.amount_in_msat;
        }
        if self.amount_out_msat == 0 {
            self.amount_out_msat = newer.amount_out_msat;
        }
        if self.incoming_timelock == 0 {
            self.incoming_timelock = newer.incoming_timelock;
        }
        if self.outgoing_timelock == 0 {
            self.outgoing_timelock = newer.outgoing_timelock;
        }
    }

    /// Fee earned by a forward, in msat
    pub fn fee_msat(&self) -> u64 {
        match self.direction {
            RoutingDirection::Forward => self.amount_in_msat.saturating_sub(self.amount_out_msat),
            _ => 0,
        }
    }

    /// Check that the channels named match the direction
    pub fn validate(&self) -> Result<(), Status> {
        let ok = match self.direction {
            RoutingDirection::Send => self.outgoing_channel_id != 0,
            RoutingDirection::Receive => self.incoming_channel_id != 0,
            RoutingDirection::Forward =>
                self.incoming_channel_id != 0 && self.outgoing_channel_id != 0,
        };
        if ok {
            Ok(())
        } else {
            Err(Status::invalid_argument(format!(
                "{:?} event without its channels: {:?}",
                self.direction,
                self.key()
            )))
        }
    }
}

/// What [`RoutingLog::record`] did with an event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// Folded into the existing entry at this position
    Merged(usize),
    /// Appended at the end, after evicting the oldest entry if the log was full
    Appended(Option<RoutingEvent>),
}

/// Bounded history of routing events, oldest first.
///
/// Entries are unique by [`RoutingEventKey`]. A key index maps each key to the
/// sequence number of its entry, so matching an event is a lookup rather
/// than a scan.
#[derive(Clone, Debug, Default)]
pub struct RoutingLog {
    events: VecDeque<RoutingEvent>,
    index: HashMap<RoutingEventKey, u64>,
    // sequence number of events[0]
    front_seq: u64,
}

impl RoutingLog {
    /// An empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events held, never more than [`MAX_ROUTING_EVENTS`]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The event at `position`, zero being the oldest
    pub fn get(&self, position: usize) -> Option<&RoutingEvent> {
        self.events.get(position)
    }

    /// Events, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RoutingEvent> + ExactSizeIterator {
        self.events.iter()
    }

    /// Position of the entry for `key`, if present
    pub fn position(&self, key: &RoutingEventKey) -> Option<usize> {
        self.index.get(key).map(|seq| (seq - self.front_seq) as usize)
    }

    /// Record an observation.
    ///
    /// Malformed events are logged and dropped, returning `None`.
    pub fn record(&mut self, event: RoutingEvent) -> Option<Recorded> {
        if let Err(e) = event.validate() {
            error!("refresh_routing: invalid event data: {}", e);
            return None;
        }

        let key = event.key();
        if let Some(position) = self.position(&key) {
            self.events[position].update(&event);
            debug!("routing event {:?} now {:?}", key, event.status);
            return Some(Recorded::Merged(position));
        }

        let evicted =
            if self.events.len() == MAX_ROUTING_EVENTS { self.events.pop_front() } else { None };
        if let Some(oldest) = &evicted {
            self.index.remove(&oldest.key());
            self.front_seq += 1;
        }
        let seq = self.front_seq + self.events.len() as u64;
        self.index.insert(key, seq);
        self.events.push_back(event);
        Some(Recorded::Appended(evicted))
    }
}
