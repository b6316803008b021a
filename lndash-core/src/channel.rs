use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::client::NodeClient;
use crate::context::RequestContext;
use crate::node::PeerNode;
use crate::util::status::Status;

/// Reference to the funding output of a channel, `<txid>:<output index>`.
///
/// Stable for the whole life of the channel, so it keys the channel collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelPoint {
    txid: String,
    output_index: u32,
}

impl ChannelPoint {
    /// Create a channel point from a hex txid and an output index
    pub fn new(txid: &str, output_index: u32) -> Result<Self, Status> {
        let bytes = hex::decode(txid)
            .map_err(|e| Status::invalid_argument(format!("channel point txid {}: {}", txid, e)))?;
        if bytes.len() != 32 {
            return Err(Status::invalid_argument(format!(
                "channel point txid {}: expected 32 bytes, got {}",
                txid,
                bytes.len()
            )));
        }
        Ok(ChannelPoint { txid: txid.to_ascii_lowercase(), output_index })
    }

    /// The funding transaction id, lowercase hex
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// The funding output index
    pub fn output_index(&self) -> u32 {
        self.output_index
    }
}

impl fmt::Display for ChannelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.output_index)
    }
}

impl FromStr for ChannelPoint {
    type Err = Status;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .rsplit_once(':')
            .ok_or_else(|| Status::invalid_argument(format!("channel point {}: missing ':'", s)))?;
        let index = index
            .parse()
            .map_err(|e| Status::invalid_argument(format!("channel point {}: {}", s, e)))?;
        ChannelPoint::new(txid, index)
    }
}

impl TryFrom<String> for ChannelPoint {
    type Error = Status;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChannelPoint> for String {
    fn from(cp: ChannelPoint) -> Self {
        cp.to_string()
    }
}

/// Lifecycle state of a channel as reported by the node
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Open and usable
    Active,
    /// Open, but the peer is offline
    #[default]
    Inactive,
    /// Waiting for the funding transaction to confirm
    Opening,
    /// Cooperatively closing
    Closing,
    /// Force closing, waiting for timelocks to expire
    ForceClosing,
    /// Closing transaction broadcast, waiting for confirmation
    WaitingClose,
    /// Closed
    Closed,
}

impl ChannelStatus {
    /// Whether the channel is not open yet or not open anymore
    pub fn is_pending(&self) -> bool {
        !matches!(self, ChannelStatus::Active | ChannelStatus::Inactive)
    }
}

/// Forwarding policy one side of a channel advertises
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingPolicy {
    /// CLTV delta required for forwards over this channel
    pub time_lock_delta: u32,
    /// Smallest HTLC accepted, in msat
    pub min_htlc_msat: u64,
    /// Largest HTLC accepted, in msat
    pub max_htlc_msat: u64,
    /// Base fee, in msat
    pub fee_base_msat: u64,
    /// Proportional fee, in millionths
    pub fee_rate_milli_msat: u64,
    /// Whether forwarding is disabled
    pub disabled: bool,
}

/// A payment channel of the local node.
///
/// The summary fields come from the channel list. `last_update`, the policies
/// and `node` are detail filled in by enrichment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    /// Short channel id, zero while pending
    #[serde(default)]
    pub id: u64,
    /// The channel key
    pub channel_point: ChannelPoint,
    /// Lifecycle state
    #[serde(default)]
    pub status: ChannelStatus,
    /// The peer identity public key, hex encoded
    pub remote_pubkey: String,
    /// Total capacity, in satoshi
    #[serde(default)]
    pub capacity: i64,
    /// Our balance, in satoshi
    #[serde(default)]
    pub local_balance: i64,
    /// The peer's balance, in satoshi
    #[serde(default)]
    pub remote_balance: i64,
    /// Fee of the current commitment transaction, in satoshi
    #[serde(default)]
    pub commit_fee: i64,
    /// Value locked in pending HTLCs, in satoshi
    #[serde(default)]
    pub unsettled_balance: i64,
    /// Sent over the life of the channel, in satoshi
    #[serde(default)]
    pub total_amount_sent: i64,
    /// Received over the life of the channel, in satoshi
    #[serde(default)]
    pub total_amount_received: i64,
    /// Number of state updates, incremented by the remote on every change
    #[serde(default)]
    pub updates_count: u64,
    /// Number of pending HTLCs
    #[serde(default)]
    pub pending_htlcs: u32,
    /// CSV delay on our outputs, in blocks
    #[serde(default)]
    pub csv_delay: u32,
    /// Whether the channel is unannounced
    #[serde(default)]
    pub private: bool,
    /// Time of the last policy update seen in the graph, in seconds since the epoch
    #[serde(default)]
    pub last_update: Option<u64>,
    /// Our forwarding policy
    #[serde(default)]
    pub local_policy: Option<RoutingPolicy>,
    /// The peer's forwarding policy
    #[serde(default)]
    pub remote_policy: Option<RoutingPolicy>,
    /// Graph metadata about the peer
    #[serde(default)]
    pub node: Option<PeerNode>,
}

impl Channel {
    /// A channel with only its key and peer set
    pub fn new(channel_point: ChannelPoint, remote_pubkey: impl Into<String>) -> Self {
        Channel {
            id: 0,
            channel_point,
            status: ChannelStatus::default(),
            remote_pubkey: remote_pubkey.into(),
            capacity: 0,
            local_balance: 0,
            remote_balance: 0,
            commit_fee: 0,
            unsettled_balance: 0,
            total_amount_sent: 0,
            total_amount_received: 0,
            updates_count: 0,
            pending_htlcs: 0,
            csv_delay: 0,
            private: false,
            last_update: None,
            local_policy: None,
            remote_policy: None,
            node: None,
        }
    }

    /// Whether this stored channel is behind `fetched` and needs its detail refetched
    pub fn needs_detail(&self, fetched: &Channel) -> bool {
        self.updates_count < fetched.updates_count || self.last_update.is_none()
    }

    /// Fold a newer observation of the same channel into this one.
    ///
    /// Summary fields are taken from `newer`. Detail fields `newer` doesn't carry
    /// keep their known values. An observation with a lower updates counter is
    /// out of date: the stored summary is kept whole and it only fills detail
    /// still missing.
    pub fn merge(&mut self, mut newer: Channel) {
        debug_assert_eq!(self.channel_point, newer.channel_point);
        if newer.updates_count < self.updates_count {
            warn!(
                "channel {} updates count went backwards: {} < {}",
                self.channel_point, newer.updates_count, self.updates_count
            );
            self.last_update = self.last_update.or(newer.last_update);
            self.local_policy = self.local_policy.or(newer.local_policy);
            self.remote_policy = self.remote_policy.or(newer.remote_policy);
            if self.node.is_none() {
                self.node = newer.node.take();
            }
            return;
        }
        let last_update = newer.last_update.or(self.last_update);
        let local_policy = newer.local_policy.or(self.local_policy);
        let remote_policy = newer.remote_policy.or(self.remote_policy);
        let node = newer.node.take().or_else(|| self.node.take());
        *self = Channel { last_update, local_policy, remote_policy, node, ..newer };
    }
}

/// Insertion-ordered collection of channels, keyed by channel point
#[derive(Clone, Debug, Default)]
pub struct Channels {
    list: Vec<Channel>,
    index: HashMap<ChannelPoint, usize>,
}

impl Channels {
    /// An empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known channels
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether no channel is known
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Whether a channel with this channel point is known
    pub fn contains(&self, channel_point: &ChannelPoint) -> bool {
        self.index.contains_key(channel_point)
    }

    /// Look up a channel by channel point
    pub fn get(&self, channel_point: &ChannelPoint) -> Option<&Channel> {
        self.index.get(channel_point).map(|&pos| &self.list[pos])
    }

    /// Channels in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.list.iter()
    }

    /// Channels in first-seen order
    pub fn list(&self) -> &[Channel] {
        &self.list
    }

    /// Insert a channel seen for the first time.
    /// Returns false, leaving the collection unchanged, if it is already known.
    pub fn add(&mut self, channel: Channel) -> bool {
        if self.contains(&channel.channel_point) {
            return false;
        }
        self.index.insert(channel.channel_point.clone(), self.list.len());
        self.list.push(channel);
        true
    }

    /// Insert or update a channel in place
    pub fn update(&mut self, channel: Channel) {
        match self.index.get(&channel.channel_point) {
            Some(&pos) => self.list[pos].merge(channel),
            None => {
                self.add(channel);
            }
        }
    }
}

/// Merge a freshly fetched channel list into `channels`.
///
/// Channels are handled one at a time in the order received. Each lookup and
/// each upsert holds the collection lock only for that step, never across a
/// remote call. A failed detail fetch aborts the rest of the pass; a failed
/// peer lookup is only logged.
pub(crate) async fn reconcile(
    channels: &Mutex<Channels>,
    client: &dyn NodeClient,
    ctx: &RequestContext,
    fetched: Vec<Channel>,
) -> Result<(), Status> {
    for mut channel in fetched {
        let stale = {
            let mut channels = channels.lock().unwrap();
            if !channels.contains(&channel.channel_point) {
                debug!("new channel {}", channel.channel_point);
                channels.add(channel.clone());
            }
            channels.get(&channel.channel_point).map_or(true, |stored| stored.needs_detail(&channel))
        };

        if stale {
            debug!(
                "channel {} is stale at update {}, fetching detail",
                channel.channel_point, channel.updates_count
            );
            ctx.run(client.get_channel_info(ctx, &mut channel)).await?;

            if channel.node.is_none() {
                match ctx.run(client.get_node(ctx, &channel.remote_pubkey)).await {
                    Ok(node) => channel.node = Some(node),
                    Err(e) => debug!(
                        "refresh_channels: cannot find node {}: {}",
                        channel.remote_pubkey, e
                    ),
                }
            }
        }

        channels.lock().unwrap().update(channel);
    }
    Ok(())
}
