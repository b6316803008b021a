use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::channel::{Channel, ChannelPoint, ChannelStatus, RoutingPolicy};
use crate::client::{ListChannelsOptions, NodeClient};
use crate::context::RequestContext;
use crate::node::{NodeInfo, PeerNode};
use crate::routing::{RoutingDirection, RoutingEvent, RoutingStatus};
use crate::util::status::Status;
use crate::wallet::{ChannelsBalance, Transaction, WalletBalance};

/// Time reported by the mock for every detail fetch
pub const MOCK_LAST_UPDATE: u64 = 1_700_000_000;

/// A deterministic channel point derived from `n`
pub fn make_channel_point(n: u8) -> ChannelPoint {
    ChannelPoint::new(&hex::encode([n; 32]), n as u32).unwrap()
}

/// A channel as the channel list returns it: no detail, no peer node
pub fn make_channel(n: u8, updates_count: u64) -> Channel {
    let mut channel = Channel::new(make_channel_point(n), format!("02{}", hex::encode([n; 32])));
    channel.id = (800_000 << 40) | n as u64;
    channel.status = ChannelStatus::Active;
    channel.capacity = 1_000_000;
    channel.local_balance = 600_000;
    channel.remote_balance = 390_000;
    channel.updates_count = updates_count;
    channel
}

/// An in-flight forward whose identity is derived from `n`
pub fn make_forward(n: u64) -> RoutingEvent {
    RoutingEvent {
        direction: RoutingDirection::Forward,
        status: RoutingStatus::Active,
        incoming_channel_id: 700_000,
        outgoing_channel_id: 700_001,
        incoming_htlc_id: n,
        outgoing_htlc_id: n,
        incoming_timelock: 800_140,
        outgoing_timelock: 800_100,
        amount_in_msat: 1_001_000,
        amount_out_msat: 1_000_000,
        last_update: MOCK_LAST_UPDATE + n,
        failure_code: None,
        failure_detail: None,
    }
}

#[derive(Default)]
struct MockState {
    info: Option<NodeInfo>,
    wallet_balance: Option<WalletBalance>,
    channels_balance: Option<ChannelsBalance>,
    transactions: Option<Vec<Transaction>>,
    channels: Vec<Channel>,
    nodes: HashMap<String, PeerNode>,
    // fails every call when set
    failure: Option<Status>,
    list_channels_failure: Option<Status>,
    channel_info_failures: HashMap<ChannelPoint, Status>,
    info_calls: usize,
    list_channels_calls: usize,
    channel_info_calls: HashMap<ChannelPoint, usize>,
    node_calls: usize,
}

/// A scripted node client.
///
/// Returns whatever it was last given, and `NotFound` for anything it wasn't
/// given. Detail fetches set `last_update` to [`MOCK_LAST_UPDATE`] and a
/// default pair of policies.
pub struct MockNodeClient {
    state: Mutex<MockState>,
}

impl MockNodeClient {
    /// A client with nothing to return
    pub fn new() -> Self {
        MockNodeClient { state: Mutex::new(MockState::default()) }
    }

    /// Set the node info to return
    pub fn set_info(&self, info: NodeInfo) {
        self.state.lock().unwrap().info = Some(info);
    }

    /// Set the wallet balance to return
    pub fn set_wallet_balance(&self, balance: WalletBalance) {
        self.state.lock().unwrap().wallet_balance = Some(balance);
    }

    /// Set the channel balance totals to return
    pub fn set_channels_balance(&self, balance: ChannelsBalance) {
        self.state.lock().unwrap().channels_balance = Some(balance);
    }

    /// Set the transactions to return
    pub fn set_transactions(&self, transactions: Vec<Transaction>) {
        self.state.lock().unwrap().transactions = Some(transactions);
    }

    /// Set the channel list to return
    pub fn set_channels(&self, channels: Vec<Channel>) {
        self.state.lock().unwrap().channels = channels;
    }

    /// Make a peer node known to lookups
    pub fn set_node(&self, node: PeerNode) {
        self.state.lock().unwrap().nodes.insert(node.pubkey.clone(), node);
    }

    /// Fail every call with `status`
    pub fn fail_all(&self, status: Status) {
        self.state.lock().unwrap().failure = Some(status);
    }

    /// Fail only the channel list with `status`
    pub fn fail_list_channels(&self, status: Status) {
        self.state.lock().unwrap().list_channels_failure = Some(status);
    }

    /// Fail detail fetches for one channel with `status`
    pub fn fail_channel_info(&self, channel_point: ChannelPoint, status: Status) {
        self.state.lock().unwrap().channel_info_failures.insert(channel_point, status);
    }

    /// Number of node info fetches
    pub fn info_calls(&self) -> usize {
        self.state.lock().unwrap().info_calls
    }

    /// Number of channel list fetches
    pub fn list_channels_calls(&self) -> usize {
        self.state.lock().unwrap().list_channels_calls
    }

    /// Number of detail fetches for one channel
    pub fn channel_info_calls(&self, channel_point: &ChannelPoint) -> usize {
        self.state.lock().unwrap().channel_info_calls.get(channel_point).copied().unwrap_or(0)
    }

    /// Number of peer node lookups
    pub fn node_calls(&self) -> usize {
        self.state.lock().unwrap().node_calls
    }

    fn check(&self) -> Result<(), Status> {
        match &self.state.lock().unwrap().failure {
            Some(status) => Err(status.clone()),
            None => Ok(()),
        }
    }
}

fn found<T: Clone>(value: &Option<T>, what: &str) -> Result<T, Status> {
    value.clone().ok_or_else(|| Status::not_found(what))
}

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn get_info(&self, _ctx: &RequestContext) -> Result<NodeInfo, Status> {
        self.state.lock().unwrap().info_calls += 1;
        self.check()?;
        found(&self.state.lock().unwrap().info, "info")
    }

    async fn get_wallet_balance(&self, _ctx: &RequestContext) -> Result<WalletBalance, Status> {
        self.check()?;
        found(&self.state.lock().unwrap().wallet_balance, "wallet balance")
    }

    async fn get_channels_balance(&self, _ctx: &RequestContext) -> Result<ChannelsBalance, Status> {
        self.check()?;
        found(&self.state.lock().unwrap().channels_balance, "channels balance")
    }

    async fn get_transactions(&self, _ctx: &RequestContext) -> Result<Vec<Transaction>, Status> {
        self.check()?;
        found(&self.state.lock().unwrap().transactions, "transactions")
    }

    async fn list_channels(
        &self,
        _ctx: &RequestContext,
        options: ListChannelsOptions,
    ) -> Result<Vec<Channel>, Status> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.list_channels_calls += 1;
        if let Some(status) = &state.list_channels_failure {
            return Err(status.clone());
        }
        Ok(state
            .channels
            .iter()
            .filter(|c| options.include_pending || !c.status.is_pending())
            .cloned()
            .collect())
    }

    async fn get_channel_info(
        &self,
        _ctx: &RequestContext,
        channel: &mut Channel,
    ) -> Result<(), Status> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        *state.channel_info_calls.entry(channel.channel_point.clone()).or_insert(0) += 1;
        if let Some(status) = state.channel_info_failures.get(&channel.channel_point) {
            return Err(status.clone());
        }
        channel.last_update = Some(MOCK_LAST_UPDATE);
        channel.local_policy = Some(RoutingPolicy {
            time_lock_delta: 40,
            fee_base_msat: 1000,
            fee_rate_milli_msat: 1,
            ..Default::default()
        });
        channel.remote_policy = Some(RoutingPolicy { time_lock_delta: 144, ..Default::default() });
        Ok(())
    }

    async fn get_node(&self, _ctx: &RequestContext, pubkey: &str) -> Result<PeerNode, Status> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.node_calls += 1;
        state
            .nodes
            .get(pubkey)
            .cloned()
            .ok_or_else(|| Status::not_found(format!("unable to find node {}", pubkey)))
    }
}
