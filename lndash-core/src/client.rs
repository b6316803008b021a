use async_trait::async_trait;

use crate::channel::Channel;
use crate::context::RequestContext;
use crate::node::{NodeInfo, PeerNode};
use crate::util::status::Status;
use crate::wallet::{ChannelsBalance, Transaction, WalletBalance};

/// Options for [`NodeClient::list_channels`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListChannelsOptions {
    /// Also return channels that are opening or closing
    pub include_pending: bool,
}

impl ListChannelsOptions {
    /// Open and pending channels
    pub fn with_pending() -> Self {
        ListChannelsOptions { include_pending: true }
    }
}

/// Access to the remote node.
///
/// Each call returns one fresh snapshot. Implementations own the transport and
/// its wire format; they may use the context to abort early but don't have to,
/// since the store already races every call against it. No call is retried by
/// the caller.
#[async_trait]
pub trait NodeClient: Sync + Send {
    /// Node identity, sync state and version
    async fn get_info(&self, ctx: &RequestContext) -> Result<NodeInfo, Status>;

    /// On-chain wallet balance
    async fn get_wallet_balance(&self, ctx: &RequestContext) -> Result<WalletBalance, Status>;

    /// Channel balance totals
    async fn get_channels_balance(&self, ctx: &RequestContext) -> Result<ChannelsBalance, Status>;

    /// On-chain wallet transactions
    async fn get_transactions(&self, ctx: &RequestContext) -> Result<Vec<Transaction>, Status>;

    /// The current channel list, without detail
    async fn list_channels(
        &self,
        ctx: &RequestContext,
        options: ListChannelsOptions,
    ) -> Result<Vec<Channel>, Status>;

    /// Fill the detail fields of `channel` in place: `last_update`, the
    /// routing policies and possibly `node`
    async fn get_channel_info(
        &self,
        ctx: &RequestContext,
        channel: &mut Channel,
    ) -> Result<(), Status>;

    /// Graph metadata about the node with this pubkey
    async fn get_node(&self, ctx: &RequestContext, pubkey: &str) -> Result<PeerNode, Status>;
}
