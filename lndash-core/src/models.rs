use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error};
use tokio::sync::Mutex as AsyncMutex;

use crate::channel::{reconcile, Channels};
use crate::client::{ListChannelsOptions, NodeClient};
use crate::context::RequestContext;
use crate::node::NodeInfo;
use crate::routing::{Recorded, RoutingEvent, RoutingLog};
use crate::util::status::Status;
use crate::wallet::{ChannelsBalance, Transaction, WalletBalance};

/// A sub-model replaced wholesale on every successful refresh.
///
/// Readers get an `Arc` to the current value, so a replacement never shows
/// them a half-written value.
pub struct Snapshot<T> {
    value: Mutex<Option<Arc<T>>>,
}

impl<T> Snapshot<T> {
    fn new() -> Self {
        Snapshot { value: Mutex::new(None) }
    }

    /// The last value fetched, `None` before the first successful refresh
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.lock().unwrap().clone()
    }

    fn replace(&self, value: T) {
        *self.value.lock().unwrap() = Some(Arc::new(value));
    }
}

/// The dashboard view-model.
///
/// Holds the single copy of every sub-model and one refresh operation for
/// each. Refreshes are independent: each touches one sub-model, may run
/// concurrently with the others, and fails on its own. Construct once and share
/// as `Arc<Models>` between the driver and the renderer.
pub struct Models {
    client: Arc<dyn NodeClient>,
    info: Snapshot<NodeInfo>,
    wallet_balance: Snapshot<WalletBalance>,
    channels_balance: Snapshot<ChannelsBalance>,
    transactions: Snapshot<Vec<Transaction>>,
    channels: Mutex<Channels>,
    // serializes reconciliation passes
    channels_refresh: AsyncMutex<()>,
    routing_log: Mutex<RoutingLog>,
}

impl Models {
    /// Create empty models backed by `client`
    pub fn new(client: Arc<dyn NodeClient>) -> Self {
        Models {
            client,
            info: Snapshot::new(),
            wallet_balance: Snapshot::new(),
            channels_balance: Snapshot::new(),
            transactions: Snapshot::new(),
            channels: Mutex::new(Channels::new()),
            channels_refresh: AsyncMutex::new(()),
            routing_log: Mutex::new(RoutingLog::new()),
        }
    }

    /// Node info, `None` until the first successful refresh
    pub fn info(&self) -> Option<Arc<NodeInfo>> {
        self.info.get()
    }

    /// Wallet balance, `None` until the first successful refresh
    pub fn wallet_balance(&self) -> Option<Arc<WalletBalance>> {
        self.wallet_balance.get()
    }

    /// Channel balance totals, `None` until the first successful refresh
    pub fn channels_balance(&self) -> Option<Arc<ChannelsBalance>> {
        self.channels_balance.get()
    }

    /// On-chain transactions, `None` until the first successful refresh
    pub fn transactions(&self) -> Option<Arc<Vec<Transaction>>> {
        self.transactions.get()
    }

    /// The channel collection. Hold the guard only while rendering.
    pub fn channels(&self) -> MutexGuard<Channels> {
        self.channels.lock().unwrap()
    }

    /// The routing event log. Hold the guard only while rendering.
    pub fn routing_log(&self) -> MutexGuard<RoutingLog> {
        self.routing_log.lock().unwrap()
    }

    /// Replace the node info with a fresh fetch.
    /// On error the previous value is kept.
    pub async fn refresh_info(&self, ctx: &RequestContext) -> Result<(), Status> {
        let info = ctx.run(self.client.get_info(ctx)).await?;
        debug!("refresh_info: height {} synced {}", info.block_height, info.is_synced());
        self.info.replace(info);
        Ok(())
    }

    /// Replace the wallet balance with a fresh fetch.
    /// On error the previous value is kept.
    pub async fn refresh_wallet_balance(&self, ctx: &RequestContext) -> Result<(), Status> {
        let balance = ctx.run(self.client.get_wallet_balance(ctx)).await?;
        self.wallet_balance.replace(balance);
        Ok(())
    }

    /// Replace the channel balance totals with a fresh fetch.
    /// On error the previous value is kept.
    pub async fn refresh_channels_balance(&self, ctx: &RequestContext) -> Result<(), Status> {
        let balance = ctx.run(self.client.get_channels_balance(ctx)).await?;
        self.channels_balance.replace(balance);
        Ok(())
    }

    /// Replace the transaction list with a fresh fetch.
    /// On error the previous value is kept.
    pub async fn refresh_transactions(&self, ctx: &RequestContext) -> Result<(), Status> {
        let transactions = ctx.run(self.client.get_transactions(ctx)).await?;
        debug!("refresh_transactions: {} transactions", transactions.len());
        self.transactions.replace(transactions);
        Ok(())
    }

    /// Fetch the channel list, including pending channels, and merge it into
    /// the collection, fetching detail for the channels that changed.
    ///
    /// A failure to list aborts with the collection untouched. A failure to
    /// fetch detail aborts the pass at that channel, keeping the channels
    /// merged before it.
    pub async fn refresh_channels(&self, ctx: &RequestContext) -> Result<(), Status> {
        let _pass = self.channels_refresh.lock().await;
        let fetched =
            ctx.run(self.client.list_channels(ctx, ListChannelsOptions::with_pending())).await?;
        debug!("refresh_channels: {} channels", fetched.len());
        reconcile(&self.channels, self.client.as_ref(), ctx, fetched).await
    }

    /// Record one observed routing event.
    ///
    /// Never fails: a malformed event is logged and dropped.
    pub fn refresh_routing(&self, event: RoutingEvent) {
        let recorded = self.routing_log.lock().unwrap().record(event);
        if let Some(Recorded::Appended(Some(evicted))) = recorded {
            debug!("routing log full, evicted {:?}", evicted.key());
        }
    }

    /// Record a routing event received as untyped JSON from an event stream.
    ///
    /// Never fails: input that doesn't decode as a routing event is logged
    /// and dropped.
    pub fn record_routing_event(&self, value: serde_json::Value) {
        match serde_json::from_value::<RoutingEvent>(value) {
            Ok(event) => self.refresh_routing(event),
            Err(e) => error!("refresh_routing: invalid event data: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::mocks::{make_channel, make_channel_point, make_forward, MockNodeClient};
    use crate::util::status::Code;
    use serde_json::json;
    use test_log::test;

    fn make_models() -> (Arc<MockNodeClient>, Models) {
        let client = Arc::new(MockNodeClient::new());
        let models = Models::new(client.clone());
        (client, models)
    }

    fn make_ctx() -> (triggered::Trigger, RequestContext) {
        let (trigger, listener) = triggered::trigger();
        (trigger, RequestContext::new(listener))
    }

    #[test(tokio::test)]
    async fn refresh_info_replaces_test() {
        let (client, models) = make_models();
        let (_trigger, ctx) = make_ctx();
        assert!(models.info().is_none());

        client.set_info(NodeInfo { alias: "first".to_string(), ..Default::default() });
        models.refresh_info(&ctx).await.unwrap();
        assert_eq!(models.info().unwrap().alias, "first");

        client.set_info(NodeInfo { alias: "second".to_string(), ..Default::default() });
        models.refresh_info(&ctx).await.unwrap();
        assert_eq!(models.info().unwrap().alias, "second");
    }

    #[test(tokio::test)]
    async fn refresh_info_failure_keeps_value_test() {
        let (client, models) = make_models();
        let (_trigger, ctx) = make_ctx();
        client.set_info(NodeInfo {
            alias: "known".to_string(),
            block_height: 800_000,
            ..Default::default()
        });
        models.refresh_info(&ctx).await.unwrap();
        let before = models.info().unwrap();

        client.fail_all(Status::unavailable("connection refused"));
        let err = models.refresh_info(&ctx).await.unwrap_err();
        assert_eq!(err, Status::unavailable("connection refused"));
        assert_eq!(models.info().unwrap(), before);
        assert!(Arc::ptr_eq(&models.info().unwrap(), &before));
    }

    #[test(tokio::test)]
    async fn balances_failure_keeps_value_test() {
        let (client, models) = make_models();
        let (_trigger, ctx) = make_ctx();
        client.set_wallet_balance(WalletBalance {
            total_balance: 10,
            confirmed_balance: 10,
            unconfirmed_balance: 0,
        });
        client.set_channels_balance(ChannelsBalance { balance: 5, pending_open_balance: 1 });
        client.set_transactions(vec![Transaction {
            tx_hash: "aa".to_string(),
            amount: 10,
            ..Default::default()
        }]);
        models.refresh_wallet_balance(&ctx).await.unwrap();
        models.refresh_channels_balance(&ctx).await.unwrap();
        models.refresh_transactions(&ctx).await.unwrap();

        client.fail_all(Status::internal("boom"));
        assert!(models.refresh_wallet_balance(&ctx).await.is_err());
        assert!(models.refresh_channels_balance(&ctx).await.is_err());
        assert!(models.refresh_transactions(&ctx).await.is_err());

        assert_eq!(models.wallet_balance().unwrap().total_balance, 10);
        assert_eq!(
            *models.channels_balance().unwrap(),
            ChannelsBalance { balance: 5, pending_open_balance: 1 }
        );
        assert_eq!(models.transactions().unwrap().len(), 1);
    }

    #[test(tokio::test)]
    async fn refresh_cancelled_test() {
        let (client, models) = make_models();
        let (trigger, ctx) = make_ctx();
        client.set_info(NodeInfo::default());
        trigger.trigger();
        let err = models.refresh_info(&ctx).await.unwrap_err();
        assert_eq!(err.code(), Code::Cancelled);
        assert!(models.info().is_none());
        assert_eq!(client.info_calls(), 0);
    }

    #[test(tokio::test)]
    async fn refresh_channels_list_failure_test() {
        let (client, models) = make_models();
        let (_trigger, ctx) = make_ctx();
        client.set_channels(vec![make_channel(1, 1)]);
        models.refresh_channels(&ctx).await.unwrap();

        client.fail_list_channels(Status::unavailable("down"));
        assert!(models.refresh_channels(&ctx).await.is_err());
        assert_eq!(models.channels().len(), 1);
    }

    #[test(tokio::test)]
    async fn refresh_channels_enrichment_test() {
        let (client, models) = make_models();
        let (_trigger, ctx) = make_ctx();

        client.set_channels(vec![make_channel(1, 5)]);
        models.refresh_channels(&ctx).await.unwrap();
        assert_eq!(client.channel_info_calls(&make_channel_point(1)), 1);

        // the remote reports no change
        models.refresh_channels(&ctx).await.unwrap();
        assert_eq!(client.channel_info_calls(&make_channel_point(1)), 1);

        client.set_channels(vec![make_channel(1, 6)]);
        models.refresh_channels(&ctx).await.unwrap();
        assert_eq!(client.channel_info_calls(&make_channel_point(1)), 2);
        assert_eq!(models.channels().get(&make_channel_point(1)).unwrap().updates_count, 6);
    }

    #[test]
    fn refresh_routing_test() {
        let (_client, models) = make_models();
        models.refresh_routing(make_forward(1));
        models.refresh_routing(make_forward(2));
        models.refresh_routing(make_forward(1));
        assert_eq!(models.routing_log().len(), 2);
    }

    #[test]
    fn record_routing_event_boundary_test() {
        let (_client, models) = make_models();
        models.record_routing_event(json!({
            "direction": "receive",
            "status": "settled",
            "incoming_channel_id": 42,
            "incoming_htlc_id": 1,
            "amount_in_msat": 5000
        }));
        assert_eq!(models.routing_log().len(), 1);

        models.record_routing_event(json!("not an event"));
        models.record_routing_event(json!({ "direction": "sideways", "status": "active" }));
        models.record_routing_event(json!({ "direction": "forward", "status": "active" }));
        assert_eq!(models.routing_log().len(), 1);
    }
}
