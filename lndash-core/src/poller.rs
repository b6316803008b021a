use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use triggered::Listener;

use crate::context::RequestContext;
use crate::models::Models;
use crate::util::status::Status;

/// How often each group of sub-models is refreshed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollIntervals {
    /// Node info
    pub info: Duration,
    /// Wallet and channel balance totals
    pub balances: Duration,
    /// Channel list
    pub channels: Duration,
    /// On-chain transactions
    pub transactions: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        PollIntervals {
            info: Duration::from_secs(10),
            balances: Duration::from_secs(10),
            channels: Duration::from_secs(5),
            transactions: Duration::from_secs(30),
        }
    }
}

/// Drives the refresh operations of [`Models`] on fixed intervals.
///
/// A failed refresh is logged and tried again on its next tick. Shutdown
/// stops the loop and cancels whatever refresh is in flight.
pub struct Poller {
    models: Arc<Models>,
    intervals: PollIntervals,
    request_timeout: Option<Duration>,
    shutdown_signal: Listener,
}

impl Poller {
    /// Create a poller for `models`
    pub fn new(
        models: Arc<Models>,
        intervals: PollIntervals,
        request_timeout: Option<Duration>,
        shutdown_signal: Listener,
    ) -> Self {
        Poller { models, intervals, request_timeout, shutdown_signal }
    }

    /// Start the polling task
    pub fn start(self) -> JoinHandle<()> {
        let handle = tokio::spawn(async move {
            self.run().await;
        });
        info!("poller started");
        handle
    }

    fn context(&self) -> RequestContext {
        let ctx = RequestContext::new(self.shutdown_signal.clone());
        match self.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    async fn run(self) {
        let mut info = interval(self.intervals.info);
        let mut balances = interval(self.intervals.balances);
        let mut channels = interval(self.intervals.channels);
        let mut transactions = interval(self.intervals.transactions);
        let ctx = self.context();
        loop {
            let shutdown_signal = self.shutdown_signal.clone();
            tokio::select! {
                _ = info.tick() => log_failure("info", self.models.refresh_info(&ctx).await),
                _ = balances.tick() => {
                    log_failure("wallet balance", self.models.refresh_wallet_balance(&ctx).await);
                    log_failure("channels balance", self.models.refresh_channels_balance(&ctx).await);
                }
                _ = channels.tick() => log_failure("channels", self.models.refresh_channels(&ctx).await),
                _ = transactions.tick() =>
                    log_failure("transactions", self.models.refresh_transactions(&ctx).await),
                _ = shutdown_signal => break,
            }
        }
        info!("poller stopped");
    }
}

fn interval(period: Duration) -> Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn log_failure(what: &str, result: Result<(), Status>) {
    if let Err(e) = result {
        warn!("refresh {} failed: {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeInfo;
    use crate::util::mocks::{make_channel, MockNodeClient};
    use crate::wallet::{ChannelsBalance, WalletBalance};
    use test_log::test;

    #[test(tokio::test(start_paused = true))]
    async fn poll_until_shutdown_test() {
        let client = Arc::new(MockNodeClient::new());
        client.set_info(NodeInfo { alias: "polled".to_string(), ..Default::default() });
        client.set_wallet_balance(WalletBalance::default());
        client.set_channels_balance(ChannelsBalance::default());
        client.set_channels(vec![make_channel(1, 1)]);
        // transactions are left unset, so that refresh keeps failing
        let models = Arc::new(Models::new(client.clone()));

        let (trigger, listener) = triggered::trigger();
        let poller = Poller::new(
            models.clone(),
            PollIntervals::default(),
            Some(Duration::from_secs(1)),
            listener,
        );
        let handle = poller.start();

        time::sleep(Duration::from_secs(21)).await;
        assert_eq!(models.info().unwrap().alias, "polled");
        assert!(models.wallet_balance().is_some());
        assert_eq!(models.channels().len(), 1);
        assert!(models.transactions().is_none());
        assert!(client.info_calls() >= 3);

        trigger.trigger();
        handle.await.unwrap();
        let calls = client.info_calls();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.info_calls(), calls);
    }
}
