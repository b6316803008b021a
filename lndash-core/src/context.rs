use core::future::Future;
use std::time::Duration;

use triggered::Listener;

use crate::util::status::Status;

/// Cancellation and timeout for a single refresh.
///
/// Every call to the [`NodeClient`](crate::client::NodeClient) made during a
/// refresh is raced against the cancellation signal and, if set, the timeout.
/// The same context is passed down to the client so it can abort its own
/// transport early.
#[derive(Clone)]
pub struct RequestContext {
    cancel: Listener,
    timeout: Option<Duration>,
}

impl RequestContext {
    /// Create a context that is cancelled when `cancel` fires
    pub fn new(cancel: Listener) -> Self {
        RequestContext { cancel, timeout: None }
    }

    /// Bound each remote call made with this context by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The per-call timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the cancellation signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_triggered()
    }

    /// The cancellation signal, for clients that want to select on it
    pub fn listener(&self) -> Listener {
        self.cancel.clone()
    }

    /// Run a remote call, aborting it on cancellation or timeout.
    pub async fn run<T, F>(&self, call: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, Status>>,
    {
        if self.is_cancelled() {
            return Err(Status::cancelled("request cancelled"));
        }
        let timeout = self.timeout;
        let bounded = async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(Status::deadline_exceeded(format!(
                        "request timed out after {:?}",
                        limit
                    ))),
                },
                None => call.await,
            }
        };
        let cancel = self.cancel.clone();
        tokio::select! {
            result = bounded => result,
            _ = cancel => Err(Status::cancelled("request cancelled")),
        }
    }
}
