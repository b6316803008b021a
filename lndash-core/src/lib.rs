#![crate_name = "lndash_core"]

//! The view-model behind a Lightning node dashboard.
//! See [`models::Models`] for the entry point.

#![forbid(unsafe_code)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(missing_docs)]

#[cfg(feature = "grpc")]
extern crate tonic;

/// Channels and channel reconciliation
pub mod channel;
/// Remote node access
pub mod client;
/// Request cancellation and deadlines
pub mod context;
/// The view-model store
pub mod models;
/// Node identity and peer metadata
pub mod node;
/// Interval driven refresh
pub mod poller;
/// Routing event history
pub mod routing;
/// Various utilities
pub mod util;
/// On-chain wallet state
pub mod wallet;

pub use self::client::NodeClient;
pub use self::context::RequestContext;
pub use self::models::Models;
pub use self::poller::{PollIntervals, Poller};
pub use self::util::status::{Code, Status};
