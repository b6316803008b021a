use serde::{Deserialize, Serialize};

/// Information about the local node, replaced wholesale on every refresh
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NodeInfo {
    /// The node identity public key, hex encoded
    pub pubkey: String,
    /// The node alias
    pub alias: String,
    /// Implementation version string reported by the node
    pub version: String,
    /// Number of channels awaiting funding confirmation
    pub num_pending_channels: u32,
    /// Number of active channels
    pub num_active_channels: u32,
    /// Number of inactive channels
    pub num_inactive_channels: u32,
    /// Number of connected peers
    pub num_peers: u32,
    /// Best block height known to the node
    pub block_height: u32,
    /// Best block hash known to the node
    pub block_hash: String,
    /// Whether the node wallet is synced to the chain tip
    pub synced_to_chain: bool,
    /// Whether the node has finished syncing the channel graph
    pub synced_to_graph: bool,
    /// Chains the node is running on, e.g. `bitcoin/mainnet`
    pub chains: Vec<String>,
}

impl NodeInfo {
    /// Total number of channels, in any state
    pub fn num_channels(&self) -> u32 {
        self.num_pending_channels
            .saturating_add(self.num_active_channels)
            .saturating_add(self.num_inactive_channels)
    }

    /// Whether the node is fully synced
    pub fn is_synced(&self) -> bool {
        self.synced_to_chain && self.synced_to_graph
    }
}

/// Public graph metadata about a remote node, looked up by its pubkey
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PeerNode {
    /// The node identity public key, hex encoded
    pub pubkey: String,
    /// The advertised alias
    pub alias: String,
    /// Number of public channels
    pub num_channels: u32,
    /// Total public capacity, in satoshi
    pub total_capacity: i64,
    /// Time of the last node announcement, in seconds since the epoch
    pub last_update: Option<u64>,
    /// Advertised network addresses
    pub addresses: Vec<String>,
}

impl PeerNode {
    /// The alias, falling back to a shortened pubkey when none is advertised
    pub fn display_name(&self) -> String {
        if !self.alias.is_empty() {
            return self.alias.clone();
        }
        self.pubkey.chars().take(16).collect()
    }
}
