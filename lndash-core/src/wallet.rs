use serde::{Deserialize, Serialize};

/// On-chain wallet balance, in satoshi
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WalletBalance {
    /// Confirmed plus unconfirmed
    pub total_balance: i64,
    /// Confirmed balance
    pub confirmed_balance: i64,
    /// Unconfirmed balance
    pub unconfirmed_balance: i64,
}

/// Sum of the local balances over all channels, in satoshi
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelsBalance {
    /// Local balance in open channels
    pub balance: i64,
    /// Local balance in channels still waiting for funding confirmation
    pub pending_open_balance: i64,
}

/// An on-chain transaction relevant to the node wallet
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Transaction {
    /// Transaction id, hex encoded
    pub tx_hash: String,
    /// Net effect on the wallet, in satoshi; negative when spending
    pub amount: i64,
    /// Fees paid, in satoshi
    pub total_fees: i64,
    /// Number of confirmations, zero while in the mempool
    pub num_confirmations: u32,
    /// Hash of the confirming block, empty while unconfirmed
    pub block_hash: String,
    /// Height of the confirming block, zero while unconfirmed
    pub block_height: u32,
    /// First seen time, in seconds since the epoch
    pub time_stamp: u64,
    /// Output addresses
    pub dest_addresses: Vec<String>,
}

impl Transaction {
    /// Whether the transaction has at least one confirmation
    pub fn is_confirmed(&self) -> bool {
        self.num_confirmations > 0
    }
}
