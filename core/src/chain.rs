//! Host-facing views of the chain and the UTXO set.
//!
//! The masternode core never owns blocks or coins; it reads them through
//! these traits. Lookups are allowed to fail transiently (early sync,
//! pruned history) and callers treat a miss as "unknown", never as fatal.

use crate::block::Block;
use crate::outpoint::OutPoint;

/// An unspent output as reported by the coin view.
#[derive(Debug, Clone)]
pub struct Utxo {
    /// Value in base units.
    pub value: u64,

    /// Depth of the creating transaction under the current tip.
    pub confirmations: u32,

    /// Locking script; staking outputs use the pay-to-pubkey form.
    pub script_pubkey: Vec<u8>,
}

/// Read access to the connected block chain.
pub trait ChainView: Send + Sync {
    /// Height of the current tip.
    fn tip_height(&self) -> u32;

    /// The connected block at `height`, if the index reaches that far.
    fn block_at_height(&self, height: u32) -> Option<Block>;

    /// Whether the node is still catching up with the network.
    fn is_initial_block_download(&self) -> bool;
}

/// Read access to the UTXO set.
pub trait CoinView: Send + Sync {
    /// Look up an unspent output. `None` means spent or never existed.
    fn unspent_output(&self, outpoint: &OutPoint) -> Option<Utxo>;
}
