//! In-memory chain state.
//!
//! Reference implementation of [`ChainView`] and [`CoinView`] backing the
//! node when no external block store is wired in, and every integration
//! test in the workspace. Interior locking keeps the handles shareable
//! (`Arc<ChainState>`) while connect/disconnect mutate through `&self`.

use crate::block::Block;
use crate::chain::{ChainView, CoinView, Utxo};
use crate::hash::Hash256;
use crate::outpoint::OutPoint;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("invalid block height: expected {expected}, got {got}")]
    InvalidBlockHeight { expected: u32, got: u32 },

    #[error("invalid previous hash for block at height {0}")]
    InvalidPreviousHash(u32),

    #[error("block not found")]
    BlockNotFound,

    #[error("cannot disconnect the genesis block")]
    GenesisDisconnect,

    #[error("duplicate outpoint {0}")]
    DuplicateOutpoint(OutPoint),
}

struct CoinEntry {
    value: u64,
    script_pubkey: Vec<u8>,
    created_height: u32,
}

#[derive(Default)]
struct Inner {
    /// Connected chain, indexed by height.
    blocks: Vec<Block>,
    coins: HashMap<OutPoint, CoinEntry>,
    syncing: bool,
}

pub struct ChainState {
    inner: RwLock<Inner>,
}

impl ChainState {
    /// Empty chain holding only a genesis block.
    pub fn new() -> Self {
        let genesis = Block::new(0, Hash256::sha256(b"ember-genesis"), Hash256::ZERO);
        let inner = Inner {
            blocks: vec![genesis],
            coins: HashMap::new(),
            syncing: false,
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Append a block to the tip.
    pub fn connect_block(&self, block: Block) -> Result<(), StateError> {
        let mut inner = self.inner.write().unwrap();
        let tip = inner.blocks.last().ok_or(StateError::BlockNotFound)?;

        if block.height != tip.height + 1 {
            return Err(StateError::InvalidBlockHeight {
                expected: tip.height + 1,
                got: block.height,
            });
        }
        if block.parent != tip.hash {
            return Err(StateError::InvalidPreviousHash(block.height));
        }

        inner.blocks.push(block);
        Ok(())
    }

    /// Detach and return the tip block.
    pub fn disconnect_tip(&self) -> Result<Block, StateError> {
        let mut inner = self.inner.write().unwrap();
        if inner.blocks.len() <= 1 {
            return Err(StateError::GenesisDisconnect);
        }
        Ok(inner.blocks.pop().expect("checked non-empty"))
    }

    pub fn tip(&self) -> Block {
        let inner = self.inner.read().unwrap();
        inner.blocks.last().expect("genesis always present").clone()
    }

    /// Register an unspent output created at `height`.
    pub fn add_utxo(
        &self,
        outpoint: OutPoint,
        value: u64,
        script_pubkey: Vec<u8>,
        height: u32,
    ) -> Result<(), StateError> {
        let mut inner = self.inner.write().unwrap();
        if inner.coins.contains_key(&outpoint) {
            return Err(StateError::DuplicateOutpoint(outpoint));
        }
        inner.coins.insert(
            outpoint,
            CoinEntry {
                value,
                script_pubkey,
                created_height: height,
            },
        );
        Ok(())
    }

    /// Remove an output from the UTXO set. Returns whether it existed.
    pub fn spend_utxo(&self, outpoint: &OutPoint) -> bool {
        let mut inner = self.inner.write().unwrap();
        inner.coins.remove(outpoint).is_some()
    }

    pub fn set_syncing(&self, syncing: bool) {
        self.inner.write().unwrap().syncing = syncing;
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainView for ChainState {
    fn tip_height(&self) -> u32 {
        let inner = self.inner.read().unwrap();
        inner.blocks.last().map(|b| b.height).unwrap_or(0)
    }

    fn block_at_height(&self, height: u32) -> Option<Block> {
        let inner = self.inner.read().unwrap();
        inner.blocks.get(height as usize).cloned()
    }

    fn is_initial_block_download(&self) -> bool {
        self.inner.read().unwrap().syncing
    }
}

impl CoinView for ChainState {
    fn unspent_output(&self, outpoint: &OutPoint) -> Option<Utxo> {
        let inner = self.inner.read().unwrap();
        let tip_height = inner.blocks.last().map(|b| b.height).unwrap_or(0);
        let entry = inner.coins.get(outpoint)?;

        Some(Utxo {
            value: entry.value,
            confirmations: tip_height.saturating_sub(entry.created_height) + 1,
            script_pubkey: entry.script_pubkey.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extend(chain: &ChainState, label: &str) -> Block {
        let tip = chain.tip();
        let block = Block::new(tip.height + 1, Hash256::sha256(label.as_bytes()), tip.hash);
        chain.connect_block(block.clone()).unwrap();
        block
    }

    #[test]
    fn test_connect_disconnect() {
        let chain = ChainState::new();
        let b1 = extend(&chain, "b1");
        extend(&chain, "b2");
        assert_eq!(chain.tip_height(), 2);

        let popped = chain.disconnect_tip().unwrap();
        assert_eq!(popped.height, 2);
        assert_eq!(chain.tip().hash, b1.hash);
    }

    #[test]
    fn test_connect_rejects_gaps() {
        let chain = ChainState::new();
        let bad = Block::new(5, Hash256::sha256(b"bad"), chain.tip().hash);
        assert!(chain.connect_block(bad).is_err());
    }

    #[test]
    fn test_connect_rejects_wrong_parent() {
        let chain = ChainState::new();
        let bad = Block::new(1, Hash256::sha256(b"bad"), Hash256::sha256(b"not-tip"));
        assert!(chain.connect_block(bad).is_err());
    }

    #[test]
    fn test_utxo_confirmations() {
        let chain = ChainState::new();
        let outpoint = OutPoint::new(Hash256::sha256(b"tx"), 0);
        chain.add_utxo(outpoint, 1000, vec![], 0).unwrap();

        assert_eq!(chain.unspent_output(&outpoint).unwrap().confirmations, 1);

        for i in 0..10 {
            extend(&chain, &format!("b{i}"));
        }
        assert_eq!(chain.unspent_output(&outpoint).unwrap().confirmations, 11);

        assert!(chain.spend_utxo(&outpoint));
        assert!(chain.unspent_output(&outpoint).is_none());
    }

    #[test]
    fn test_genesis_not_disconnectable() {
        let chain = ChainState::new();
        assert!(chain.disconnect_tip().is_err());
    }
}
