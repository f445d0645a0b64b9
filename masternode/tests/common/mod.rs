//! Shared harness for masternode integration tests.

#![allow(dead_code)]

use ember_core::{Block, ChainState, Hash256, OutPoint};
use ember_crypto::{pubkey_script, PrivateKey};
use ember_masternode::{ManualClock, MasternodeManager, MasternodeParams};
use ember_network::PeerSet;
use std::sync::Arc;

pub struct Harness {
    pub chain: Arc<ChainState>,
    pub peers: Arc<PeerSet>,
    pub clock: Arc<ManualClock>,
    pub manager: MasternodeManager,
}

pub fn harness(params: MasternodeParams) -> Harness {
    let chain = Arc::new(ChainState::new());
    let peers = Arc::new(PeerSet::new());
    let clock = Arc::new(ManualClock::new(1_000_000));
    let manager = MasternodeManager::with_clock(
        params,
        chain.clone(),
        chain.clone(),
        peers.clone(),
        clock.clone(),
    );
    Harness {
        chain,
        peers,
        clock,
        manager,
    }
}

impl Harness {
    /// Connect `count` empty blocks without driving the manager.
    pub fn extend_chain(&self, count: u32) {
        for _ in 0..count {
            self.next_block();
        }
    }

    /// Build and connect the next block (no manager involvement).
    pub fn next_block(&self) -> Block {
        self.next_block_with_votes(Vec::new(), Vec::new())
    }

    /// Build and connect the next block carrying the given votes.
    pub fn next_block_with_votes(&self, adds: Vec<OutPoint>, removes: Vec<OutPoint>) -> Block {
        let tip = self.chain.tip();
        let height = tip.height + 1;
        let block = Block::new(
            height,
            Hash256::sha256(format!("block-{height}").as_bytes()),
            tip.hash,
        )
        .with_votes(adds, removes);
        self.chain.connect_block(block.clone()).unwrap();
        block
    }

    /// Register a mature-at-genesis staking output controlled by `key`.
    pub fn add_stake(&self, key: &PrivateKey, tag: &str, value: u64) -> OutPoint {
        let outpoint = OutPoint::new(Hash256::sha256(tag.as_bytes()), 0);
        self.chain
            .add_utxo(outpoint, value, pubkey_script(&key.public_key()), 0)
            .unwrap();
        outpoint
    }
}
