//! Gossip handling for existence messages, and the block-receipt tick.

use crate::params::MONITORING_PERIOD;
use crate::types::{ExistenceMsg, MsgVerdict};
use crate::MasternodeManager;
use ember_network::{Peer, MSG_MASTERNODE_EXISTS};
use tracing::{debug, warn};

impl MasternodeManager {
    /// Entry point for a gossiped existence message.
    ///
    /// `from` is the delivering peer, or `None` for self-injected
    /// messages. Verdicts translate into peer misbehaviour reports and the
    /// relay decision; everything is ignored while still syncing.
    pub fn process_existence_msg(&mut self, from: Option<&dyn Peer>, msg: &ExistenceMsg) {
        if self.chain.is_initial_block_download() {
            return;
        }

        match self.handle_existence(msg) {
            MsgVerdict::Misbehaviour(score) => {
                if let Some(peer) = from {
                    peer.misbehaving(score);
                }
            }
            MsgVerdict::Ignored => {}
            MsgVerdict::Admitted => {
                let inv = msg.identity_hash();
                if let Some(peer) = from {
                    peer.mark_known(&inv);
                }
                match msg.to_wire() {
                    Ok(payload) => {
                        let sent = self.peers.relay(&inv, MSG_MASTERNODE_EXISTS, &payload);
                        debug!(outpoint = %msg.outpoint, peers = sent, "existence message relayed");
                    }
                    Err(err) => warn!(error = %err, "failed to encode existence message"),
                }
            }
        }
    }

    fn handle_existence(&mut self, msg: &ExistenceMsg) -> MsgVerdict {
        let tip = self.chain.tip_height() as i64;
        let height = msg.block_height as i64;

        // Ancient messages should have fallen out of relay long ago;
        // whoever sent one is misbehaving. Merely old ones are dropped
        // without blame.
        if height < tip - MONITORING_PERIOD as i64 {
            return MsgVerdict::Misbehaviour(20);
        }
        if height < tip - (MONITORING_PERIOD / 2) as i64 {
            return MsgVerdict::Ignored;
        }

        let now_ms = self.clock.now_ms();
        let coins = self.coins.clone();
        let Some(mn) = self.registry.get(&msg.outpoint, coins.as_ref(), &self.params) else {
            return MsgVerdict::Misbehaviour(20);
        };

        match msg.recover_signer() {
            Ok(signer) if signer.key_id() == mn.key_id => {}
            _ => return MsgVerdict::Misbehaviour(100),
        }

        debug!(outpoint = %msg.outpoint, block = msg.block_height, "masternode existence message");
        mn.add_existence_msg(msg.clone(), tip as u32, now_ms)
    }

    /// Block-receipt tick, invoked whenever the best chain may have
    /// changed.
    ///
    /// Pins `initial_height` on the first post-sync call, prunes the
    /// registry every 10 blocks, and stamps a first-seen receive time on
    /// every newly connected block (walking back from the tip until a
    /// stamped block is found), announcing local masternodes for each
    /// newly stamped block.
    pub fn process_blocks(&mut self) {
        if self.chain.is_initial_block_download() {
            return;
        }

        let chain = self.chain.clone();
        let coins = self.coins.clone();
        let tip = chain.tip_height();
        let initial_height = *self.initial_height.get_or_insert(tip);

        if tip % 10 == 0 {
            self.registry.prune(coins.as_ref(), &self.params);
        }

        let mut height = tip;
        while height > initial_height {
            let Some(block) = chain.block_at_height(height) else {
                break;
            };
            if !self.annex.stamp_recv_time(&block.hash, self.clock.now_ms()) {
                break;
            }
            self.announce_local(&block);
            height -= 1;
        }
    }
}
