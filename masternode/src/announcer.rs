//! Local announcer: attest to newly received blocks for the masternodes
//! this node operates.

use crate::schedule::existence_blocks;
use crate::types::ExistenceMsg;
use crate::MasternodeManager;
use ember_core::Block;
use tracing::warn;

impl MasternodeManager {
    /// If `block` is a challenge block for any started local masternode,
    /// sign an existence message for it and feed it through the gossip
    /// entry (no sender), which admits it locally and relays it.
    pub(crate) fn announce_local(&mut self, block: &Block) {
        let chain = self.chain.clone();
        let coins = self.coins.clone();

        for outpoint in self.registry.local_outpoints() {
            let Some(mn) = self.registry.get(&outpoint, coins.as_ref(), &self.params) else {
                continue;
            };
            let Some(key) = mn.signing_key.clone() else {
                continue;
            };

            if !existence_blocks(chain.as_ref(), &outpoint).contains(&block.height) {
                continue;
            }

            match ExistenceMsg::signed(outpoint, block.height, block.hash, &key) {
                Ok(msg) => self.process_existence_msg(None, &msg),
                Err(err) => {
                    warn!(%outpoint, error = %err, "failed to sign existence message");
                }
            }
        }
    }
}
