//! Elections: tallying block-embedded votes, mutating the elected set on
//! connect (reversibly), and rotating the block payee over it.

use crate::params::{START_PAYMENTS, STOP_PAYMENTS};
use crate::MasternodeManager;
use ember_core::{Block, OutPoint, VOTE_ADD, VOTE_REMOVE};
use ember_crypto::KeyId;
use std::collections::btree_set;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use tracing::{debug, info};

/// The elected masternode set, kept in outpoint order.
///
/// Lexicographic iteration is consensus-relevant: payee rotation walks the
/// set in order, so an insertion-ordered container would diverge across
/// nodes.
#[derive(Default)]
pub struct ElectedMasternodes {
    set: BTreeSet<OutPoint>,
}

impl ElectedMasternodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.set.contains(outpoint)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, OutPoint> {
        self.set.iter()
    }

    pub(crate) fn insert(&mut self, outpoint: OutPoint) -> bool {
        self.set.insert(outpoint)
    }

    pub(crate) fn remove(&mut self, outpoint: &OutPoint) -> bool {
        self.set.remove(outpoint)
    }

    /// The payee following `prev` in outpoint order, wrapping at the end.
    ///
    /// Payments only run while the set is large enough: they start at
    /// [`START_PAYMENTS`] elected masternodes and stop again below
    /// [`STOP_PAYMENTS`].
    pub fn next_payee(&self, prev: Option<&OutPoint>) -> Option<OutPoint> {
        match prev {
            None => {
                if self.set.len() >= START_PAYMENTS {
                    self.set.iter().next().copied()
                } else {
                    None
                }
            }
            Some(prev) => {
                if self.set.len() >= STOP_PAYMENTS {
                    self.set
                        .range((Bound::Excluded(*prev), Bound::Unbounded))
                        .next()
                        .copied()
                        .or_else(|| self.set.iter().next().copied())
                } else {
                    None
                }
            }
        }
    }
}

impl MasternodeManager {
    /// Apply the elections a newly connected block triggers and select its
    /// payee. Returns the payee's key id (the coinbase beneficiary), if
    /// payments are running.
    ///
    /// The block must already be reachable through the chain view. Blocks
    /// at or below the fork height carry no masternode consensus.
    pub fn connect_block(&mut self, block: &Block) -> Option<KeyId> {
        if block.height <= self.params.fork_height {
            return None;
        }

        let tallies = self.tally_votes(block);
        let majority = self.params.election_period / 2;
        let coins = self.coins.clone();
        let mut applied = [Vec::new(), Vec::new()];

        for (outpoint, count) in &tallies[VOTE_ADD] {
            if *count > majority
                && self.registry.get(outpoint, coins.as_ref(), &self.params).is_some()
                && self.elected.insert(*outpoint)
            {
                applied[VOTE_ADD].push(*outpoint);
            }
        }
        for (outpoint, count) in &tallies[VOTE_REMOVE] {
            if *count > majority && self.elected.remove(outpoint) {
                applied[VOTE_REMOVE].push(*outpoint);
            }
        }

        if !applied[VOTE_ADD].is_empty() || !applied[VOTE_REMOVE].is_empty() {
            info!(
                height = block.height,
                added = applied[VOTE_ADD].len(),
                removed = applied[VOTE_REMOVE].len(),
                elected = self.elected.len(),
                "masternode elections applied"
            );
        }
        self.annex.set_applied(&block.hash, applied);

        let prev_payee = self.annex.payee(&block.parent);
        let payee = self.elected.next_payee(prev_payee.as_ref());
        self.annex.set_payee(&block.hash, payee);

        let payee = payee?;
        self.registry
            .get(&payee, coins.as_ref(), &self.params)
            .map(|mn| mn.key_id)
    }

    /// Undo the elections `connect_block` applied for this block.
    ///
    /// Divergence here means the chain index or the elected set is
    /// corrupt; the node must not continue.
    pub fn disconnect_block(&mut self, block: &Block) {
        let applied = self.annex.take_applied(&block.hash);
        self.annex.clear_payee(&block.hash);

        for outpoint in &applied[VOTE_ADD] {
            assert!(
                self.elected.remove(outpoint),
                "election undo divergence: {outpoint} was not elected"
            );
        }
        for outpoint in &applied[VOTE_REMOVE] {
            assert!(
                self.elected.insert(*outpoint),
                "election undo divergence: {outpoint} was still elected"
            );
        }
    }

    /// Rebuild the elected set from chain data alone by replaying every
    /// block past the fork height. Called once at startup, after the chain
    /// index is built.
    pub fn load_elections(&mut self) {
        let chain = self.chain.clone();
        let tip = chain.tip_height();
        let start = self.params.fork_height + 1;

        for height in start..=tip {
            if let Some(block) = chain.block_at_height(height) {
                self.connect_block(&block);
            }
        }
        debug!(elected = self.elected.len(), tip, "masternode elections loaded");
    }

    /// Tally the votes carried by the `election_period` blocks ending at
    /// this block's parent. Every voted outpoint is also offered to the
    /// registry so vote targets become tracked candidates.
    fn tally_votes(&mut self, block: &Block) -> [BTreeMap<OutPoint, u32>; 2] {
        let chain = self.chain.clone();
        let coins = self.coins.clone();
        let mut tallies = [BTreeMap::new(), BTreeMap::new()];

        let mut expected_hash = block.parent;
        let mut height = block.height;
        for _ in 0..self.params.election_period {
            let Some(h) = height.checked_sub(1) else {
                break;
            };
            height = h;
            let Some(current) = chain.block_at_height(h) else {
                break;
            };
            if current.hash != expected_hash {
                break;
            }
            for side in [VOTE_ADD, VOTE_REMOVE] {
                for vote in &current.votes[side] {
                    *tallies[side].entry(*vote).or_insert(0u32) += 1;
                }
            }
            expected_hash = current.parent;
        }

        for tally in &tallies {
            for outpoint in tally.keys() {
                let _ = self.registry.get(outpoint, coins.as_ref(), &self.params);
            }
        }
        tallies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Hash256;

    fn outpoint(tag: u32) -> OutPoint {
        let mut txid = [0u8; 32];
        txid[..4].copy_from_slice(&tag.to_be_bytes());
        OutPoint::new(Hash256::new(txid), 0)
    }

    fn elected_with(count: usize) -> ElectedMasternodes {
        let mut elected = ElectedMasternodes::new();
        for i in 0..count {
            elected.insert(outpoint(i as u32));
        }
        elected
    }

    #[test]
    fn test_no_payments_until_start_threshold() {
        let elected = elected_with(START_PAYMENTS - 1);
        assert_eq!(elected.next_payee(None), None);
    }

    #[test]
    fn test_first_payee_is_smallest() {
        let elected = elected_with(START_PAYMENTS);
        assert_eq!(elected.next_payee(None), Some(outpoint(0)));
    }

    #[test]
    fn test_rotation_wraps_in_order() {
        let elected = elected_with(START_PAYMENTS);

        let first = elected.next_payee(None).unwrap();
        let second = elected.next_payee(Some(&first)).unwrap();
        let third = elected.next_payee(Some(&second)).unwrap();
        assert_eq!(first, outpoint(0));
        assert_eq!(second, outpoint(1));
        assert_eq!(third, outpoint(2));

        // Walk the whole set; after the largest we wrap to the smallest.
        let last = outpoint(START_PAYMENTS as u32 - 1);
        assert_eq!(elected.next_payee(Some(&last)), Some(outpoint(0)));
    }

    #[test]
    fn test_rotation_visits_every_member_once() {
        let elected = elected_with(START_PAYMENTS);

        let mut seen = Vec::new();
        let mut payee = elected.next_payee(None);
        for _ in 0..START_PAYMENTS {
            let current = payee.unwrap();
            seen.push(current);
            payee = elected.next_payee(Some(&current));
        }

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), START_PAYMENTS);
        // Full cycle: back at the smallest member.
        assert_eq!(payee, Some(outpoint(0)));
    }

    #[test]
    fn test_payments_stop_below_stop_threshold() {
        let elected = elected_with(STOP_PAYMENTS - 1);
        let prev = outpoint(0);
        assert_eq!(elected.next_payee(Some(&prev)), None);
    }

    #[test]
    fn test_payments_continue_between_thresholds() {
        // Once running, payments survive shrinking below START_PAYMENTS as
        // long as the set stays at or above STOP_PAYMENTS.
        let elected = elected_with(STOP_PAYMENTS);
        let prev = outpoint(0);
        assert_eq!(elected.next_payee(Some(&prev)), Some(outpoint(1)));
    }
}
