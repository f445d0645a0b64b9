//! Deterministic challenge-block schedule.
//!
//! Every masternode is expected to attest to a pseudorandom subset of
//! recent blocks. The subset is derived from chain hashes and the staking
//! outpoint, so every node computes the same schedule and it reshuffles
//! each time the chain crosses a restart boundary.

use crate::params::{EXISTENCE_PERIOD, EXISTENCE_RESTART_PERIOD};
use ember_core::{ChainView, OutPoint};
use ember_crypto::sha256_concat;

/// Challenge heights for `outpoint` at the current tip.
///
/// Two windows are considered: the one containing the tip and the one
/// before it. Each window is seeded from the block hash `EXISTENCE_PERIOD`
/// blocks below the window start, mixed with the outpoint, and contributes
/// `EXISTENCE_RESTART_PERIOD / EXISTENCE_PERIOD` evenly spaced heights.
/// Only heights within `EXISTENCE_RESTART_PERIOD` of the tip (and not past
/// it) are kept.
pub fn existence_blocks(chain: &dyn ChainView, outpoint: &OutPoint) -> Vec<u32> {
    let tip = chain.tip_height();
    let mut heights = Vec::new();

    if tip < 4 * EXISTENCE_RESTART_PERIOD {
        return heights;
    }

    let anchor = tip / EXISTENCE_RESTART_PERIOD * EXISTENCE_RESTART_PERIOD;
    for window in [1u32, 0] {
        let seed_height = anchor - window * EXISTENCE_RESTART_PERIOD;
        let Some(seed_block) = chain.block_at_height(seed_height - EXISTENCE_PERIOD) else {
            continue;
        };

        let digest = sha256_concat(&[
            seed_block.hash.as_bytes(),
            outpoint.txid.as_bytes(),
            &outpoint.vout.to_le_bytes(),
        ]);
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let shift = (u64::from_le_bytes(seed_bytes) % EXISTENCE_PERIOD as u64) as u32;

        let mut height = seed_height + shift;
        while height < seed_height + EXISTENCE_RESTART_PERIOD {
            if height <= tip && height + EXISTENCE_RESTART_PERIOD > tip {
                heights.push(height);
            }
            height += EXISTENCE_PERIOD;
        }
    }

    heights
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{Block, ChainState, Hash256};

    fn build_chain(length: u32) -> ChainState {
        let chain = ChainState::new();
        for i in 1..=length {
            let tip = chain.tip();
            let block = Block::new(i, Hash256::sha256(i.to_string().as_bytes()), tip.hash);
            chain.connect_block(block).unwrap();
        }
        chain
    }

    fn sample_outpoint(tag: u8) -> OutPoint {
        OutPoint::new(Hash256::sha256(&[tag]), 0)
    }

    #[test]
    fn test_empty_below_minimum_height() {
        let chain = build_chain(4 * EXISTENCE_RESTART_PERIOD - 1);
        assert!(existence_blocks(&chain, &sample_outpoint(1)).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let chain = build_chain(1_000);
        let outpoint = sample_outpoint(0x11);

        let a = existence_blocks(&chain, &outpoint);
        let b = existence_blocks(&chain, &outpoint);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_coverage_window() {
        let chain = build_chain(1_000);
        let tip = chain.tip_height();

        for tag in 0..16 {
            for height in existence_blocks(&chain, &sample_outpoint(tag)) {
                assert!(height <= tip);
                assert!(height + EXISTENCE_RESTART_PERIOD > tip);
            }
        }
    }

    #[test]
    fn test_challenge_count_bounds() {
        // Interior windows contribute exactly RESTART/PERIOD challenges;
        // the windows clipped at the tip can each lose one at a zero shift.
        let per_window = (EXISTENCE_RESTART_PERIOD / EXISTENCE_PERIOD) as usize;
        for length in [320u32, 325, 333, 340, 999, 1_000] {
            let chain = build_chain(length);
            for tag in 0..8 {
                let count = existence_blocks(&chain, &sample_outpoint(tag)).len();
                assert!(
                    count + 1 >= per_window && count <= 2 * per_window,
                    "tip {length}: {count} challenges outside [{}, {}]",
                    per_window - 1,
                    2 * per_window
                );
            }
        }
    }

    #[test]
    fn test_differs_per_candidate() {
        let chain = build_chain(1_000);

        // Shifts are seeded per outpoint; across enough candidates at
        // least two schedules must differ.
        let schedules: Vec<_> = (0..8)
            .map(|tag| existence_blocks(&chain, &sample_outpoint(tag)))
            .collect();
        assert!(schedules.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_schedule_advances_with_tip() {
        // A full restart period later, yesterday's challenges have all
        // aged out of the retention window.
        let outpoint = sample_outpoint(7);
        let before = {
            let chain = build_chain(339);
            existence_blocks(&chain, &outpoint)
        };
        let after = {
            let chain = build_chain(339 + EXISTENCE_RESTART_PERIOD);
            existence_blocks(&chain, &outpoint)
        };
        assert!(!before.is_empty() && !after.is_empty());
        for height in &before {
            assert!(!after.contains(height));
        }
    }
}
