//! Vote casting: reconcile the elected set with the candidates this node
//! would prefer, producing the bounded add/remove vote vectors embedded in
//! locally produced blocks.

use crate::candidate::ScoreContext;
use crate::params::{MAX_SCORE, MONITORING_PERIOD_MIN};
use crate::MasternodeManager;
use ember_core::{OutPoint, COIN};
use std::cmp::Ordering;

/// Ranking used for voting: liveness score discounted by stake, ties
/// broken by outpoint so the order is total.
fn rank_order(a: &(f64, OutPoint), b: &(f64, OutPoint)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

fn stake_adjusted(score: f64, amount: u64) -> f64 {
    score - 0.001 * amount as f64 / COIN as f64
}

/// Merge walk over two sequences sorted by `comp`, splitting out the
/// elements unique to each side: `(only_in_a, only_in_b)`.
pub(crate) fn set_differences<T: Clone>(
    a: &[T],
    b: &[T],
    comp: impl Fn(&T, &T) -> Ordering,
) -> (Vec<T>, Vec<T>) {
    let mut only_a = Vec::new();
    let mut only_b = Vec::new();
    let (mut ai, mut bi) = (0, 0);

    while ai < a.len() && bi < b.len() {
        match comp(&a[ai], &b[bi]) {
            Ordering::Less => {
                only_a.push(a[ai].clone());
                ai += 1;
            }
            Ordering::Greater => {
                only_b.push(b[bi].clone());
                bi += 1;
            }
            Ordering::Equal => {
                ai += 1;
                bi += 1;
            }
        }
    }
    only_a.extend(a[ai..].iter().cloned());
    only_b.extend(b[bi..].iter().cloned());
    (only_a, only_b)
}

/// Split `max` vote slots between the two sides, proportionally to their
/// sizes. A non-empty side always keeps at least one slot. Sides within
/// the cap are returned unchanged.
pub(crate) fn vote_allocation(adds: usize, removes: usize, max: usize) -> (usize, usize) {
    let total = adds + removes;
    if total <= max {
        return (adds, removes);
    }

    let add_slots = if adds == 0 {
        0
    } else if removes == 0 {
        max
    } else {
        let share = (adds * max) as f64 / total as f64;
        (share.round() as usize).clamp(1, max - 1)
    };
    (add_slots, max - add_slots)
}

impl MasternodeManager {
    /// Produce the `(add, remove)` vote vectors for the next locally
    /// produced block.
    ///
    /// Empty until this node has monitored the network long enough to have
    /// an opinion. The combined length never exceeds `max_votes`.
    pub fn cast_votes(&mut self) -> (Vec<OutPoint>, Vec<OutPoint>) {
        let chain = self.chain.clone();
        let coins = self.coins.clone();
        let tip = chain.tip_height();

        let Some(initial_height) = self.initial_height else {
            return (Vec::new(), Vec::new());
        };
        if tip < initial_height + MONITORING_PERIOD_MIN {
            return (Vec::new(), Vec::new());
        }

        self.registry.prune(coins.as_ref(), &self.params);

        let ctx = ScoreContext {
            chain: chain.as_ref(),
            annex: &self.annex,
            initial_height,
        };

        // Our preferred set: every healthy candidate, best ranked first,
        // capped at the elected-set size limit.
        let mut known: Vec<(f64, OutPoint)> = Vec::new();
        for mn in self.registry.iter_mut() {
            let score = mn.score(&ctx);
            if score <= MAX_SCORE {
                known.push((stake_adjusted(score, mn.amount), mn.outpoint));
            }
        }
        known.sort_by(rank_order);
        known.truncate(self.params.max_masternodes);

        let elected_outpoints: Vec<OutPoint> = self.elected.iter().copied().collect();
        let mut elected: Vec<(f64, OutPoint)> = Vec::with_capacity(elected_outpoints.len());
        for outpoint in elected_outpoints {
            let weight = match self.registry.get(&outpoint, coins.as_ref(), &self.params) {
                Some(mn) => stake_adjusted(mn.score(&ctx), mn.amount),
                // Elected entries we cannot resolve any more rank last and
                // fall out as remove votes.
                None => f64::MAX,
            };
            elected.push((weight, outpoint));
        }
        elected.sort_by(rank_order);

        // The differences between what is elected and what we would elect
        // are our votes.
        let (only_elected, only_known) = set_differences(&elected, &known, rank_order);
        let mut removes: Vec<OutPoint> = only_elected.into_iter().map(|(_, op)| op).collect();
        let mut adds: Vec<OutPoint> = only_known.into_iter().map(|(_, op)| op).collect();

        // The merge emitted additions best-first; reverse so truncation
        // below keeps the candidates closest to the election boundary.
        adds.reverse();

        let (add_slots, remove_slots) =
            vote_allocation(adds.len(), removes.len(), self.params.max_votes);
        adds.truncate(add_slots);
        removes.truncate(remove_slots);

        (adds, removes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp_i32(a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn test_set_differences_disjoint() {
        let (only_a, only_b) = set_differences(&[1, 3, 5], &[2, 4], cmp_i32);
        assert_eq!(only_a, vec![1, 3, 5]);
        assert_eq!(only_b, vec![2, 4]);
    }

    #[test]
    fn test_set_differences_overlap() {
        let (only_a, only_b) = set_differences(&[1, 2, 3, 4], &[2, 4, 6], cmp_i32);
        assert_eq!(only_a, vec![1, 3]);
        assert_eq!(only_b, vec![6]);
    }

    #[test]
    fn test_set_differences_identical() {
        let (only_a, only_b) = set_differences(&[1, 2], &[1, 2], cmp_i32);
        assert!(only_a.is_empty());
        assert!(only_b.is_empty());
    }

    #[test]
    fn test_set_differences_one_empty() {
        let (only_a, only_b) = set_differences(&[], &[7, 8], cmp_i32);
        assert!(only_a.is_empty());
        assert_eq!(only_b, vec![7, 8]);
    }

    #[test]
    fn test_stake_adjustment_prefers_larger_stake() {
        let small = stake_adjusted(1.0, COIN);
        let large = stake_adjusted(1.0, 100 * COIN);
        assert!(large < small);
    }

    #[test]
    fn test_vote_allocation_under_cap() {
        assert_eq!(vote_allocation(3, 4, 10), (3, 4));
    }

    #[test]
    fn test_vote_allocation_proportional() {
        assert_eq!(vote_allocation(8, 8, 10), (5, 5));
        assert_eq!(vote_allocation(30, 10, 10), (8, 2));
    }

    #[test]
    fn test_vote_allocation_keeps_minority_slot() {
        assert_eq!(vote_allocation(1, 20, 10), (1, 9));
        assert_eq!(vote_allocation(20, 1, 10), (9, 1));
    }

    #[test]
    fn test_vote_allocation_one_sided() {
        assert_eq!(vote_allocation(0, 15, 10), (0, 10));
        assert_eq!(vote_allocation(15, 0, 10), (10, 0));
    }
}
