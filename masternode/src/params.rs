//! Masternode consensus constants.
//!
//! The values here are fork-sensitive: every node on the network must run
//! with the same set. The fixed constants are baked in; the remaining knobs
//! are carried in [`MasternodeParams`] so deployments pin them at startup.

use ember_core::COIN;

/// Confirmations a staking output needs before its masternode is tracked.
pub const MIN_CONFIRMATIONS: u32 = 10;

/// The challenge schedule reseeds every this many blocks.
pub const EXISTENCE_RESTART_PERIOD: u32 = 20;

/// Spacing between challenge blocks within a schedule window.
pub const EXISTENCE_PERIOD: u32 = 5;

const _: () = assert!(EXISTENCE_RESTART_PERIOD % EXISTENCE_PERIOD == 0);

/// How far back (in blocks) liveness is monitored.
pub const MONITORING_PERIOD: u32 = 100;

/// Blocks of monitoring required before this node starts voting.
pub const MONITORING_PERIOD_MIN: u32 = 30;

/// Assumed response time, in seconds, for an unanswered challenge.
pub const PENALTY_TIME: f64 = 500.0;

/// Worst score a candidate may have and still be voted for.
pub const MAX_SCORE: f64 = 100.0;

/// Sentinel score for candidates flagged as misbehaving.
pub const MISBEHAVING_SCORE: f64 = 99.0 * MAX_SCORE;

/// Existence messages tracked per candidate before it is flagged as spamming.
pub const MAX_TRACKED_MSGS: usize = (MONITORING_PERIOD / EXISTENCE_PERIOD) as usize * 10;

/// A cached score is refreshed once the tip has advanced this many blocks.
pub const SCORE_STALE_BLOCKS: u32 = 5;

/// Elected masternodes needed before payee rotation starts.
pub const START_PAYMENTS: usize = 150;

/// Elected masternodes below which payee rotation stops again.
pub const STOP_PAYMENTS: usize = 100;

/// Deployment-pinned consensus parameters.
#[derive(Debug, Clone)]
pub struct MasternodeParams {
    /// Blocks examined when tallying election votes.
    pub election_period: u32,

    /// Cap on add + remove votes a block may carry.
    pub max_votes: usize,

    /// Size cap on the preferred candidate set when voting.
    pub max_masternodes: usize,

    /// Minimum staking output value, in base units.
    pub min_stake: u64,

    /// Height at which masternode consensus rules activate.
    pub fork_height: u32,
}

impl Default for MasternodeParams {
    fn default() -> Self {
        Self {
            election_period: 30,
            max_votes: 10,
            max_masternodes: 300,
            min_stake: 1_000 * COIN,
            fork_height: 100,
        }
    }
}
