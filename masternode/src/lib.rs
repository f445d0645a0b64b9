//! Ember Coin masternode coordination
//!
//! Tracks staking candidates, measures their liveness against a
//! deterministic challenge schedule, gossips signed existence messages,
//! votes on which candidates deserve election, applies elections carried
//! in connected blocks (reversibly), and rotates block payees over the
//! elected set.
//!
//! Everything lives in one [`MasternodeManager`] owned by the host's chain
//! manager; the host drives it through the block-processing hooks and the
//! gossip entry point, and supplies chain access, coin access, the peer
//! list, and (implicitly) a monotone clock.

pub mod annex;
pub mod candidate;
pub mod config;
pub mod election;
pub mod error;
pub mod params;
pub mod registry;
pub mod schedule;
pub mod time;
pub mod types;

mod announcer;
mod gossip;
mod voting;

pub use annex::{AnnexTable, BlockAnnex};
pub use candidate::{Masternode, ScoreContext};
pub use config::{EntryProblem, MasternodeConfig, MasternodeConfigEntry, MasternodeConfigError};
pub use election::ElectedMasternodes;
pub use error::{MasternodeError, Result};
pub use params::*;
pub use registry::MasternodeRegistry;
pub use schedule::existence_blocks;
pub use time::{Clock, ManualClock, SystemClock};
pub use types::{ExistenceMsg, MsgVerdict, ReceivedExistenceMsg};

use ember_core::{ChainView, CoinView, OutPoint};
use ember_crypto::PrivateKey;
use ember_network::PeerSet;
use std::sync::Arc;
use tracing::warn;

/// The masternode coordination context.
///
/// All mutation happens on the host's chain-processing thread; none of the
/// methods here are reentrant, and the only lock ever taken is the peer
/// list's, during relay.
pub struct MasternodeManager {
    pub(crate) params: MasternodeParams,
    pub(crate) chain: Arc<dyn ChainView>,
    pub(crate) coins: Arc<dyn CoinView>,
    pub(crate) peers: Arc<PeerSet>,
    pub(crate) clock: Arc<dyn Clock>,

    pub(crate) registry: MasternodeRegistry,
    pub(crate) elected: ElectedMasternodes,
    pub(crate) annex: AnnexTable,

    /// Tip height observed at the first post-sync block tick. Blocks at or
    /// below it have no recorded receive time and never count for scoring.
    pub(crate) initial_height: Option<u32>,
}

impl MasternodeManager {
    pub fn new(
        params: MasternodeParams,
        chain: Arc<dyn ChainView>,
        coins: Arc<dyn CoinView>,
        peers: Arc<PeerSet>,
    ) -> Self {
        Self::with_clock(params, chain, coins, peers, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        params: MasternodeParams,
        chain: Arc<dyn ChainView>,
        coins: Arc<dyn CoinView>,
        peers: Arc<PeerSet>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            params,
            chain,
            coins,
            peers,
            clock,
            registry: MasternodeRegistry::new(),
            elected: ElectedMasternodes::new(),
            annex: AnnexTable::new(),
            initial_height: None,
        }
    }

    pub fn params(&self) -> &MasternodeParams {
        &self.params
    }

    pub fn initial_height(&self) -> Option<u32> {
        self.initial_height
    }

    pub fn elected(&self) -> &ElectedMasternodes {
        &self.elected
    }

    pub fn registry(&self) -> &MasternodeRegistry {
        &self.registry
    }

    pub fn annex(&self) -> &AnnexTable {
        &self.annex
    }

    /// Begin operating a masternode: attach the signing key controlling
    /// its staking output. Fails when the outpoint is not an acceptable
    /// stake or the key does not control it.
    pub fn start_local(&mut self, outpoint: OutPoint, key: PrivateKey) -> Result<()> {
        let coins = self.coins.clone();
        self.registry
            .set_local(outpoint, key, coins.as_ref(), &self.params)
    }

    /// Stop operating a masternode; it stays tracked as a remote candidate.
    pub fn stop_local(&mut self, outpoint: &OutPoint) {
        self.registry.clear_local(outpoint);
    }

    /// Start every masternode listed in the operator's config file.
    /// Entries that fail to start are logged and skipped; returns how many
    /// started.
    pub fn start_from_config(&mut self, config: &MasternodeConfig) -> usize {
        let mut started = 0;
        for entry in config.entries() {
            match self.start_local(entry.outpoint, entry.signing_key().clone()) {
                Ok(()) => started += 1,
                Err(err) => warn!(alias = %entry.alias, error = %err, "masternode failed to start"),
            }
        }
        started
    }

    /// Current liveness score of a tracked candidate, if scoring has
    /// started (post-sync) and the candidate is known.
    pub fn candidate_score(&mut self, outpoint: &OutPoint) -> Option<f64> {
        let initial_height = self.initial_height?;
        let chain = self.chain.clone();
        let ctx = ScoreContext {
            chain: chain.as_ref(),
            annex: &self.annex,
            initial_height,
        };
        self.registry.tracked_mut(outpoint).map(|mn| mn.score(&ctx))
    }
}
