//! A tracked masternode candidate: its liveness log and score.

use crate::annex::AnnexTable;
use crate::params::{
    MAX_TRACKED_MSGS, MISBEHAVING_SCORE, MONITORING_PERIOD, PENALTY_TIME, SCORE_STALE_BLOCKS,
};
use crate::schedule::existence_blocks;
use crate::types::{ExistenceMsg, MsgVerdict, ReceivedExistenceMsg};
use ember_core::{ChainView, OutPoint};
use ember_crypto::{KeyId, PrivateKey};

/// Inputs scoring needs besides the candidate itself.
pub struct ScoreContext<'a> {
    pub chain: &'a dyn ChainView,
    pub annex: &'a AnnexTable,

    /// Tip height at the end of initial sync. Challenge blocks at or below
    /// it have no receive time and are excluded from scoring.
    pub initial_height: u32,
}

/// Registry entry for a known masternode candidate.
pub struct Masternode {
    pub outpoint: OutPoint,
    pub key_id: KeyId,

    /// Staked value in base units.
    pub amount: u64,

    /// Present while this node operates the candidate and it is started.
    pub signing_key: Option<PrivateKey>,

    /// Admitted existence messages, insertion-ordered.
    pub existence_msgs: Vec<ReceivedExistenceMsg>,

    /// Sticky: once a candidate floods us, it scores maximally bad until
    /// the registry drops it.
    pub misbehaving: bool,

    cached_score: f64,
    score_height: Option<u32>,
}

impl Masternode {
    pub fn new(outpoint: OutPoint, key_id: KeyId, amount: u64) -> Self {
        Self {
            outpoint,
            key_id,
            amount,
            signing_key: None,
            existence_msgs: Vec::new(),
            misbehaving: false,
            cached_score: 0.0,
            score_height: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Admit an existence message into the liveness log.
    ///
    /// `tip_height` bounds the staleness cleanup; `now_ms` is the monotone
    /// admission timestamp recorded with the message.
    pub fn add_existence_msg(
        &mut self,
        msg: ExistenceMsg,
        tip_height: u32,
        now_ms: u64,
    ) -> MsgVerdict {
        let identity = msg.identity_hash();
        if self
            .existence_msgs
            .iter()
            .any(|rec| rec.msg.identity_hash() == identity)
        {
            return MsgVerdict::Ignored;
        }

        self.cleanup(tip_height);

        // A candidate with a full log is flooding the network.
        if self.existence_msgs.len() >= MAX_TRACKED_MSGS {
            self.misbehaving = true;
            return MsgVerdict::Misbehaviour(20);
        }

        self.existence_msgs.push(ReceivedExistenceMsg {
            msg,
            recv_time_ms: now_ms,
        });
        MsgVerdict::Admitted
    }

    /// Drop log entries older than the monitoring horizon.
    fn cleanup(&mut self, tip_height: u32) {
        self.existence_msgs
            .retain(|rec| rec.msg.block_height + 2 * MONITORING_PERIOD >= tip_height);
    }

    /// Current liveness score; lower is better. Refreshes the memoised
    /// value once the tip has moved [`SCORE_STALE_BLOCKS`] past the last
    /// refresh.
    pub fn score(&mut self, ctx: &ScoreContext<'_>) -> f64 {
        let tip = ctx.chain.tip_height();
        let stale = match self.score_height {
            Some(height) => (height as i64) < tip as i64 - SCORE_STALE_BLOCKS as i64,
            None => true,
        };
        if stale {
            self.update_score(ctx);
            self.score_height = Some(tip);
        }
        self.cached_score
    }

    fn update_score(&mut self, ctx: &ScoreContext<'_>) {
        if self.misbehaving {
            self.cached_score = MISBEHAVING_SCORE;
            return;
        }

        let mut score = 0.0;
        let mut counted = 0u32;

        for height in existence_blocks(ctx.chain, &self.outpoint) {
            if height <= ctx.initial_height {
                continue;
            }
            let Some(block) = ctx.chain.block_at_height(height) else {
                continue;
            };
            counted += 1;

            let block_recv = ctx.annex.recv_time(&block.hash);
            let mut delta = PENALTY_TIME;
            for rec in &self.existence_msgs {
                if rec.msg.block_height == block.height && rec.msg.block_hash == block.hash {
                    if block_recv == 0 || rec.recv_time_ms < block_recv {
                        // Attestation arrived before the block did.
                        delta = 0.0;
                    } else {
                        delta = (rec.recv_time_ms - block_recv) as f64 / 1000.0;
                    }
                    break;
                }
            }
            score += delta;
        }

        if counted != 0 {
            score /= counted as f64;
        }
        self.cached_score = score;
    }
}
