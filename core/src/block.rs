//! Block model as seen by the masternode core.
//!
//! Only the fields the coordination layer consumes are modelled here: the
//! chain linkage plus the two vote slots and the payee slot each block
//! carries. Transactions and headers stay with the host block store.

use crate::hash::Hash256;
use crate::outpoint::OutPoint;
use serde::{Deserialize, Serialize};

/// Index into [`Block::votes`] for votes adding a masternode.
pub const VOTE_ADD: usize = 0;

/// Index into [`Block::votes`] for votes removing a masternode.
pub const VOTE_REMOVE: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub height: u32,
    pub hash: Hash256,
    pub parent: Hash256,

    /// Masternode votes embedded by the block producer:
    /// `votes[VOTE_ADD]` and `votes[VOTE_REMOVE]`.
    pub votes: [Vec<OutPoint>; 2],

    /// The masternode paid by this block's coinbase, if any.
    pub payee: Option<OutPoint>,
}

impl Block {
    pub fn new(height: u32, hash: Hash256, parent: Hash256) -> Self {
        Self {
            height,
            hash,
            parent,
            votes: [Vec::new(), Vec::new()],
            payee: None,
        }
    }

    pub fn with_votes(mut self, adds: Vec<OutPoint>, removes: Vec<OutPoint>) -> Self {
        self.votes = [adds, removes];
        self
    }
}
