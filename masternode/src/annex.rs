//! Per-block bookkeeping owned by the masternode core.
//!
//! The host's block index is not annotated directly; instead the core
//! keeps this side table keyed by block hash. It holds the first-seen
//! receive time, the election mutations a connect actually applied (the
//! undo log for disconnect), and the payee selected for the block.

use ember_core::{Hash256, OutPoint};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BlockAnnex {
    /// Monotone first-seen time in milliseconds; zero until stamped.
    pub recv_time_ms: u64,

    /// Outpoints actually added / removed from the elected set when the
    /// block was connected.
    pub applied: [Vec<OutPoint>; 2],

    /// Payee chosen when the block was connected.
    pub selected_payee: Option<OutPoint>,
}

#[derive(Default)]
pub struct AnnexTable {
    entries: HashMap<Hash256, BlockAnnex>,
}

impl AnnexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &Hash256) -> Option<&BlockAnnex> {
        self.entries.get(hash)
    }

    /// Receive time for a block; zero when never stamped.
    pub fn recv_time(&self, hash: &Hash256) -> u64 {
        self.entries.get(hash).map(|a| a.recv_time_ms).unwrap_or(0)
    }

    /// Stamp the receive time, once. Returns `false` if already stamped.
    pub fn stamp_recv_time(&mut self, hash: &Hash256, now_ms: u64) -> bool {
        let annex = self.entries.entry(*hash).or_default();
        if annex.recv_time_ms != 0 {
            return false;
        }
        annex.recv_time_ms = now_ms;
        true
    }

    pub fn set_applied(&mut self, hash: &Hash256, applied: [Vec<OutPoint>; 2]) {
        self.entries.entry(*hash).or_default().applied = applied;
    }

    /// Remove and return the applied-election undo log for a block.
    pub fn take_applied(&mut self, hash: &Hash256) -> [Vec<OutPoint>; 2] {
        match self.entries.get_mut(hash) {
            Some(annex) => std::mem::take(&mut annex.applied),
            None => [Vec::new(), Vec::new()],
        }
    }

    pub fn set_payee(&mut self, hash: &Hash256, payee: Option<OutPoint>) {
        self.entries.entry(*hash).or_default().selected_payee = payee;
    }

    pub fn payee(&self, hash: &Hash256) -> Option<OutPoint> {
        self.entries.get(hash).and_then(|a| a.selected_payee)
    }

    pub fn clear_payee(&mut self, hash: &Hash256) {
        if let Some(annex) = self.entries.get_mut(hash) {
            annex.selected_payee = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_is_write_once() {
        let mut table = AnnexTable::new();
        let hash = Hash256::sha256(b"block");

        assert_eq!(table.recv_time(&hash), 0);
        assert!(table.stamp_recv_time(&hash, 1_000));
        assert!(!table.stamp_recv_time(&hash, 2_000));
        assert_eq!(table.recv_time(&hash), 1_000);
    }

    #[test]
    fn test_take_applied_clears() {
        let mut table = AnnexTable::new();
        let hash = Hash256::sha256(b"block");
        let op = OutPoint::new(Hash256::sha256(b"tx"), 0);

        table.set_applied(&hash, [vec![op], vec![]]);
        let applied = table.take_applied(&hash);
        assert_eq!(applied[0], vec![op]);

        let again = table.take_applied(&hash);
        assert!(again[0].is_empty() && again[1].is_empty());
    }

    #[test]
    fn test_payee_roundtrip() {
        let mut table = AnnexTable::new();
        let hash = Hash256::sha256(b"block");
        let op = OutPoint::new(Hash256::sha256(b"tx"), 1);

        assert_eq!(table.payee(&hash), None);
        table.set_payee(&hash, Some(op));
        assert_eq!(table.payee(&hash), Some(op));
        table.clear_payee(&hash);
        assert_eq!(table.payee(&hash), None);
    }
}
