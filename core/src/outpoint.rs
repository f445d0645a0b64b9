//! Transaction outpoint: the (txid, output index) pair identifying an
//! unspent output. Staking outpoints double as masternode identities, so
//! the ordering here (txid bytes, then index) is consensus-relevant for
//! payee rotation.

use crate::hash::Hash256;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub const fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutPoint({}:{})", self.txid, self.vout)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let txid_a = Hash256::new([1u8; 32]);
        let txid_b = Hash256::new([2u8; 32]);

        assert!(OutPoint::new(txid_a, 5) < OutPoint::new(txid_b, 0));
        assert!(OutPoint::new(txid_a, 0) < OutPoint::new(txid_a, 1));
    }

    #[test]
    fn test_display() {
        let op = OutPoint::new(Hash256::ZERO, 3);
        assert!(op.to_string().ends_with(":3"));
    }
}
