//! Gossiped masternode message types

use ember_core::{Hash256, OutPoint};
use ember_crypto::{sha256_concat, CompactSignature, CryptoError, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

/// Signed attestation that a masternode observed a block.
///
/// The signature covers the signing hash (outpoint, height, block hash);
/// the identity hash additionally covers the signature and is what relay
/// deduplication keys on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceMsg {
    pub outpoint: OutPoint,
    pub block_height: u32,
    pub block_hash: Hash256,
    pub signature: CompactSignature,
}

impl ExistenceMsg {
    /// Build and sign an attestation for the block at `height`/`hash`.
    pub fn signed(
        outpoint: OutPoint,
        block_height: u32,
        block_hash: Hash256,
        key: &PrivateKey,
    ) -> Result<Self, CryptoError> {
        let mut msg = Self {
            outpoint,
            block_height,
            block_hash,
            signature: CompactSignature::default(),
        };
        msg.signature = key.sign_digest(&msg.signing_hash())?;
        Ok(msg)
    }

    /// Digest the signature commits to; excludes the signature itself.
    pub fn signing_hash(&self) -> [u8; 32] {
        sha256_concat(&[
            self.outpoint.txid.as_bytes(),
            &self.outpoint.vout.to_le_bytes(),
            &self.block_height.to_le_bytes(),
            self.block_hash.as_bytes(),
        ])
    }

    /// Digest identifying this exact message, signature included.
    pub fn identity_hash(&self) -> Hash256 {
        Hash256::new(sha256_concat(&[
            self.outpoint.txid.as_bytes(),
            &self.outpoint.vout.to_le_bytes(),
            &self.block_height.to_le_bytes(),
            self.block_hash.as_bytes(),
            self.signature.as_bytes(),
        ]))
    }

    /// Recover the public key that signed this message.
    pub fn recover_signer(&self) -> Result<PublicKey, CryptoError> {
        self.signature.recover(&self.signing_hash())
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// An existence message together with its local admission time.
#[derive(Debug, Clone)]
pub struct ReceivedExistenceMsg {
    pub msg: ExistenceMsg,
    pub recv_time_ms: u64,
}

/// Outcome of admitting a gossiped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgVerdict {
    /// Newly admitted; relay to peers.
    Admitted,

    /// Dropped silently (duplicate or stale); no relay, no penalty.
    Ignored,

    /// Protocol violation; report the given score against the sender.
    Misbehaviour(u32),
}
