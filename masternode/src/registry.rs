//! Masternode registry: every candidate this node currently tracks.
//!
//! The registry is read-through over the coin view. A candidate exists
//! only while its staking outpoint passes the acceptability predicate
//! (unspent, confirmed, large enough, key id extractable); entries that
//! stop passing are dropped by the periodic prune. Candidates are never
//! synthesised from untrusted input alone.

use crate::candidate::Masternode;
use crate::error::MasternodeError;
use crate::params::{MasternodeParams, MIN_CONFIRMATIONS};
use ember_core::{CoinView, OutPoint};
use ember_crypto::{extract_key_id, KeyId, PrivateKey};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Default)]
pub struct MasternodeRegistry {
    masternodes: BTreeMap<OutPoint, Masternode>,

    /// Signing keys for the candidates this node operates.
    local_keys: BTreeMap<OutPoint, PrivateKey>,
}

impl MasternodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The acceptability predicate: resolve `outpoint` to the key id and
    /// value of a mature, sufficiently large staking output.
    pub fn staking_entry(
        coins: &dyn CoinView,
        outpoint: &OutPoint,
        min_stake: u64,
    ) -> Option<(KeyId, u64)> {
        let utxo = coins.unspent_output(outpoint)?;
        if utxo.confirmations < MIN_CONFIRMATIONS {
            return None;
        }
        if utxo.value < min_stake {
            return None;
        }
        let key_id = extract_key_id(&utxo.script_pubkey)?;
        Some((key_id, utxo.value))
    }

    /// Look up a candidate, admitting it from the coin view on first
    /// sight. Returns `None` when the outpoint is not an acceptable
    /// staking output.
    pub fn get(
        &mut self,
        outpoint: &OutPoint,
        coins: &dyn CoinView,
        params: &MasternodeParams,
    ) -> Option<&mut Masternode> {
        if !self.masternodes.contains_key(outpoint) {
            let (key_id, amount) = Self::staking_entry(coins, outpoint, params.min_stake)?;
            let mut mn = Masternode::new(*outpoint, key_id, amount);
            if let Some(key) = self.local_keys.get(outpoint) {
                mn.signing_key = Some(key.clone());
            }
            debug!(%outpoint, amount, "masternode candidate admitted");
            self.masternodes.insert(*outpoint, mn);
        }
        self.masternodes.get_mut(outpoint)
    }

    /// Look up without admission.
    pub fn peek(&self, outpoint: &OutPoint) -> Option<&Masternode> {
        self.masternodes.get(outpoint)
    }

    pub(crate) fn tracked_mut(&mut self, outpoint: &OutPoint) -> Option<&mut Masternode> {
        self.masternodes.get_mut(outpoint)
    }

    /// Re-run the acceptability predicate over every entry, dropping
    /// candidates whose staking output no longer qualifies.
    pub fn prune(&mut self, coins: &dyn CoinView, params: &MasternodeParams) {
        let before = self.masternodes.len();
        self.masternodes
            .retain(|outpoint, _| Self::staking_entry(coins, outpoint, params.min_stake).is_some());
        let dropped = before - self.masternodes.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.masternodes.len(), "masternode registry pruned");
        }
    }

    /// Mark a candidate as locally operated and attach its signing key.
    pub fn set_local(
        &mut self,
        outpoint: OutPoint,
        key: PrivateKey,
        coins: &dyn CoinView,
        params: &MasternodeParams,
    ) -> Result<(), MasternodeError> {
        let mn = self
            .get(&outpoint, coins, params)
            .ok_or(MasternodeError::UnknownCandidate(outpoint))?;
        if key.public_key().key_id() != mn.key_id {
            return Err(MasternodeError::KeyMismatch(outpoint));
        }
        mn.signing_key = Some(key.clone());
        self.local_keys.insert(outpoint, key);
        Ok(())
    }

    /// Detach the signing key; the candidate stays tracked.
    pub fn clear_local(&mut self, outpoint: &OutPoint) {
        self.local_keys.remove(outpoint);
        if let Some(mn) = self.masternodes.get_mut(outpoint) {
            mn.signing_key = None;
        }
    }

    pub fn local_outpoints(&self) -> Vec<OutPoint> {
        self.local_keys.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.masternodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masternodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Masternode> {
        self.masternodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Masternode> {
        self.masternodes.values_mut()
    }
}
