//! Peer handles and the shared peer list.
//!
//! Each peer remembers which inventory hashes it has already seen so a
//! message is pushed at most once per peer pair, and accumulates a
//! misbehaviour score that bans the peer once it crosses the threshold.

use ember_core::Hash256;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Accumulated misbehaviour score at which a peer is banned.
pub const BAN_THRESHOLD: u32 = 100;

/// A connected peer as seen by the masternode core.
pub trait Peer: Send + Sync {
    /// Stable identifier, usually the remote address.
    fn id(&self) -> &str;

    /// Record `hash` as known to this peer. Returns `true` if it was not
    /// known before (i.e. the caller should push the message).
    fn mark_known(&self, hash: &Hash256) -> bool;

    /// Queue a wire message for this peer.
    fn send_message(&self, command: &str, payload: &[u8]);

    /// Report protocol misbehaviour observed from this peer.
    fn misbehaving(&self, score: u32);
}

/// The shared peer list. The mutex here is the only lock the masternode
/// core ever takes; it is held for the duration of a relay broadcast.
#[derive(Default)]
pub struct PeerSet {
    peers: Mutex<Vec<Arc<dyn Peer>>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, peer: Arc<dyn Peer>) {
        self.peers.lock().unwrap().push(peer);
    }

    pub fn remove(&self, id: &str) {
        self.peers.lock().unwrap().retain(|p| p.id() != id);
    }

    pub fn len(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `payload` to every peer that has not yet seen `inv`,
    /// recording it as seen. Returns how many peers were sent to.
    pub fn relay(&self, inv: &Hash256, command: &str, payload: &[u8]) -> usize {
        let peers = self.peers.lock().unwrap();
        let mut sent = 0;
        for peer in peers.iter() {
            if peer.mark_known(inv) {
                peer.send_message(command, payload);
                sent += 1;
            }
        }
        sent
    }
}

/// Reference [`Peer`] implementation buffering outbound messages for the
/// host's socket writer to drain. Also used throughout the tests.
pub struct BufferedPeer {
    id: String,
    known: Mutex<HashSet<Hash256>>,
    score: Mutex<u32>,
    outbox: Mutex<Vec<(String, Vec<u8>)>>,
}

impl BufferedPeer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            known: Mutex::new(HashSet::new()),
            score: Mutex::new(0),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Drain queued outbound messages.
    pub fn take_messages(&self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.outbox.lock().unwrap())
    }

    pub fn queued_messages(&self) -> usize {
        self.outbox.lock().unwrap().len()
    }

    pub fn misbehaviour_score(&self) -> u32 {
        *self.score.lock().unwrap()
    }

    pub fn is_banned(&self) -> bool {
        self.misbehaviour_score() >= BAN_THRESHOLD
    }
}

impl Peer for BufferedPeer {
    fn id(&self) -> &str {
        &self.id
    }

    fn mark_known(&self, hash: &Hash256) -> bool {
        self.known.lock().unwrap().insert(*hash)
    }

    fn send_message(&self, command: &str, payload: &[u8]) {
        self.outbox
            .lock()
            .unwrap()
            .push((command.to_string(), payload.to_vec()));
    }

    fn misbehaving(&self, score: u32) {
        let mut total = self.score.lock().unwrap();
        *total += score;
        if *total >= BAN_THRESHOLD {
            warn!(peer = %self.id, score = *total, "peer banned for misbehaviour");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MSG_MASTERNODE_EXISTS;

    #[test]
    fn test_mark_known_deduplicates() {
        let peer = BufferedPeer::new("127.0.0.1:7777");
        let hash = Hash256::sha256(b"inv");

        assert!(peer.mark_known(&hash));
        assert!(!peer.mark_known(&hash));
    }

    #[test]
    fn test_relay_once_per_peer() {
        let set = PeerSet::new();
        let a = Arc::new(BufferedPeer::new("a"));
        let b = Arc::new(BufferedPeer::new("b"));
        set.add(a.clone());
        set.add(b.clone());

        let inv = Hash256::sha256(b"msg");
        assert_eq!(set.relay(&inv, MSG_MASTERNODE_EXISTS, b"payload"), 2);
        assert_eq!(set.relay(&inv, MSG_MASTERNODE_EXISTS, b"payload"), 0);

        assert_eq!(a.queued_messages(), 1);
        assert_eq!(b.queued_messages(), 1);
    }

    #[test]
    fn test_relay_skips_already_known() {
        let set = PeerSet::new();
        let a = Arc::new(BufferedPeer::new("a"));
        set.add(a.clone());

        let inv = Hash256::sha256(b"msg");
        a.mark_known(&inv);
        assert_eq!(set.relay(&inv, MSG_MASTERNODE_EXISTS, b"payload"), 0);
        assert_eq!(a.queued_messages(), 0);
    }

    #[test]
    fn test_ban_threshold() {
        let peer = BufferedPeer::new("bad");
        peer.misbehaving(20);
        assert!(!peer.is_banned());

        peer.misbehaving(100);
        assert!(peer.is_banned());
        assert_eq!(peer.misbehaviour_score(), 120);
    }

    #[test]
    fn test_remove_peer() {
        let set = PeerSet::new();
        set.add(Arc::new(BufferedPeer::new("a")));
        set.add(Arc::new(BufferedPeer::new("b")));
        set.remove("a");
        assert_eq!(set.len(), 1);
    }
}
