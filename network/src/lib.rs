//! Ember Coin network-side abstractions used by the masternode core.
//!
//! The socket layer itself lives with the host; this crate defines the
//! peer handle the core relays through, the shared peer list with its
//! single mutex, and the wire command names.

pub mod peer;
pub mod protocol;

pub use peer::{BufferedPeer, Peer, PeerSet, BAN_THRESHOLD};
pub use protocol::{MSG_MASTERNODE_EXISTS, PROTOCOL_VERSION};
