//! Wire protocol constants.

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Command carrying a masternode existence attestation.
pub const MSG_MASTERNODE_EXISTS: &str = "mnexists";
