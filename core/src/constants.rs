//! Network-wide constants

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Hard cap on total supply, in base units.
pub const MAX_MONEY: u64 = 42_000_000 * COIN;
