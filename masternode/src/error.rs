//! Masternode error types

use crate::config::MasternodeConfigError;
use ember_core::OutPoint;
use ember_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MasternodeError {
    #[error("unknown candidate: {0}")]
    UnknownCandidate(OutPoint),

    #[error("signing key does not control the staking output {0}")]
    KeyMismatch(OutPoint),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("config error: {0}")]
    Config(#[from] MasternodeConfigError),
}

pub type Result<T> = std::result::Result<T, MasternodeError>;
