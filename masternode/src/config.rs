//! Operator configuration for locally run masternodes.
//!
//! A `masternode.conf` names one masternode per line:
//!
//! ```text
//! alias privkey collateral_txid collateral_vout
//! ```
//!
//! Blank lines and `#` comments are skipped. Lines are validated as they
//! are read, so a loaded config only ever holds well-formed keys and
//! outpoints.

use ember_core::{Hash256, OutPoint};
use ember_crypto::PrivateKey;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MasternodeConfigError {
    #[error("line {line}: {problem}")]
    BadLine { line: usize, problem: EntryProblem },

    #[error("alias {0:?} appears more than once")]
    AliasReused(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What is wrong with a single config line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntryProblem {
    #[error("expected `alias privkey txid vout`, found {0} fields")]
    FieldCount(usize),

    #[error("privkey is not a valid hex-encoded signing key")]
    BadKey,

    #[error("collateral txid is not a 64-character hex hash")]
    BadTxid,

    #[error("output index {0:?} is not a number")]
    BadIndex(String),
}

/// One configured masternode: its alias, the signing key, and the staking
/// outpoint the key controls.
pub struct MasternodeConfigEntry {
    pub alias: String,
    pub outpoint: OutPoint,
    key: PrivateKey,
}

impl MasternodeConfigEntry {
    pub fn new(alias: impl Into<String>, key: PrivateKey, outpoint: OutPoint) -> Self {
        Self {
            alias: alias.into(),
            outpoint,
            key,
        }
    }

    pub fn signing_key(&self) -> &PrivateKey {
        &self.key
    }
}

impl FromStr for MasternodeConfigEntry {
    type Err = EntryProblem;

    fn from_str(s: &str) -> Result<Self, EntryProblem> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [alias, key_hex, txid_hex, vout] = fields[..] else {
            return Err(EntryProblem::FieldCount(fields.len()));
        };

        let key = PrivateKey::from_hex(key_hex).map_err(|_| EntryProblem::BadKey)?;
        let txid: Hash256 = txid_hex.parse().map_err(|_| EntryProblem::BadTxid)?;
        let vout: u32 = vout
            .parse()
            .map_err(|_| EntryProblem::BadIndex(vout.to_string()))?;

        Ok(Self {
            alias: alias.to_string(),
            outpoint: OutPoint::new(txid, vout),
            key,
        })
    }
}

impl fmt::Display for MasternodeConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.alias,
            self.key.to_hex(),
            self.outpoint.txid,
            self.outpoint.vout
        )
    }
}

impl fmt::Debug for MasternodeConfigEntry {
    // The signing key stays out of debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasternodeConfigEntry")
            .field("alias", &self.alias)
            .field("outpoint", &self.outpoint)
            .finish()
    }
}

/// The operator's masternode list, in file order.
#[derive(Debug, Default)]
pub struct MasternodeConfig {
    entries: Vec<MasternodeConfigEntry>,
}

impl MasternodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a config out of `masternode.conf` text.
    pub fn parse(content: &str) -> Result<Self, MasternodeConfigError> {
        let mut config = Self::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = line
                .parse()
                .map_err(|problem| MasternodeConfigError::BadLine {
                    line: idx + 1,
                    problem,
                })?;
            config.add(entry)?;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MasternodeConfigError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Write the config back out, one line per entry.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MasternodeConfigError> {
        let mut out = String::from("# alias privkey collateral_txid collateral_vout\n");
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Append an entry; aliases must be unique.
    pub fn add(&mut self, entry: MasternodeConfigEntry) -> Result<(), MasternodeConfigError> {
        if self.find(&entry.alias).is_some() {
            return Err(MasternodeConfigError::AliasReused(entry.alias));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn find(&self, alias: &str) -> Option<&MasternodeConfigEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    pub fn entries(&self) -> &[MasternodeConfigEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
