//! Identifiers shared across the arena

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a match in the registry arena
pub type MatchId = u64;

/// Identifier handed out by a randomness oracle
pub type RequestId = u64;

/// Account identity (a 32-byte public key on chain)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for Identity {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short hex prefix is enough to tell players apart in logs
        for b in &self.0[..6] {
            write!(f, "{:02x}", b)?;
        }
        f.write_str("..")
    }
}

/// Deposited asset, resolved to settlement units by a `ValueNormalizer`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
