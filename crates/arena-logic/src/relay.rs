//! Gas sponsorship for relayed withdrawals
//!
//! Players pre-fund a pool; the designated relay submits withdrawals on their
//! behalf and is paid a fixed fee out of that pool per successful call.

use std::collections::BTreeMap;

use crate::error::ArenaError;
use crate::escrow::Settlement;
use crate::types::Identity;

#[derive(Clone, Debug)]
pub struct GasSponsorship {
    relay: Identity,
    relay_fee: u64,
    pools: BTreeMap<Identity, u64>,
    relay_earnings: u64,
}

impl GasSponsorship {
    pub fn new(relay: Identity, relay_fee: u64) -> Self {
        Self {
            relay,
            relay_fee,
            pools: BTreeMap::new(),
            relay_earnings: 0,
        }
    }

    pub fn relay(&self) -> Identity {
        self.relay
    }

    pub fn relay_fee(&self) -> u64 {
        self.relay_fee
    }

    pub fn pool_of(&self, owner: &Identity) -> u64 {
        self.pools.get(owner).copied().unwrap_or(0)
    }

    pub fn relay_earnings(&self) -> u64 {
        self.relay_earnings
    }

    pub fn fund(&mut self, owner: Identity, amount: u64) -> Result<u64, ArenaError> {
        if owner.is_zero() {
            return Err(ArenaError::InvalidRecipient);
        }
        let balance = self
            .pool_of(&owner)
            .checked_add(amount)
            .ok_or(ArenaError::Overflow)?;
        self.pools.insert(owner, balance);
        Ok(balance)
    }

    pub fn require_relay(&self, caller: &Identity) -> Result<(), ArenaError> {
        if *caller != self.relay {
            return Err(ArenaError::Unauthorized("relay"));
        }
        Ok(())
    }

    /// Fails unless `owner`'s pool can pay one relayed withdrawal
    pub fn ensure_funded(&self, owner: &Identity) -> Result<(), ArenaError> {
        let available = self.pool_of(owner);
        if available < self.relay_fee {
            return Err(ArenaError::InsufficientGas {
                available,
                required: self.relay_fee,
            });
        }
        Ok(())
    }

    /// Move one relay fee from `owner`'s pool to the relay
    pub fn charge(&mut self, owner: &Identity) -> Result<u64, ArenaError> {
        self.ensure_funded(owner)?;
        let remaining = self.pool_of(owner) - self.relay_fee;
        self.pools.insert(*owner, remaining);
        self.relay_earnings = self
            .relay_earnings
            .checked_add(self.relay_fee)
            .ok_or(ArenaError::Overflow)?;
        Ok(self.relay_fee)
    }
}

/// Aggregate of a continue-on-error relay batch
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Per item, in submission order
    pub outcomes: Vec<Result<Settlement, ArenaError>>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: Result<Settlement, ArenaError>) {
        if outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}
