//! Per-match escrow accounting
//!
//! Balances are keyed by match id and only move through `credit`, the two
//! debit paths and `sweep_fees`. Debited value lands in the recipient's
//! settled account, so the whole ledger can be audited for conservation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::game::{Disbursement, DisbursementKind};
use crate::types::{Identity, MatchId};

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Split `amount` into (payout, fee). Fee rounds down and the rate is capped
/// at 100%, so `payout + fee == amount` always holds.
pub fn split_fee(amount: u64, fee_bps: u16) -> (u64, u64) {
    let bps = (fee_bps as u64).min(BPS_DENOMINATOR);
    let fee = (amount as u128 * bps as u128 / BPS_DENOMINATOR as u128) as u64;
    (amount - fee, fee)
}

/// Result of one debit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub match_id: MatchId,
    pub recipient: Identity,
    /// Amount taken from the match balance
    pub gross: u64,
    /// Amount credited to the recipient
    pub payout: u64,
    /// Amount accrued to the protocol pool
    pub fee: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EscrowLedger {
    fee_bps: u16,
    balances: BTreeMap<MatchId, u64>,
    settled: BTreeMap<Identity, u64>,
    fee_pool: u64,
    total_credited: u64,
    total_paid_out: u64,
    total_fees_swept: u64,
}

impl EscrowLedger {
    pub fn new(fee_bps: u16) -> Result<Self, ArenaError> {
        if fee_bps as u64 > BPS_DENOMINATOR {
            return Err(ArenaError::InvalidConfig(format!(
                "fee_bps {} exceeds {}",
                fee_bps, BPS_DENOMINATOR
            )));
        }
        Ok(Self {
            fee_bps,
            ..Self::default()
        })
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    pub fn balance_of(&self, match_id: MatchId) -> u64 {
        self.balances.get(&match_id).copied().unwrap_or(0)
    }

    /// Value already delivered to `identity` by payouts, refunds and sweeps
    pub fn settled_balance(&self, identity: &Identity) -> u64 {
        self.settled.get(identity).copied().unwrap_or(0)
    }

    pub fn fee_pool(&self) -> u64 {
        self.fee_pool
    }

    pub fn credit(&mut self, match_id: MatchId, amount: u64) -> Result<(), ArenaError> {
        let balance = self
            .balance_of(match_id)
            .checked_add(amount)
            .ok_or(ArenaError::Overflow)?;
        let total = self
            .total_credited
            .checked_add(amount)
            .ok_or(ArenaError::Overflow)?;
        self.balances.insert(match_id, balance);
        self.total_credited = total;
        Ok(())
    }

    /// Fails unless `match_id` holds at least `amount`
    pub fn ensure_covers(&self, match_id: MatchId, amount: u64) -> Result<(), ArenaError> {
        let available = self.balance_of(match_id);
        if available < amount {
            return Err(ArenaError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    pub fn debit_with_fee(
        &mut self,
        match_id: MatchId,
        recipient: Identity,
        amount: u64,
    ) -> Result<Settlement, ArenaError> {
        let (payout, fee) = split_fee(amount, self.fee_bps);
        self.debit(match_id, recipient, amount, payout, fee)
    }

    pub fn debit_no_fee(
        &mut self,
        match_id: MatchId,
        recipient: Identity,
        amount: u64,
    ) -> Result<Settlement, ArenaError> {
        self.debit(match_id, recipient, amount, amount, 0)
    }

    fn debit(
        &mut self,
        match_id: MatchId,
        recipient: Identity,
        gross: u64,
        payout: u64,
        fee: u64,
    ) -> Result<Settlement, ArenaError> {
        self.ensure_covers(match_id, gross)?;
        let remaining = self.balance_of(match_id) - gross;
        let settled = self
            .settled_balance(&recipient)
            .checked_add(payout)
            .ok_or(ArenaError::Overflow)?;
        let fee_pool = self.fee_pool.checked_add(fee).ok_or(ArenaError::Overflow)?;

        self.balances.insert(match_id, remaining);
        self.fee_pool = fee_pool;
        self.settled.insert(recipient, settled);
        self.total_paid_out += payout;
        Ok(Settlement {
            match_id,
            recipient,
            gross,
            payout,
            fee,
        })
    }

    /// Settle a batch of disbursements from one match all-or-nothing:
    /// the combined total is checked before the first debit.
    pub fn settle(&mut self, disbursements: &[Disbursement]) -> Result<Vec<Settlement>, ArenaError> {
        let mut per_match: BTreeMap<MatchId, u64> = BTreeMap::new();
        for d in disbursements {
            let entry = per_match.entry(d.match_id).or_insert(0);
            *entry = entry.checked_add(d.amount).ok_or(ArenaError::Overflow)?;
        }
        for (match_id, total) in &per_match {
            self.ensure_covers(*match_id, *total)?;
        }
        disbursements
            .iter()
            .map(|d| match d.kind {
                DisbursementKind::Payout => self.debit_with_fee(d.match_id, d.recipient, d.amount),
                DisbursementKind::Refund => self.debit_no_fee(d.match_id, d.recipient, d.amount),
            })
            .collect()
    }

    /// Pay the whole fee pool to `owner`; the pool is zeroed first
    pub fn sweep_fees(&mut self, owner: Identity) -> Result<u64, ArenaError> {
        let amount = self.fee_pool;
        if amount == 0 {
            return Err(ArenaError::NoFeesToSweep);
        }
        let settled = self
            .settled_balance(&owner)
            .checked_add(amount)
            .ok_or(ArenaError::Overflow)?;
        self.fee_pool = 0;
        self.total_fees_swept += amount;
        self.settled.insert(owner, settled);
        Ok(amount)
    }

    /// credits == match balances + fee pool + swept fees + payouts
    pub fn is_conserved(&self) -> bool {
        let held: u128 = self.balances.values().map(|b| *b as u128).sum();
        let accounted = held
            + self.fee_pool as u128
            + self.total_fees_swept as u128
            + self.total_paid_out as u128;
        accounted == self.total_credited as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WINNER: Identity = Identity([1; 32]);
    const OWNER: Identity = Identity([9; 32]);

    #[test]
    fn test_fee_split() {
        assert_eq!(split_fee(10_000, 250), (9_750, 250));
        assert_eq!(split_fee(99, 250), (97, 2));
        assert_eq!(split_fee(39, 250), (39, 0));
        assert_eq!(split_fee(u64::MAX, 10_000), (0, u64::MAX));
    }

    #[test]
    fn test_fee_rate_above_full_is_capped() {
        assert_eq!(split_fee(100, 20_000), (0, 100));
        assert_eq!(split_fee(100, u16::MAX), (0, 100));
    }

    #[test]
    fn test_ledger_rejects_fee_rate_above_full() {
        assert!(matches!(
            EscrowLedger::new(20_000),
            Err(ArenaError::InvalidConfig(_))
        ));
        let ledger = EscrowLedger::new(10_000).unwrap();
        assert_eq!(ledger.fee_bps(), 10_000);
    }

    #[test]
    fn test_payout_path_charges_fee() {
        let mut ledger = EscrowLedger::new(500).unwrap();
        ledger.credit(1, 1_000).unwrap();
        let s = ledger.debit_with_fee(1, WINNER, 1_000).unwrap();
        assert_eq!((s.payout, s.fee), (950, 50));
        assert_eq!(ledger.balance_of(1), 0);
        assert_eq!(ledger.fee_pool(), 50);
        assert_eq!(ledger.settled_balance(&WINNER), 950);
        assert!(ledger.is_conserved());
    }

    #[test]
    fn test_refund_path_is_fee_free() {
        let mut ledger = EscrowLedger::new(500).unwrap();
        ledger.credit(1, 300).unwrap();
        let s = ledger.debit_no_fee(1, WINNER, 300).unwrap();
        assert_eq!((s.payout, s.fee), (300, 0));
        assert_eq!(ledger.fee_pool(), 0);
    }

    #[test]
    fn test_overdraw_rejected_without_effect() {
        let mut ledger = EscrowLedger::new(500).unwrap();
        ledger.credit(1, 100).unwrap();
        assert_eq!(
            ledger.debit_with_fee(1, WINNER, 101),
            Err(ArenaError::InsufficientBalance { available: 100, requested: 101 })
        );
        assert_eq!(ledger.balance_of(1), 100);
        assert_eq!(ledger.settled_balance(&WINNER), 0);
    }

    #[test]
    fn test_balances_are_per_match() {
        let mut ledger = EscrowLedger::new(0).unwrap();
        ledger.credit(1, 100).unwrap();
        ledger.credit(2, 50).unwrap();
        assert!(ledger.debit_no_fee(2, WINNER, 60).is_err());
        assert_eq!(ledger.balance_of(1), 100);
    }

    #[test]
    fn test_settle_is_all_or_nothing() {
        let mut ledger = EscrowLedger::new(0).unwrap();
        ledger.credit(1, 150).unwrap();
        let batch = [
            Disbursement { match_id: 1, recipient: WINNER, amount: 100, kind: DisbursementKind::Refund },
            Disbursement { match_id: 1, recipient: OWNER, amount: 100, kind: DisbursementKind::Refund },
        ];
        assert!(ledger.settle(&batch).is_err());
        assert_eq!(ledger.balance_of(1), 150);
        assert_eq!(ledger.settled_balance(&WINNER), 0);
    }

    #[test]
    fn test_sweep_zeroes_pool_once() {
        let mut ledger = EscrowLedger::new(1_000).unwrap();
        ledger.credit(1, 1_000).unwrap();
        ledger.debit_with_fee(1, WINNER, 1_000).unwrap();
        assert_eq!(ledger.sweep_fees(OWNER), Ok(100));
        assert_eq!(ledger.fee_pool(), 0);
        assert_eq!(ledger.settled_balance(&OWNER), 100);
        assert_eq!(ledger.sweep_fees(OWNER), Err(ArenaError::NoFeesToSweep));
        assert!(ledger.is_conserved());
    }

    proptest! {
        #[test]
        fn prop_fee_split_conserves(amount in any::<u64>(), fee_bps in 0u16..=10_000) {
            let (payout, fee) = split_fee(amount, fee_bps);
            prop_assert_eq!(payout as u128 + fee as u128, amount as u128);
        }

        #[test]
        fn prop_ledger_conserves_value(
            deposits in prop::collection::vec((0u64..4, 1u64..1_000_000), 1..20),
            fee_bps in 0u16..=10_000,
        ) {
            let mut ledger = EscrowLedger::new(fee_bps).unwrap();
            for (match_id, amount) in &deposits {
                ledger.credit(*match_id, *amount).unwrap();
            }
            for match_id in 0..4u64 {
                let balance = ledger.balance_of(match_id);
                let half = balance / 2;
                ledger.debit_with_fee(match_id, WINNER, half).unwrap();
                ledger.debit_no_fee(match_id, WINNER, balance - half).unwrap();
                prop_assert_eq!(ledger.balance_of(match_id), 0);
            }
            let _ = ledger.sweep_fees(OWNER);
            prop_assert!(ledger.is_conserved());
        }
    }
}
