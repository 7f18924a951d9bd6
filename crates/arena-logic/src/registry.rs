//! Match registry and dispatch
//!
//! Owns every match (an arena indexed by match id), the randomness request
//! table, the escrow ledger and the gas sponsorship pools. Each mutating
//! operation runs under the match's non-reentrant flag and follows the same
//! order: stage the transition on a copy, check the ledger covers whatever it
//! pays out, commit the match record, then settle value.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::config::ArenaConfig;
use crate::deposit::{DepositRouter, PriceFeed, PriceFeedNormalizer, SwapExecutor};
use crate::error::ArenaError;
use crate::escrow::{EscrowLedger, Settlement};
use crate::game::{Disbursement, Match, MoveOutcome, RoundAdvance};
use crate::oracle::RandomnessOracle;
use crate::relay::{BatchReport, GasSponsorship};
use crate::types::{AssetId, Identity, MatchId, RequestId};

pub struct MatchRegistry<O> {
    config: ArenaConfig,
    matches: Vec<Match>,
    requests: BTreeMap<RequestId, MatchId>,
    locked: BTreeSet<MatchId>,
    ledger: EscrowLedger,
    gas: GasSponsorship,
    prices: PriceFeedNormalizer,
    oracle: O,
}

fn owed_from(advance: &RoundAdvance) -> Vec<Disbursement> {
    match advance {
        RoundAdvance::Cancelled { refunds } => refunds.clone(),
        _ => Vec::new(),
    }
}

fn single(settlements: Vec<Settlement>) -> Result<Settlement, ArenaError> {
    settlements
        .into_iter()
        .next()
        .ok_or(ArenaError::NothingToWithdraw)
}

impl<O: RandomnessOracle> MatchRegistry<O> {
    pub fn new(config: ArenaConfig, oracle: O) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            ledger: EscrowLedger::new(config.house_fee_bps)?,
            gas: GasSponsorship::new(config.relay, config.relay_fee),
            prices: PriceFeedNormalizer::new(config.max_price_age_secs),
            config,
            matches: Vec::new(),
            requests: BTreeMap::new(),
            locked: BTreeSet::new(),
            oracle,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    pub fn gas(&self) -> &GasSponsorship {
        &self.gas
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn set_price_feed(&mut self, asset: AssetId, feed: PriceFeed) {
        debug!(asset = asset.0, price = feed.price, updated_at = feed.updated_at, "price feed updated");
        self.prices.set_feed(asset, feed);
    }

    fn index(&self, id: MatchId) -> Result<usize, ArenaError> {
        usize::try_from(id)
            .ok()
            .filter(|idx| *idx < self.matches.len())
            .ok_or(ArenaError::MatchNotFound(id))
    }

    /// Run `op` holding `id`'s non-reentrant flag; released on every exit path
    fn guarded<T>(
        &mut self,
        id: MatchId,
        op: impl FnOnce(&mut Self) -> Result<T, ArenaError>,
    ) -> Result<T, ArenaError> {
        self.index(id)?;
        if !self.locked.insert(id) {
            return Err(ArenaError::Reentrant(id));
        }
        let result = op(self);
        self.locked.remove(&id);
        result
    }

    fn transact<T>(
        &mut self,
        id: MatchId,
        transition: impl FnOnce(&mut Match) -> Result<(T, Vec<Disbursement>), ArenaError>,
    ) -> Result<(T, Vec<Settlement>), ArenaError> {
        self.guarded(id, move |reg| {
            let idx = reg.index(id)?;
            let mut staged = reg.matches[idx].clone();
            let (value, owed) = transition(&mut staged)?;
            let total = owed
                .iter()
                .try_fold(0u64, |acc, d| acc.checked_add(d.amount))
                .ok_or(ArenaError::Overflow)?;
            reg.ledger.ensure_covers(id, total)?;

            // Flags and state are committed before any value leaves escrow
            reg.matches[idx] = staged;
            let settlements = reg.ledger.settle(&owed)?;
            for s in &settlements {
                info!(
                    match_id = id,
                    recipient = %s.recipient,
                    payout = s.payout,
                    fee = s.fee,
                    "escrow settled"
                );
            }
            Ok((value, settlements))
        })
    }

    pub fn create_match(&mut self, now: i64) -> MatchId {
        let id = self.matches.len() as MatchId;
        let created = Match::new(id, self.config.match_rules(), now);
        info!(
            match_id = id,
            deadline = created.auto_refund_deadline,
            "match created"
        );
        self.matches.push(created);
        id
    }

    /// Join with a stake already expressed in settlement units
    pub fn join(&mut self, id: MatchId, caller: Identity, value: u64) -> Result<(), ArenaError> {
        self.guarded(id, |reg| {
            let idx = reg.index(id)?;
            let mut staged = reg.matches[idx].clone();
            staged.join(caller, value)?;
            reg.ledger.credit(id, value)?;
            reg.matches[idx] = staged;
            info!(
                match_id = id,
                player = %caller,
                value,
                state = ?reg.matches[idx].state,
                "player joined"
            );
            Ok(())
        })
    }

    /// Join with an arbitrary asset, converted to settlement units first.
    /// The join is validated before anything is swapped; the deposit is priced
    /// from the registry's feeds and held to the configured slippage bound.
    pub fn join_with_asset<S: SwapExecutor>(
        &mut self,
        id: MatchId,
        caller: Identity,
        asset: AssetId,
        amount: u64,
        swapper: &mut S,
        now: i64,
    ) -> Result<u64, ArenaError> {
        let idx = self.index(id)?;
        self.matches[idx].ensure_joinable(&caller)?;
        let value = DepositRouter::new(&self.prices, swapper, self.config.max_slippage_bps)
            .settle_deposit(asset, amount, now)?;
        self.join(id, caller, value)?;
        Ok(value)
    }

    /// Lock the roster and request randomness for the first starter
    pub fn start(&mut self, id: MatchId) -> Result<RequestId, ArenaError> {
        self.guarded(id, |reg| {
            let idx = reg.index(id)?;
            let mut staged = reg.matches[idx].clone();
            staged.start()?;
            let request_id = reg.oracle.request(id)?;
            reg.requests.insert(request_id, id);
            reg.matches[idx] = staged;
            info!(match_id = id, request_id, "randomness requested");
            Ok(request_id)
        })
    }

    /// Out-of-band randomness delivery from the oracle
    pub fn fulfill_randomness(
        &mut self,
        caller: Identity,
        request_id: RequestId,
        word: u64,
        now: i64,
    ) -> Result<(), ArenaError> {
        if caller != self.config.oracle {
            return Err(ArenaError::Unauthorized("oracle"));
        }
        let id = *self
            .requests
            .get(&request_id)
            .ok_or(ArenaError::UnknownRequest(request_id))?;
        let result = self.transact(id, |m| {
            let starter = m.on_randomness(word, now)?;
            Ok((starter, Vec::new()))
        });
        match result {
            Ok((starter, _)) => {
                info!(match_id = id, request_id, starter, "match in progress");
                Ok(())
            }
            Err(e) => {
                warn!(match_id = id, request_id, error = %e, "randomness rejected");
                Err(e)
            }
        }
    }

    pub fn make_move(
        &mut self,
        id: MatchId,
        caller: Identity,
        x: usize,
        y: usize,
        now: i64,
    ) -> Result<MoveOutcome, ArenaError> {
        let (outcome, _) = self.transact(id, |m| {
            let outcome = m.play(&caller, x, y, now)?;
            let owed = match &outcome {
                MoveOutcome::RoundOver { advance, .. } => owed_from(advance),
                MoveOutcome::Continue { .. } => Vec::new(),
            };
            Ok((outcome, owed))
        })?;
        debug!(match_id = id, player = %caller, x, y, "move accepted");
        if let MoveOutcome::RoundOver { result, advance } = &outcome {
            info!(match_id = id, ?result, ?advance, "round over");
        }
        Ok(outcome)
    }

    pub fn claim_timeout_win(
        &mut self,
        id: MatchId,
        caller: Identity,
        now: i64,
    ) -> Result<RoundAdvance, ArenaError> {
        let (advance, _) = self.transact(id, |m| {
            let advance = m.claim_timeout_win(&caller, now)?;
            let owed = owed_from(&advance);
            Ok((advance, owed))
        })?;
        info!(match_id = id, claimant = %caller, ?advance, "timeout win claimed");
        Ok(advance)
    }

    /// Winner collects every unwithdrawn deposit, less the protocol fee
    pub fn withdraw_prize(&mut self, id: MatchId, caller: Identity) -> Result<Settlement, ArenaError> {
        let (_, settlements) = self.transact(id, |m| {
            let owed = m.withdraw_prize(&caller)?;
            Ok(((), vec![owed]))
        })?;
        single(settlements)
    }

    pub fn withdraw_my_stake(
        &mut self,
        id: MatchId,
        caller: Identity,
    ) -> Result<Settlement, ArenaError> {
        let (_, settlements) = self.transact(id, |m| {
            let owed = m.withdraw_stake(&caller)?;
            Ok(((), vec![owed]))
        })?;
        single(settlements)
    }

    /// Anyone may cancel a match once its deadline passes
    pub fn auto_refund_expired(
        &mut self,
        id: MatchId,
        now: i64,
    ) -> Result<Vec<Settlement>, ArenaError> {
        let (_, settlements) = self.transact(id, |m| {
            let owed = m.expire(now)?;
            Ok(((), owed))
        })?;
        info!(match_id = id, refunds = settlements.len(), "match expired");
        Ok(settlements)
    }

    pub fn fund_gas_pool(&mut self, owner: Identity, amount: u64) -> Result<u64, ArenaError> {
        let balance = self.gas.fund(owner, amount)?;
        debug!(owner = %owner, amount, balance, "gas pool funded");
        Ok(balance)
    }

    /// Relay-submitted `withdraw_my_stake` for `recipient`, billed to the
    /// recipient's sponsorship pool
    pub fn relayed_withdrawal(
        &mut self,
        caller: Identity,
        id: MatchId,
        recipient: Identity,
    ) -> Result<Settlement, ArenaError> {
        self.gas.require_relay(&caller)?;
        if recipient.is_zero() {
            return Err(ArenaError::InvalidRecipient);
        }
        self.gas.ensure_funded(&recipient)?;
        let settlement = self.withdraw_my_stake(id, recipient)?;
        self.gas.charge(&recipient)?;
        info!(match_id = id, recipient = %recipient, "relayed withdrawal");
        Ok(settlement)
    }

    /// Attempt every pair; one item's failure never aborts the rest
    pub fn relayed_batch(
        &mut self,
        caller: Identity,
        match_ids: &[MatchId],
        recipients: &[Identity],
    ) -> Result<BatchReport, ArenaError> {
        self.gas.require_relay(&caller)?;
        if match_ids.len() != recipients.len() {
            return Err(ArenaError::BatchLengthMismatch {
                matches: match_ids.len(),
                recipients: recipients.len(),
            });
        }
        let mut report = BatchReport::default();
        for (id, recipient) in match_ids.iter().zip(recipients) {
            let outcome = self.relayed_withdrawal(caller, *id, *recipient);
            if let Err(e) = &outcome {
                warn!(match_id = *id, recipient = %recipient, error = %e, "relay item failed");
            }
            report.record(outcome);
        }
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "relay batch complete"
        );
        Ok(report)
    }

    pub fn sweep_fees(&mut self, caller: Identity) -> Result<u64, ArenaError> {
        if caller != self.config.owner {
            return Err(ArenaError::Unauthorized("owner"));
        }
        let amount = self.ledger.sweep_fees(caller)?;
        info!(owner = %caller, amount, "protocol fees swept");
        Ok(amount)
    }

    pub fn get_match(&self, id: MatchId) -> Option<Match> {
        self.index(id).ok().map(|idx| self.matches[idx].clone())
    }

    pub fn get_board(&self, id: MatchId) -> Board {
        self.index(id)
            .map(|idx| self.matches[idx].board.clone())
            .unwrap_or_default()
    }

    pub fn get_current_player(&self, id: MatchId) -> Option<Identity> {
        let idx = self.index(id).ok()?;
        self.matches[idx].current_player()
    }

    pub fn get_time_remaining(&self, id: MatchId, now: i64) -> i64 {
        self.index(id)
            .map(|idx| self.matches[idx].time_remaining(now))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::game::MatchState;
    use crate::oracle::SeededOracle;
    use proptest::prelude::*;

    const OWNER: Identity = Identity([0xF0; 32]);
    const ORACLE: Identity = Identity([0xF1; 32]);
    const RELAY: Identity = Identity([0xF2; 32]);
    const A: Identity = Identity([0xA; 32]);
    const B: Identity = Identity([0xB; 32]);
    const C: Identity = Identity([0xC; 32]);

    const T0: i64 = 1_000;

    fn registry(max_rounds: u8) -> MatchRegistry<SeededOracle> {
        let config = ArenaConfig {
            owner: OWNER,
            oracle: ORACLE,
            relay: RELAY,
            house_fee_bps: 500,
            max_rounds,
            ..ArenaConfig::default()
        };
        MatchRegistry::new(config, SeededOracle::new([3u8; 32])).unwrap()
    }

    fn deliver(reg: &mut MatchRegistry<SeededOracle>, now: i64) {
        let (request_id, word) = reg.oracle_mut().next_delivery().unwrap();
        reg.fulfill_randomness(ORACLE, request_id, word, now).unwrap();
    }

    /// Match with A and B staked and round 1 open
    fn in_progress(reg: &mut MatchRegistry<SeededOracle>, a: u64, b: u64) -> MatchId {
        let id = reg.create_match(T0);
        reg.join(id, A, a).unwrap();
        reg.join(id, B, b).unwrap();
        reg.start(id).unwrap();
        deliver(reg, T0);
        id
    }

    fn opponent_of(player: Identity) -> Identity {
        if player == A {
            B
        } else {
            A
        }
    }

    /// Current starter takes the top row; returns the round winner
    fn starter_wins(reg: &mut MatchRegistry<SeededOracle>, id: MatchId, now: i64) -> Identity {
        let starter = reg.get_current_player(id).unwrap();
        let other = opponent_of(starter);
        reg.make_move(id, starter, 0, 0, now).unwrap();
        reg.make_move(id, other, 1, 0, now).unwrap();
        reg.make_move(id, starter, 0, 1, now).unwrap();
        reg.make_move(id, other, 1, 1, now).unwrap();
        reg.make_move(id, starter, 0, 2, now).unwrap();
        starter
    }

    fn draw(reg: &mut MatchRegistry<SeededOracle>, id: MatchId, now: i64) {
        let seq = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)];
        for (x, y) in seq {
            let mover = reg.get_current_player(id).unwrap();
            reg.make_move(id, mover, x, y, now).unwrap();
        }
    }

    #[test]
    fn test_deposits_match_ledger_balance() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 70).unwrap();
        reg.join(id, B, 130).unwrap();
        let m = reg.get_match(id).unwrap();
        let deposited: u64 = m.players.iter().map(|p| p.deposited).sum();
        assert_eq!(deposited, m.total_stake);
        assert_eq!(deposited, reg.ledger().balance_of(id));
        assert_eq!(m.state, MatchState::Staked);
    }

    #[test]
    fn test_rejected_join_leaves_ledger_untouched() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 70).unwrap();
        assert_eq!(reg.join(id, A, 70), Err(ArenaError::AlreadyJoined));
        reg.join(id, B, 30).unwrap();
        assert_eq!(reg.join(id, C, 10), Err(ArenaError::RosterFull));
        assert_eq!(reg.ledger().balance_of(id), 100);
    }

    #[test]
    fn test_full_match_pays_winner_with_fee() {
        let mut reg = registry(1);
        let id = in_progress(&mut reg, 1_000, 1_000);
        let winner = starter_wins(&mut reg, id, T0 + 10);
        let loser = opponent_of(winner);
        assert_eq!(reg.get_match(id).unwrap().state, MatchState::Finished);

        assert_eq!(reg.withdraw_prize(id, loser), Err(ArenaError::NotWinner));
        let s = reg.withdraw_prize(id, winner).unwrap();
        assert_eq!(s.gross, 2_000);
        assert_eq!(s.payout + s.fee, s.gross);
        assert_eq!(s.fee, 100);
        assert_eq!(reg.ledger().balance_of(id), 0);
        assert_eq!(reg.ledger().settled_balance(&winner), 1_900);
        assert!(reg.ledger().is_conserved());

        let err = reg.withdraw_prize(id, winner).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyFinalized);
        assert!(reg.withdraw_my_stake(id, winner).is_err());
    }

    #[test]
    fn test_best_of_three() {
        let mut reg = registry(3);
        let id = in_progress(&mut reg, 500, 500);
        let first = starter_wins(&mut reg, id, T0 + 1);
        // starter rotates, so the other player takes round 2
        let second = starter_wins(&mut reg, id, T0 + 2);
        assert_ne!(first, second);
        let third = starter_wins(&mut reg, id, T0 + 3);
        assert_eq!(third, first);
        let m = reg.get_match(id).unwrap();
        assert_eq!(m.state, MatchState::Finished);
        assert_eq!(m.winner, Some(first));
    }

    #[test]
    fn test_all_draws_refund_everyone_fee_free() {
        let mut reg = registry(2);
        let id = in_progress(&mut reg, 300, 700);
        draw(&mut reg, id, T0 + 1);
        draw(&mut reg, id, T0 + 2);
        assert_eq!(reg.get_match(id).unwrap().state, MatchState::Cancelled);
        assert_eq!(reg.ledger().settled_balance(&A), 300);
        assert_eq!(reg.ledger().settled_balance(&B), 700);
        assert_eq!(reg.ledger().fee_pool(), 0);
        assert_eq!(reg.withdraw_my_stake(id, A), Err(ArenaError::AlreadyWithdrawn));
        assert!(reg.ledger().is_conserved());
    }

    #[test]
    fn test_tie_on_wins_goes_to_bigger_deposit() {
        let mut reg = registry(3);
        let id = in_progress(&mut reg, 100, 900);
        starter_wins(&mut reg, id, T0 + 1);
        starter_wins(&mut reg, id, T0 + 2);
        draw(&mut reg, id, T0 + 3);
        assert_eq!(reg.get_match(id).unwrap().winner, Some(B));
    }

    #[test]
    fn test_timeout_claim_awards_round() {
        let mut reg = registry(3);
        let id = in_progress(&mut reg, 100, 100);
        let starter = reg.get_current_player(id).unwrap();
        let waiting = opponent_of(starter);
        assert_eq!(
            reg.claim_timeout_win(id, waiting, T0 + 10_000),
            Err(ArenaError::NoMovesThisRound)
        );
        reg.make_move(id, starter, 1, 1, T0 + 5).unwrap();
        // now `waiting` is due to move and stalls
        assert!(reg.claim_timeout_win(id, starter, T0 + 305).is_err());
        let advance = reg.claim_timeout_win(id, starter, T0 + 306).unwrap();
        assert!(matches!(advance, RoundAdvance::NextRound { round: 2, .. }));
        let m = reg.get_match(id).unwrap();
        assert_eq!(m.players[m.seat_of(&starter).unwrap()].wins, 1);
    }

    #[test]
    fn test_auto_refund_preempts_randomness() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 40).unwrap();
        reg.join(id, B, 60).unwrap();
        reg.start(id).unwrap();
        let deadline = reg.get_match(id).unwrap().auto_refund_deadline;

        assert!(matches!(
            reg.auto_refund_expired(id, deadline - 1),
            Err(ArenaError::DeadlineNotReached { .. })
        ));
        let refunds = reg.auto_refund_expired(id, deadline).unwrap();
        assert_eq!(refunds.iter().map(|s| s.payout).sum::<u64>(), 100);
        assert!(refunds.iter().all(|s| s.fee == 0));

        let before = reg.get_match(id).unwrap();
        let (request_id, word) = reg.oracle_mut().next_delivery().unwrap();
        assert_eq!(
            reg.fulfill_randomness(ORACLE, request_id, word, deadline + 1),
            Err(ArenaError::RandomnessNotPending(MatchState::Cancelled))
        );
        assert_eq!(reg.get_match(id).unwrap(), before);

        let again = reg.auto_refund_expired(id, deadline + 2).unwrap_err();
        assert_eq!(again.kind(), ErrorKind::AlreadyFinalized);
        assert!(reg.ledger().is_conserved());
    }

    #[test]
    fn test_untimed_opening_move_can_outlast_refund_window() {
        let mut reg = registry(3);
        let id = in_progress(&mut reg, 40, 60);
        let deadline = reg.get_match(id).unwrap().auto_refund_deadline;
        assert_eq!(deadline, T0 + reg.config().refund_window_secs);

        // opening move is not timed, so play can still be running at the deadline
        let starter = reg.get_current_player(id).unwrap();
        reg.make_move(id, starter, 1, 1, deadline).unwrap();
        assert_eq!(reg.get_match(id).unwrap().state, MatchState::InProgress);

        let refunds = reg.auto_refund_expired(id, deadline).unwrap();
        assert_eq!(refunds.iter().map(|s| s.payout).sum::<u64>(), 100);
        assert_eq!(reg.get_match(id).unwrap().state, MatchState::Cancelled);
        assert!(reg.ledger().is_conserved());
    }

    #[test]
    fn test_duplicate_randomness_rejected() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 40).unwrap();
        reg.join(id, B, 60).unwrap();
        let request_id = reg.start(id).unwrap();
        reg.fulfill_randomness(ORACLE, request_id, 1, T0).unwrap();
        let before = reg.get_match(id).unwrap();
        assert_eq!(
            reg.fulfill_randomness(ORACLE, request_id, 0, T0 + 1),
            Err(ArenaError::RandomnessNotPending(MatchState::InProgress))
        );
        assert_eq!(reg.get_match(id).unwrap(), before);
        assert_eq!(reg.get_current_player(id), Some(B));
    }

    #[test]
    fn test_randomness_only_from_oracle() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 40).unwrap();
        reg.join(id, B, 60).unwrap();
        let request_id = reg.start(id).unwrap();
        assert_eq!(
            reg.fulfill_randomness(A, request_id, 0, T0),
            Err(ArenaError::Unauthorized("oracle"))
        );
        assert_eq!(
            reg.fulfill_randomness(ORACLE, request_id + 99, 0, T0),
            Err(ArenaError::UnknownRequest(request_id + 99))
        );
    }

    #[test]
    fn test_reentrant_call_rejected_and_flag_released() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.locked.insert(id);
        assert_eq!(reg.join(id, A, 10), Err(ArenaError::Reentrant(id)));
        reg.locked.remove(&id);
        // a failing operation still releases the flag
        assert!(reg.start(id).is_err());
        assert!(reg.join(id, A, 10).is_ok());
        assert!(reg.locked.is_empty());
    }

    #[test]
    fn test_operations_on_distinct_matches_are_independent() {
        let mut reg = registry(1);
        let first = in_progress(&mut reg, 100, 100);
        let second = in_progress(&mut reg, 200, 200);
        let winner = starter_wins(&mut reg, first, T0 + 1);
        reg.withdraw_prize(first, winner).unwrap();
        assert_eq!(reg.ledger().balance_of(second), 400);
        assert_eq!(reg.get_match(second).unwrap().state, MatchState::InProgress);
    }

    #[test]
    fn test_relayed_batch_continues_on_error() {
        let mut reg = registry(3);
        let cancelled = reg.create_match(T0);
        reg.join(cancelled, A, 50).unwrap();
        reg.join(cancelled, B, 80).unwrap();
        // cancelled with both deposits still in escrow
        reg.matches[cancelled as usize].state = MatchState::Cancelled;

        reg.fund_gas_pool(A, 10_000).unwrap();
        reg.fund_gas_pool(C, 10_000).unwrap();

        assert_eq!(
            reg.relayed_batch(A, &[cancelled], &[A]).unwrap_err(),
            ArenaError::Unauthorized("relay")
        );
        assert_eq!(
            reg.relayed_batch(RELAY, &[cancelled, cancelled], &[A]).unwrap_err(),
            ArenaError::BatchLengthMismatch { matches: 2, recipients: 1 }
        );

        // B has no gas pool, C is not a player, A succeeds, A again is already withdrawn
        let report = reg
            .relayed_batch(
                RELAY,
                &[cancelled, cancelled, cancelled, cancelled, 99],
                &[B, C, A, A, A],
            )
            .unwrap();
        assert_eq!((report.succeeded, report.failed), (1, 4));
        assert_eq!(
            report.outcomes[0],
            Err(ArenaError::InsufficientGas { available: 0, required: 5_000 })
        );
        assert_eq!(report.outcomes[1], Err(ArenaError::NotAPlayer));
        assert_eq!(report.outcomes[2].as_ref().map(|s| s.payout), Ok(50));
        assert_eq!(report.outcomes[3], Err(ArenaError::AlreadyWithdrawn));
        assert_eq!(report.outcomes[4], Err(ArenaError::MatchNotFound(99)));

        assert_eq!(reg.gas().pool_of(&A), 5_000);
        assert_eq!(reg.gas().relay_earnings(), 5_000);
        assert_eq!(reg.ledger().balance_of(cancelled), 80);
    }

    #[test]
    fn test_relay_rejects_zero_recipient() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        assert_eq!(
            reg.relayed_withdrawal(RELAY, id, Identity::ZERO),
            Err(ArenaError::InvalidRecipient)
        );
    }

    /// Returns a fixed output regardless of input
    struct FixedSwap(u64);

    impl SwapExecutor for FixedSwap {
        fn convert(&mut self, _asset_in: AssetId, _amount_in: u64) -> Result<u64, ArenaError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_join_with_asset_checks_slippage() {
        let token = AssetId(4);
        let mut reg = registry(3);
        reg.set_price_feed(token, PriceFeed { price: 10, decimals: 0, updated_at: T0 });
        let id = reg.create_match(T0);

        // configured bound is 1%: 100 tokens priced at 1_000 must yield 990
        assert_eq!(
            reg.join_with_asset(id, A, token, 100, &mut FixedSwap(989), T0),
            Err(ArenaError::SlippageExceeded { minimum: 990, actual: 989 })
        );
        assert!(reg.get_match(id).unwrap().players.is_empty());
        assert_eq!(reg.ledger().balance_of(id), 0);

        assert_eq!(reg.join_with_asset(id, A, token, 100, &mut FixedSwap(995), T0), Ok(995));
        assert_eq!(reg.ledger().balance_of(id), 995);

        // duplicate join is rejected before the swap runs
        assert_eq!(
            reg.join_with_asset(id, A, token, 100, &mut FixedSwap(995), T0),
            Err(ArenaError::AlreadyJoined)
        );
    }

    #[test]
    fn test_join_with_asset_uses_config_bounds() {
        let token = AssetId(4);
        let mut reg = registry(3);
        reg.set_price_feed(token, PriceFeed { price: 10, decimals: 0, updated_at: T0 });
        let id = reg.create_match(T0);

        // half the priced value is far outside the default bound
        assert_eq!(
            reg.join_with_asset(id, A, token, 100, &mut FixedSwap(500), T0),
            Err(ArenaError::SlippageExceeded { minimum: 990, actual: 500 })
        );

        // feed older than max_price_age_secs
        let late = T0 + reg.config().max_price_age_secs + 1;
        let err = reg
            .join_with_asset(id, A, token, 100, &mut FixedSwap(1_000), late)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleOrMissingOracleData);

        assert_eq!(
            reg.join_with_asset(id, A, AssetId(5), 100, &mut FixedSwap(1_000), T0),
            Err(ArenaError::FeedMissing(AssetId(5)))
        );
        assert!(reg.get_match(id).unwrap().players.is_empty());
        assert_eq!(reg.ledger().balance_of(id), 0);
    }

    #[test]
    fn test_sweep_requires_owner() {
        let mut reg = registry(1);
        let id = in_progress(&mut reg, 1_000, 1_000);
        let winner = starter_wins(&mut reg, id, T0 + 1);
        reg.withdraw_prize(id, winner).unwrap();
        assert_eq!(reg.sweep_fees(A), Err(ArenaError::Unauthorized("owner")));
        assert_eq!(reg.sweep_fees(OWNER), Ok(100));
        assert_eq!(reg.sweep_fees(OWNER), Err(ArenaError::NoFeesToSweep));
        assert_eq!(reg.ledger().settled_balance(&OWNER), 100);
        assert!(reg.ledger().is_conserved());
    }

    #[test]
    fn test_winner_stake_then_prize() {
        let mut reg = registry(1);
        let id = in_progress(&mut reg, 400, 600);
        let winner = starter_wins(&mut reg, id, T0 + 1);
        let loser = opponent_of(winner);
        assert_eq!(reg.withdraw_my_stake(id, loser), Err(ArenaError::NotWinner));
        let own = reg.withdraw_my_stake(id, winner).unwrap();
        let rest = reg.withdraw_prize(id, winner).unwrap();
        assert_eq!(own.gross + rest.gross, 1_000);
        assert_eq!(reg.ledger().balance_of(id), 0);
        assert_eq!(reg.get_match(id).unwrap().state, MatchState::PaidOut);
    }

    #[test]
    fn test_projections_on_missing_match() {
        let reg = registry(3);
        assert!(reg.get_match(7).is_none());
        assert_eq!(reg.get_board(7), Board::new());
        assert_eq!(reg.get_current_player(7), None);
        assert_eq!(reg.get_time_remaining(7, T0), 0);
    }

    #[test]
    fn test_projections_while_playing() {
        let mut reg = registry(3);
        let id = in_progress(&mut reg, 1, 1);
        let mover = reg.get_current_player(id).unwrap();
        assert_eq!(reg.get_time_remaining(id, T0 + 9_999), 300);
        reg.make_move(id, mover, 2, 2, T0 + 10).unwrap();
        assert_eq!(reg.get_time_remaining(id, T0 + 110), 200);
        assert_eq!(reg.get_board(id).move_count, 1);
        assert_eq!(reg.get_current_player(id), Some(opponent_of(mover)));
    }

    #[test]
    fn test_expiry_refunds_lone_joiner() {
        let mut reg = registry(3);
        let id = reg.create_match(T0);
        reg.join(id, A, 25).unwrap();
        let deadline = reg.get_match(id).unwrap().auto_refund_deadline;
        let refunds = reg.auto_refund_expired(id, deadline).unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].recipient, A);
        assert_eq!(refunds[0].payout, 25);
        let m = reg.get_match(id).unwrap();
        assert!(m.players.iter().all(|p| p.withdrawn));
        assert_eq!(reg.ledger().fee_pool(), 0);
    }

    proptest! {
        #[test]
        fn prop_join_sum_matches_ledger(
            attempts in prop::collection::vec((0usize..4, 0u64..1_000_000), 1..12)
        ) {
            let identities = [A, B, C, Identity::ZERO];
            let mut reg = registry(3);
            let id = reg.create_match(T0);
            for (who, stake) in attempts {
                let _ = reg.join(id, identities[who], stake);
                let m = reg.get_match(id).unwrap();
                let deposited: u64 = m.players.iter().map(|p| p.deposited).sum();
                prop_assert!(m.players.len() <= 2);
                prop_assert_eq!(deposited, m.total_stake);
                prop_assert_eq!(deposited, reg.ledger().balance_of(id));
                prop_assert!(m.players.iter().all(|p| p.deposited > 0));
            }
        }
    }
}
