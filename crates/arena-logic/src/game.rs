//! Match state machine
//!
//! Transitions over a single `Match`. Every transition validates first and
//! mutates after, so a rejected call leaves the record untouched. Value never
//! moves here: payout and refund transitions mark the affected players as
//! withdrawn, set the new state, and return `Disbursement`s for the caller to
//! settle against the escrow.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Mark};
use crate::error::ArenaError;
use crate::rules::{self, RoundResult};
use crate::types::{Identity, MatchId};

pub const MAX_PLAYERS: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    #[default]
    Open,
    Staked,
    VrfPending,
    InProgress,
    Finished,
    PaidOut,
    Cancelled,
}

impl MatchState {
    /// No further value can leave a match in this state
    pub fn is_settled(self) -> bool {
        matches!(self, MatchState::PaidOut | MatchState::Cancelled)
    }
}

/// Timing and length rules, snapshotted from config at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    pub max_rounds: u8,
    pub move_timeout: i64,
    pub refund_window: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub identity: Identity,
    /// Stake in settlement units
    pub deposited: u64,
    /// Rounds won in this match
    pub wins: u8,
    /// Set once, when this player's deposit leaves escrow
    pub withdrawn: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisbursementKind {
    /// Winner payout, subject to the protocol fee
    Payout,
    /// Return of a player's own deposit, fee-free
    Refund,
}

/// Value owed out of a match's escrow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub match_id: MatchId,
    pub recipient: Identity,
    pub amount: u64,
    pub kind: DisbursementKind,
}

/// What happened when a round ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundAdvance {
    NextRound { round: u8, starter: usize },
    Finished { winner: Identity },
    /// No round was ever won; every unwithdrawn deposit is refunded
    Cancelled { refunds: Vec<Disbursement> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Round continues with `next` to move
    Continue { next: usize },
    RoundOver { result: RoundResult, advance: RoundAdvance },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub state: MatchState,
    /// Join order; append-only, at most `MAX_PLAYERS`
    pub players: Vec<Player>,
    pub current_round: u8,
    /// Seat that started round 1
    pub starter_index: usize,
    pub last_round_starter_index: usize,
    pub current_player_index: usize,
    pub winner: Option<Identity>,
    pub board: Board,
    pub total_stake: u64,
    pub created_at: i64,
    pub last_move_time: i64,
    pub auto_refund_deadline: i64,
    pub rules: MatchRules,
}

impl Match {
    pub fn new(id: MatchId, rules: MatchRules, now: i64) -> Self {
        Self {
            id,
            state: MatchState::Open,
            players: Vec::with_capacity(MAX_PLAYERS),
            current_round: 1,
            starter_index: 0,
            last_round_starter_index: 0,
            current_player_index: 0,
            winner: None,
            board: Board::new(),
            total_stake: 0,
            created_at: now,
            last_move_time: now,
            auto_refund_deadline: now.saturating_add(rules.refund_window),
            rules,
        }
    }

    pub fn seat_of(&self, identity: &Identity) -> Option<usize> {
        self.players.iter().position(|p| p.identity == *identity)
    }

    fn require_state(&self, expected: MatchState) -> Result<(), ArenaError> {
        if self.state != expected {
            return Err(ArenaError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Would `caller` be accepted as the next player
    pub fn ensure_joinable(&self, caller: &Identity) -> Result<(), ArenaError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(ArenaError::RosterFull);
        }
        self.require_state(MatchState::Open)?;
        if self.seat_of(caller).is_some() {
            return Err(ArenaError::AlreadyJoined);
        }
        if caller.is_zero() {
            return Err(ArenaError::InvalidRecipient);
        }
        Ok(())
    }

    /// Add `caller` with a stake already normalized to settlement units
    pub fn join(&mut self, caller: Identity, value: u64) -> Result<(), ArenaError> {
        self.ensure_joinable(&caller)?;
        if value == 0 {
            return Err(ArenaError::ZeroStake);
        }
        let total_stake = self
            .total_stake
            .checked_add(value)
            .ok_or(ArenaError::Overflow)?;

        self.players.push(Player {
            identity: caller,
            deposited: value,
            wins: 0,
            withdrawn: false,
        });
        self.total_stake = total_stake;
        if self.players.len() == MAX_PLAYERS {
            self.state = MatchState::Staked;
        }
        Ok(())
    }

    /// Move to `VrfPending`; the caller issues the randomness request
    pub fn start(&mut self) -> Result<(), ArenaError> {
        self.require_state(MatchState::Staked)?;
        if self.players.len() != MAX_PLAYERS {
            return Err(ArenaError::InvalidState {
                expected: MatchState::Staked,
                actual: self.state,
            });
        }
        self.state = MatchState::VrfPending;
        Ok(())
    }

    /// Consume a randomness word and open round 1.
    ///
    /// Rejected unless the match is still waiting for randomness, so a
    /// duplicate or late delivery (e.g. after an auto-refund) changes nothing.
    pub fn on_randomness(&mut self, word: u64, now: i64) -> Result<usize, ArenaError> {
        if self.state != MatchState::VrfPending {
            return Err(ArenaError::RandomnessNotPending(self.state));
        }
        let starter = crate::starter_from_word(word);
        self.starter_index = starter;
        self.board.reset();
        self.current_player_index = starter;
        self.last_round_starter_index = starter;
        self.current_round = 1;
        self.last_move_time = now;
        self.state = MatchState::InProgress;
        Ok(starter)
    }

    pub fn play(
        &mut self,
        caller: &Identity,
        x: usize,
        y: usize,
        now: i64,
    ) -> Result<MoveOutcome, ArenaError> {
        self.require_state(MatchState::InProgress)?;
        match self.board.get(x, y) {
            None => return Err(ArenaError::CellOutOfRange { x, y }),
            Some(Mark::Empty) => {}
            Some(_) => return Err(ArenaError::CellOccupied { x, y }),
        }
        let seat = self.current_player_index;
        if self.players[seat].identity != *caller {
            return Err(match self.seat_of(caller) {
                Some(_) => ArenaError::NotYourTurn,
                None => ArenaError::NotAPlayer,
            });
        }
        // The opening move of a round is exempt from the move window
        if self.board.move_count > 0 {
            let elapsed = now.saturating_sub(self.last_move_time);
            if elapsed > self.rules.move_timeout {
                return Err(ArenaError::MoveTimedOut {
                    elapsed,
                    limit: self.rules.move_timeout,
                });
            }
        }

        let mark = Mark::for_seat(seat);
        self.board.place(x, y, mark)?;
        self.last_move_time = now;

        if self.board.has_line(mark) {
            self.players[seat].wins += 1;
            let result = RoundResult::Won(seat);
            let advance = self.advance_round(result, now);
            Ok(MoveOutcome::RoundOver { result, advance })
        } else if self.board.is_full() {
            let result = RoundResult::Draw;
            let advance = self.advance_round(result, now);
            Ok(MoveOutcome::RoundOver { result, advance })
        } else {
            self.current_player_index = rules::other_seat(seat);
            Ok(MoveOutcome::Continue {
                next: self.current_player_index,
            })
        }
    }

    /// Award the round to the waiting player once the mover has stalled
    /// past the move window.
    pub fn claim_timeout_win(
        &mut self,
        caller: &Identity,
        now: i64,
    ) -> Result<RoundAdvance, ArenaError> {
        self.require_state(MatchState::InProgress)?;
        if self.board.move_count == 0 {
            return Err(ArenaError::NoMovesThisRound);
        }
        let elapsed = now.saturating_sub(self.last_move_time);
        if elapsed <= self.rules.move_timeout {
            return Err(ArenaError::TimeoutNotReached {
                elapsed,
                limit: self.rules.move_timeout,
            });
        }
        let seat = self.seat_of(caller).ok_or(ArenaError::NotAPlayer)?;
        if seat == self.current_player_index {
            return Err(ArenaError::NotTimeoutClaimant);
        }

        self.players[seat].wins += 1;
        Ok(self.advance_round(RoundResult::Won(seat), now))
    }

    fn advance_round(&mut self, result: RoundResult, now: i64) -> RoundAdvance {
        if self.current_round >= self.rules.max_rounds {
            return self.select_winner();
        }
        let next = rules::next_starter(
            self.current_round,
            result,
            self.starter_index,
            self.last_round_starter_index,
        );
        self.current_round += 1;
        self.board.reset();
        self.last_move_time = now;
        self.current_player_index = next;
        self.last_round_starter_index = next;
        RoundAdvance::NextRound {
            round: self.current_round,
            starter: next,
        }
    }

    fn select_winner(&mut self) -> RoundAdvance {
        match rules::select_winner(&self.players) {
            Some(seat) => {
                let winner = self.players[seat].identity;
                self.winner = Some(winner);
                self.state = MatchState::Finished;
                RoundAdvance::Finished { winner }
            }
            None => {
                self.state = MatchState::Cancelled;
                RoundAdvance::Cancelled {
                    refunds: self.refund_unwithdrawn(),
                }
            }
        }
    }

    fn refund_unwithdrawn(&mut self) -> Vec<Disbursement> {
        let id = self.id;
        self.players
            .iter_mut()
            .filter(|p| !p.withdrawn)
            .map(|p| {
                p.withdrawn = true;
                Disbursement {
                    match_id: id,
                    recipient: p.identity,
                    amount: p.deposited,
                    kind: DisbursementKind::Refund,
                }
            })
            .collect()
    }

    /// Winner collects every deposit not yet withdrawn
    pub fn withdraw_prize(&mut self, caller: &Identity) -> Result<Disbursement, ArenaError> {
        if self.state.is_settled() {
            return Err(ArenaError::AlreadySettled(self.state));
        }
        self.require_state(MatchState::Finished)?;
        let winner = self.winner.ok_or(ArenaError::NotWinner)?;
        if winner != *caller {
            return Err(ArenaError::NotWinner);
        }
        let amount = self
            .players
            .iter()
            .filter(|p| !p.withdrawn)
            .try_fold(0u64, |acc, p| acc.checked_add(p.deposited))
            .ok_or(ArenaError::Overflow)?;
        if amount == 0 {
            return Err(ArenaError::NothingToWithdraw);
        }

        for player in self.players.iter_mut() {
            player.withdrawn = true;
        }
        self.state = MatchState::PaidOut;
        Ok(Disbursement {
            match_id: self.id,
            recipient: winner,
            amount,
            kind: DisbursementKind::Payout,
        })
    }

    /// Withdraw `target`'s own deposit: a refund when cancelled, the
    /// winner's own share when finished.
    pub fn withdraw_stake(&mut self, target: &Identity) -> Result<Disbursement, ArenaError> {
        if self.state == MatchState::PaidOut {
            return Err(ArenaError::AlreadySettled(self.state));
        }
        if !matches!(self.state, MatchState::Finished | MatchState::Cancelled) {
            return Err(ArenaError::InvalidState {
                expected: MatchState::Finished,
                actual: self.state,
            });
        }
        let seat = self.seat_of(target).ok_or(ArenaError::NotAPlayer)?;
        if self.players[seat].withdrawn {
            return Err(ArenaError::AlreadyWithdrawn);
        }
        let kind = if self.state == MatchState::Cancelled {
            DisbursementKind::Refund
        } else {
            if self.winner != Some(*target) {
                return Err(ArenaError::NotWinner);
            }
            DisbursementKind::Payout
        };

        let player = &mut self.players[seat];
        player.withdrawn = true;
        Ok(Disbursement {
            match_id: self.id,
            recipient: player.identity,
            amount: player.deposited,
            kind,
        })
    }

    /// Cancel a match past its deadline and refund whoever has not withdrawn
    pub fn expire(&mut self, now: i64) -> Result<Vec<Disbursement>, ArenaError> {
        if self.state.is_settled() {
            return Err(ArenaError::AlreadySettled(self.state));
        }
        if now < self.auto_refund_deadline {
            return Err(ArenaError::DeadlineNotReached {
                deadline: self.auto_refund_deadline,
                now,
            });
        }
        self.state = MatchState::Cancelled;
        Ok(self.refund_unwithdrawn())
    }

    /// Identity due to move, only while a round is being played
    pub fn current_player(&self) -> Option<Identity> {
        if self.state != MatchState::InProgress {
            return None;
        }
        self.players.get(self.current_player_index).map(|p| p.identity)
    }

    /// Seconds left in the current move window
    pub fn time_remaining(&self, now: i64) -> i64 {
        if self.state != MatchState::InProgress {
            return 0;
        }
        if self.board.move_count == 0 {
            return self.rules.move_timeout;
        }
        let elapsed = now.saturating_sub(self.last_move_time);
        self.rules.move_timeout.saturating_sub(elapsed).max(0)
    }
}
