//! Rejection reasons for every arena operation

use thiserror::Error;

use crate::game::MatchState;
use crate::types::{AssetId, MatchId, RequestId};

/// Broad failure classes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation is not valid for the current state
    PreconditionViolation,
    /// Wrong caller identity
    AuthorizationFailure,
    /// Malformed or out-of-range arguments
    InvalidInput,
    /// Ledger balance or sponsorship pool too low
    InsufficientFunds,
    /// Price feed absent, non-positive, or stale
    StaleOrMissingOracleData,
    /// Repeat of an operation that can only happen once
    AlreadyFinalized,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("match {0} does not exist")]
    MatchNotFound(MatchId),

    #[error("match is {actual:?}, operation requires {expected:?}")]
    InvalidState { expected: MatchState, actual: MatchState },

    #[error("randomness delivered while match is {0:?}")]
    RandomnessNotPending(MatchState),

    #[error("unknown randomness request {0}")]
    UnknownRequest(RequestId),

    #[error("match {0} is already executing an operation")]
    Reentrant(MatchId),

    #[error("roster is full")]
    RosterFull,

    #[error("player has already joined this match")]
    AlreadyJoined,

    #[error("stake must be greater than zero")]
    ZeroStake,

    #[error("caller is not a player in this match")]
    NotAPlayer,

    #[error("it is not the caller's turn")]
    NotYourTurn,

    #[error("cell ({x}, {y}) is outside the 3x3 board")]
    CellOutOfRange { x: usize, y: usize },

    #[error("cell ({x}, {y}) is already taken")]
    CellOccupied { x: usize, y: usize },

    #[error("move window expired {elapsed}s after the last move (limit {limit}s)")]
    MoveTimedOut { elapsed: i64, limit: i64 },

    #[error("no move has been made in the current round")]
    NoMovesThisRound,

    #[error("timeout not reached: {elapsed}s elapsed, limit {limit}s")]
    TimeoutNotReached { elapsed: i64, limit: i64 },

    #[error("only the player waiting on the opponent may claim a timeout")]
    NotTimeoutClaimant,

    #[error("caller is not the match winner")]
    NotWinner,

    #[error("caller is not the {0}")]
    Unauthorized(&'static str),

    #[error("recipient is the zero identity")]
    InvalidRecipient,

    #[error("batch arrays differ in length ({matches} matches, {recipients} recipients)")]
    BatchLengthMismatch { matches: usize, recipients: usize },

    #[error("auto-refund deadline {deadline} not reached (now {now})")]
    DeadlineNotReached { deadline: i64, now: i64 },

    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("gas pool holds {available}, relayed withdrawal costs {required}")]
    InsufficientGas { available: u64, required: u64 },

    #[error("no protocol fees to sweep")]
    NoFeesToSweep,

    #[error("swap returned {actual}, minimum acceptable is {minimum}")]
    SlippageExceeded { minimum: u64, actual: u64 },

    #[error("no price feed configured for asset {0}")]
    FeedMissing(AssetId),

    #[error("price feed for asset {0} reports a non-positive price")]
    NonPositivePrice(AssetId),

    #[error("price feed for asset {asset} is {age}s old (max {max_age}s)")]
    StalePrice { asset: AssetId, age: i64, max_age: i64 },

    #[error("stake already withdrawn")]
    AlreadyWithdrawn,

    #[error("nothing left to withdraw")]
    NothingToWithdraw,

    #[error("match already settled as {0:?}")]
    AlreadySettled(MatchState),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ArenaError {
    pub fn kind(&self) -> ErrorKind {
        use ArenaError::*;
        match self {
            InvalidState { .. }
            | RandomnessNotPending(_)
            | Reentrant(_)
            | RosterFull
            | MoveTimedOut { .. }
            | NoMovesThisRound
            | TimeoutNotReached { .. }
            | DeadlineNotReached { .. } => ErrorKind::PreconditionViolation,

            NotAPlayer | NotYourTurn | NotTimeoutClaimant | NotWinner | Unauthorized(_) => {
                ErrorKind::AuthorizationFailure
            }

            MatchNotFound(_)
            | UnknownRequest(_)
            | ZeroStake
            | CellOutOfRange { .. }
            | CellOccupied { .. }
            | InvalidRecipient
            | BatchLengthMismatch { .. }
            | Overflow
            | InvalidConfig(_) => ErrorKind::InvalidInput,

            InsufficientBalance { .. }
            | InsufficientGas { .. }
            | NoFeesToSweep
            | SlippageExceeded { .. } => ErrorKind::InsufficientFunds,

            FeedMissing(_) | NonPositivePrice(_) | StalePrice { .. } => {
                ErrorKind::StaleOrMissingOracleData
            }

            AlreadyJoined | AlreadyWithdrawn | NothingToWithdraw | AlreadySettled(_) => {
                ErrorKind::AlreadyFinalized
            }
        }
    }
}
