//! Custom error codes

use anchor_lang::prelude::*;

#[error_code]
pub enum ArenaError {
    #[msg("Invalid match state for this action")]
    InvalidState = 6000,

    #[msg("Match already has two players")]
    RosterFull = 6001,

    #[msg("Player has already joined this match")]
    AlreadyJoined = 6002,

    #[msg("Stake must be greater than zero")]
    ZeroStake = 6003,

    #[msg("Signer is not a player in this match")]
    NotAPlayer = 6004,

    #[msg("Not your turn")]
    NotYourTurn = 6005,

    #[msg("Cell is outside the 3x3 board")]
    CellOutOfRange = 6006,

    #[msg("Cell is already occupied")]
    CellOccupied = 6007,

    #[msg("Move window has elapsed")]
    MoveTimedOut = 6008,

    #[msg("No move has been made this round")]
    NoMovesThisRound = 6009,

    #[msg("Move window has not elapsed yet")]
    TimeoutNotReached = 6010,

    #[msg("Only the waiting player may claim a timeout")]
    NotTimeoutClaimant = 6011,

    #[msg("Not the match winner")]
    NotWinner = 6012,

    #[msg("Not authorized to perform this action")]
    Unauthorized = 6013,

    #[msg("Invalid recipient")]
    InvalidRecipient = 6014,

    #[msg("Auto-refund deadline not reached")]
    DeadlineNotReached = 6015,

    #[msg("Insufficient funds for operation")]
    InsufficientFunds = 6016,

    #[msg("Gas pool cannot cover the relay fee")]
    InsufficientGas = 6017,

    #[msg("No fees to withdraw")]
    NoFeesToWithdraw = 6018,

    #[msg("Stake already withdrawn")]
    AlreadyWithdrawn = 6019,

    #[msg("Nothing left to withdraw")]
    NothingToWithdraw = 6020,

    #[msg("Match already paid out or cancelled")]
    AlreadySettled = 6021,

    #[msg("Match is not waiting for randomness")]
    RandomnessNotPending = 6022,

    #[msg("Randomness request does not belong to this match")]
    UnknownRequest = 6023,

    #[msg("Arithmetic overflow")]
    Overflow = 6024,

    #[msg("Invalid config parameters")]
    InvalidConfig = 6025,

    #[msg("Refund recipient missing from remaining_accounts")]
    MissingRecipientAccount = 6026,

    #[msg("Match account data is inconsistent")]
    CorruptMatchAccount = 6027,

    #[msg("Operation already in progress for this match")]
    Reentrant = 6028,

    #[msg("Price feed missing, stale or non-positive")]
    BadPriceFeed = 6029,

    #[msg("Swap output below slippage bound")]
    SlippageExceeded = 6030,

    #[msg("Batch lengths differ")]
    BatchLengthMismatch = 6031,
}

impl From<arena_logic::ArenaError> for ArenaError {
    fn from(err: arena_logic::ArenaError) -> Self {
        use arena_logic::ArenaError as E;
        msg!("Rejected: {}", err);
        match err {
            E::MatchNotFound(_) | E::InvalidState { .. } => ArenaError::InvalidState,
            E::RandomnessNotPending(_) => ArenaError::RandomnessNotPending,
            E::UnknownRequest(_) => ArenaError::UnknownRequest,
            E::Reentrant(_) => ArenaError::Reentrant,
            E::RosterFull => ArenaError::RosterFull,
            E::AlreadyJoined => ArenaError::AlreadyJoined,
            E::ZeroStake => ArenaError::ZeroStake,
            E::NotAPlayer => ArenaError::NotAPlayer,
            E::NotYourTurn => ArenaError::NotYourTurn,
            E::CellOutOfRange { .. } => ArenaError::CellOutOfRange,
            E::CellOccupied { .. } => ArenaError::CellOccupied,
            E::MoveTimedOut { .. } => ArenaError::MoveTimedOut,
            E::NoMovesThisRound => ArenaError::NoMovesThisRound,
            E::TimeoutNotReached { .. } => ArenaError::TimeoutNotReached,
            E::NotTimeoutClaimant => ArenaError::NotTimeoutClaimant,
            E::NotWinner => ArenaError::NotWinner,
            E::Unauthorized(_) => ArenaError::Unauthorized,
            E::InvalidRecipient => ArenaError::InvalidRecipient,
            E::BatchLengthMismatch { .. } => ArenaError::BatchLengthMismatch,
            E::DeadlineNotReached { .. } => ArenaError::DeadlineNotReached,
            E::InsufficientBalance { .. } => ArenaError::InsufficientFunds,
            E::InsufficientGas { .. } => ArenaError::InsufficientGas,
            E::NoFeesToSweep => ArenaError::NoFeesToWithdraw,
            E::SlippageExceeded { .. } => ArenaError::SlippageExceeded,
            E::FeedMissing(_) | E::NonPositivePrice(_) | E::StalePrice { .. } => {
                ArenaError::BadPriceFeed
            }
            E::AlreadyWithdrawn => ArenaError::AlreadyWithdrawn,
            E::NothingToWithdraw => ArenaError::NothingToWithdraw,
            E::AlreadySettled(_) => ArenaError::AlreadySettled,
            E::Overflow => ArenaError::Overflow,
            E::InvalidConfig(_) => ArenaError::InvalidConfig,
        }
    }
}
