//! Account state definitions

use anchor_lang::prelude::*;
use arena_logic::{Board, Identity, Match, MatchRules, MatchState, Player, CELL_COUNT, MAX_PLAYERS};

use crate::error::ArenaError;

/// Global configuration account
#[account]
#[derive(Default)]
pub struct Config {
    /// Admin who can update config and withdraw fees
    pub admin: Pubkey,
    /// Only signer accepted by `fulfill_randomness`
    pub oracle: Pubkey,
    /// Only signer accepted by `relayed_withdraw`
    pub relay: Pubkey,
    /// House fee in basis points (0-10000, where 100 = 1%)
    pub house_fee_bps: u16,
    /// Seconds a player has to move once the round has opened
    pub move_timeout: i64,
    /// Rounds per match
    pub max_rounds: u8,
    /// Seconds from creation until anyone may cancel and refund
    pub refund_window: i64,
    /// Lamports paid to the relay per relayed withdrawal
    pub relay_fee: u64,
    /// Accumulated fees pending withdrawal
    pub accumulated_fees: u64,
    /// Id of the next match account
    pub next_match_id: u64,
    /// Id of the next randomness request
    pub next_request_id: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl Config {
    pub const LEN: usize = 8 + // discriminator
        32 +  // admin
        32 +  // oracle
        32 +  // relay
        2 +   // house_fee_bps
        8 +   // move_timeout
        1 +   // max_rounds
        8 +   // refund_window
        8 +   // relay_fee
        8 +   // accumulated_fees
        8 +   // next_match_id
        8 +   // next_request_id
        1 +   // bump
        32;   // padding for future fields

    pub fn match_rules(&self) -> MatchRules {
        MatchRules {
            max_rounds: self.max_rounds,
            move_timeout: self.move_timeout,
            refund_window: self.refund_window,
        }
    }
}

/// Match lifecycle, mirrored from the core state machine
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchStatus {
    #[default]
    Open,
    Staked,
    VrfPending,
    InProgress,
    Finished,
    PaidOut,
    Cancelled,
}

impl From<MatchState> for MatchStatus {
    fn from(state: MatchState) -> Self {
        match state {
            MatchState::Open => MatchStatus::Open,
            MatchState::Staked => MatchStatus::Staked,
            MatchState::VrfPending => MatchStatus::VrfPending,
            MatchState::InProgress => MatchStatus::InProgress,
            MatchState::Finished => MatchStatus::Finished,
            MatchState::PaidOut => MatchStatus::PaidOut,
            MatchState::Cancelled => MatchStatus::Cancelled,
        }
    }
}

impl From<MatchStatus> for MatchState {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Open => MatchState::Open,
            MatchStatus::Staked => MatchState::Staked,
            MatchStatus::VrfPending => MatchState::VrfPending,
            MatchStatus::InProgress => MatchState::InProgress,
            MatchStatus::Finished => MatchState::Finished,
            MatchStatus::PaidOut => MatchState::PaidOut,
            MatchStatus::Cancelled => MatchState::Cancelled,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PlayerRecord {
    pub player: Pubkey,
    /// Stake in lamports
    pub deposited: u64,
    pub wins: u8,
    pub withdrawn: bool,
}

impl PlayerRecord {
    pub const LEN: usize = 32 + 8 + 1 + 1;
}

/// Match account; its lamports above rent are the match escrow
#[account]
#[derive(Default)]
pub struct MatchAccount {
    pub id: u64,
    pub status: MatchStatus,
    /// Join order, at most two
    pub players: Vec<PlayerRecord>,
    pub current_round: u8,
    pub starter_index: u8,
    pub last_round_starter_index: u8,
    pub current_player_index: u8,
    pub winner: Option<Pubkey>,
    /// Row-major cells: 0 empty, 1 first seat, 2 second seat
    pub board: [u8; CELL_COUNT],
    pub move_count: u8,
    pub total_stake: u64,
    pub created_at: i64,
    pub last_move_time: i64,
    pub auto_refund_deadline: i64,

    // Snapshotted from Config at creation (immutable after)
    pub house_fee_bps: u16,
    pub max_rounds: u8,
    pub move_timeout: i64,
    pub refund_window: i64,

    /// Randomness request issued by `start_match` (0 before start)
    pub request_id: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl MatchAccount {
    pub const LEN: usize = 8 + // discriminator
        8 +   // id
        1 +   // status
        4 + MAX_PLAYERS * PlayerRecord::LEN + // players
        1 +   // current_round
        1 +   // starter_index
        1 +   // last_round_starter_index
        1 +   // current_player_index
        33 +  // winner
        CELL_COUNT + // board
        1 +   // move_count
        8 +   // total_stake
        8 +   // created_at
        8 +   // last_move_time
        8 +   // auto_refund_deadline
        2 +   // house_fee_bps
        1 +   // max_rounds
        8 +   // move_timeout
        8 +   // refund_window
        8 +   // request_id
        1 +   // bump
        16;   // padding

    /// Load into the core state machine
    pub fn to_logic(&self) -> Result<Match> {
        let board = Board::from_bytes(&self.board, self.move_count)
            .ok_or(ArenaError::CorruptMatchAccount)?;
        Ok(Match {
            id: self.id,
            state: self.status.into(),
            players: self
                .players
                .iter()
                .map(|p| Player {
                    identity: identity(&p.player),
                    deposited: p.deposited,
                    wins: p.wins,
                    withdrawn: p.withdrawn,
                })
                .collect(),
            current_round: self.current_round,
            starter_index: self.starter_index as usize,
            last_round_starter_index: self.last_round_starter_index as usize,
            current_player_index: self.current_player_index as usize,
            winner: self.winner.as_ref().map(identity),
            board,
            total_stake: self.total_stake,
            created_at: self.created_at,
            last_move_time: self.last_move_time,
            auto_refund_deadline: self.auto_refund_deadline,
            rules: MatchRules {
                max_rounds: self.max_rounds,
                move_timeout: self.move_timeout,
                refund_window: self.refund_window,
            },
        })
    }

    /// Write a core match back; snapshot fields are left as they are
    pub fn store(&mut self, m: &Match) {
        self.status = m.state.into();
        self.players = m
            .players
            .iter()
            .map(|p| PlayerRecord {
                player: pubkey(&p.identity),
                deposited: p.deposited,
                wins: p.wins,
                withdrawn: p.withdrawn,
            })
            .collect();
        self.current_round = m.current_round;
        self.starter_index = m.starter_index as u8;
        self.last_round_starter_index = m.last_round_starter_index as u8;
        self.current_player_index = m.current_player_index as u8;
        self.winner = m.winner.as_ref().map(pubkey);
        self.board = m.board.to_bytes();
        self.move_count = m.board.move_count;
        self.total_stake = m.total_stake;
        self.created_at = m.created_at;
        self.last_move_time = m.last_move_time;
        self.auto_refund_deadline = m.auto_refund_deadline;
    }
}

/// Maps a randomness request back to its match
#[account]
#[derive(Default)]
pub struct RandomnessRequest {
    pub request_id: u64,
    pub match_account: Pubkey,
    pub match_id: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl RandomnessRequest {
    pub const LEN: usize = 8 + 8 + 32 + 8 + 1;
}

/// Per-player prepaid relay fees
#[account]
#[derive(Default)]
pub struct GasPool {
    pub owner: Pubkey,
    /// Lamports available for relay fees
    pub balance: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl GasPool {
    pub const LEN: usize = 8 + 32 + 8 + 1;
}

pub fn identity(key: &Pubkey) -> Identity {
    Identity::new(key.to_bytes())
}

pub fn pubkey(identity: &Identity) -> Pubkey {
    Pubkey::new_from_array(identity.to_bytes())
}
