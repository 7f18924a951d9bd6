//! Tic-Tac-Toe Arena - staked best-of-N Tic-Tac-Toe matches
//!
//! A Solana program for two-player matches where both players stake
//! lamports, the first starter is drawn from oracle randomness, and the
//! winner takes the pot less the house fee.

use anchor_lang::prelude::*;

#[cfg(not(feature = "no-entrypoint"))]
use solana_security_txt::security_txt;

mod state;
mod instructions;
mod error;

use instructions::*;
pub use state::MatchStatus;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

#[cfg(not(feature = "no-entrypoint"))]
security_txt! {
    name: "Tic-Tac-Toe Arena",
    project_url: "https://github.com/makoto-kusanagi/tictactoe-arena",
    contacts: "link:https://github.com/makoto-kusanagi/tictactoe-arena/security",
    policy: "https://github.com/makoto-kusanagi/tictactoe-arena/security/policy",
    preferred_languages: "en",
    source_code: "https://github.com/makoto-kusanagi/tictactoe-arena"
}

#[program]
pub mod tictactoe_arena {
    use super::*;

    /// Initialize the global config (one-time setup)
    pub fn initialize_config(
        ctx: Context<InitializeConfig>,
        params: InitializeConfigParams,
    ) -> Result<()> {
        instructions::admin::initialize_config(ctx, params)
    }

    /// Update config parameters (admin only)
    pub fn update_config(
        ctx: Context<UpdateConfig>,
        params: UpdateConfigParams,
    ) -> Result<()> {
        instructions::admin::update_config(ctx, params)
    }

    /// Withdraw accumulated house fees (admin only)
    pub fn withdraw_fees(ctx: Context<WithdrawFees>) -> Result<()> {
        instructions::admin::withdraw_fees(ctx)
    }

    /// Open a new match with the current config snapshotted into it
    pub fn create_match(ctx: Context<CreateMatch>) -> Result<()> {
        instructions::game::create_match(ctx)
    }

    /// Join an open match, staking `stake` lamports
    pub fn join_match(ctx: Context<JoinMatch>, stake: u64) -> Result<()> {
        instructions::game::join_match(ctx, stake)
    }

    /// Lock a full roster and request randomness for the first starter
    pub fn start_match(ctx: Context<StartMatch>) -> Result<()> {
        instructions::game::start_match(ctx)
    }

    /// Oracle callback delivering randomness for a pending request
    pub fn fulfill_randomness(
        ctx: Context<FulfillRandomness>,
        randomness: [u8; 32],
    ) -> Result<()> {
        instructions::game::fulfill_randomness(ctx, randomness)
    }

    /// Place a mark; refund accounts go in remaining_accounts
    pub fn make_move<'info>(
        ctx: Context<'_, '_, '_, 'info, MakeMove<'info>>,
        x: u8,
        y: u8,
    ) -> Result<()> {
        instructions::game::make_move(ctx, x, y)
    }

    /// Win the round when the opponent has stalled past the move window
    pub fn claim_timeout_win<'info>(
        ctx: Context<'_, '_, '_, 'info, ClaimTimeoutWin<'info>>,
    ) -> Result<()> {
        instructions::game::claim_timeout_win(ctx)
    }

    /// Cancel a match past its deadline and refund every unwithdrawn deposit
    pub fn auto_refund_expired<'info>(
        ctx: Context<'_, '_, '_, 'info, AutoRefundExpired<'info>>,
    ) -> Result<()> {
        instructions::game::auto_refund_expired(ctx)
    }

    /// Winner collects the pot less the house fee
    pub fn withdraw_prize(ctx: Context<WithdrawPrize>) -> Result<()> {
        instructions::payout::withdraw_prize(ctx)
    }

    /// Withdraw the caller's own deposit (refund, or the winner's share)
    pub fn withdraw_stake(ctx: Context<WithdrawStake>) -> Result<()> {
        instructions::payout::withdraw_stake(ctx)
    }

    /// Pre-fund relay fees for gasless withdrawals
    pub fn fund_gas_pool(ctx: Context<FundGasPool>, amount: u64) -> Result<()> {
        instructions::payout::fund_gas_pool(ctx, amount)
    }

    /// Relay-submitted `withdraw_stake` on behalf of a player
    pub fn relayed_withdraw(ctx: Context<RelayedWithdraw>) -> Result<()> {
        instructions::payout::relayed_withdraw(ctx)
    }
}
