//! Escrow release, withdrawals and gasless relay

use anchor_lang::prelude::*;
use anchor_lang::system_program;
use arena_logic::{split_fee, Disbursement, DisbursementKind};
use crate::state::{identity, pubkey, Config, GasPool, MatchAccount};
use crate::error::ArenaError;

/// Lamports held by `account` above its rent-exempt minimum
fn spendable(account: &AccountInfo) -> Result<u64> {
    let rent = Rent::get()?;
    let min_balance = rent.minimum_balance(account.data_len());
    Ok(account.lamports().saturating_sub(min_balance))
}

fn move_lamports(from: &AccountInfo, to: &AccountInfo, amount: u64) -> Result<()> {
    **from.try_borrow_mut_lamports()? -= amount;
    **to.try_borrow_mut_lamports()? += amount;
    Ok(())
}

/// Pay one disbursement out of a match escrow. Payouts leave the house fee
/// in the config account; refunds are fee-free.
///
/// Returns (paid to recipient, fee).
pub(crate) fn disburse<'info>(
    match_info: &AccountInfo<'info>,
    config: &mut Account<'info, Config>,
    recipient: &AccountInfo<'info>,
    owed: &Disbursement,
    fee_bps: u16,
) -> Result<(u64, u64)> {
    require!(
        spendable(match_info)? >= owed.amount,
        ArenaError::InsufficientFunds
    );
    let (payout, fee) = match owed.kind {
        DisbursementKind::Payout => split_fee(owed.amount, fee_bps),
        DisbursementKind::Refund => (owed.amount, 0),
    };

    if fee > 0 {
        config.accumulated_fees = config.accumulated_fees
            .checked_add(fee).ok_or(ArenaError::Overflow)?;
        move_lamports(match_info, &config.to_account_info(), fee)?;
    }
    move_lamports(match_info, recipient, payout)?;
    Ok((payout, fee))
}

/// Refund every cancelled deposit to its owner. Recipients are looked up in
/// `remaining_accounts`; the combined total is checked before any transfer.
pub(crate) fn settle_refunds<'info>(
    match_info: &AccountInfo<'info>,
    remaining_accounts: &[AccountInfo<'info>],
    refunds: &[Disbursement],
) -> Result<()> {
    let total = refunds
        .iter()
        .try_fold(0u64, |acc, d| acc.checked_add(d.amount))
        .ok_or(ArenaError::Overflow)?;
    require!(spendable(match_info)? >= total, ArenaError::InsufficientFunds);

    for owed in refunds {
        let recipient_key = pubkey(&owed.recipient);
        let recipient = remaining_accounts
            .iter()
            .find(|a| a.key() == recipient_key)
            .ok_or(ArenaError::MissingRecipientAccount)?;
        require!(recipient.is_writable, ArenaError::MissingRecipientAccount);

        move_lamports(match_info, recipient, owed.amount)?;
        msg!("Refunded {} lamports to {}", owed.amount, recipient_key);
    }
    Ok(())
}

/// Winner collects the pot
#[derive(Accounts)]
pub struct WithdrawPrize<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    #[account(mut)]
    pub winner: Signer<'info>,
}

pub fn withdraw_prize(ctx: Context<WithdrawPrize>) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let winner = &ctx.accounts.winner;

    let mut m = match_account.to_logic()?;
    let owed = m
        .withdraw_prize(&identity(&winner.key()))
        .map_err(ArenaError::from)?;

    // Withdrawn flags and PaidOut are committed before lamports leave escrow
    match_account.store(&m);

    let (payout, fee) = disburse(
        &match_account.to_account_info(),
        &mut ctx.accounts.config,
        &winner.to_account_info(),
        &owed,
        match_account.house_fee_bps,
    )?;

    msg!(
        "Match {} prize paid to {}: {} lamports (fee {})",
        match_account.id,
        winner.key(),
        payout,
        fee,
    );
    Ok(())
}

/// Withdraw the signer's own deposit
#[derive(Accounts)]
pub struct WithdrawStake<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    #[account(mut)]
    pub player: Signer<'info>,
}

pub fn withdraw_stake(ctx: Context<WithdrawStake>) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let player = &ctx.accounts.player;

    let mut m = match_account.to_logic()?;
    let owed = m
        .withdraw_stake(&identity(&player.key()))
        .map_err(ArenaError::from)?;
    match_account.store(&m);

    let (payout, fee) = disburse(
        &match_account.to_account_info(),
        &mut ctx.accounts.config,
        &player.to_account_info(),
        &owed,
        match_account.house_fee_bps,
    )?;

    msg!(
        "Match {} stake withdrawn by {}: {} lamports (fee {})",
        match_account.id,
        player.key(),
        payout,
        fee,
    );
    Ok(())
}

/// Prepay relay fees for gasless withdrawals
#[derive(Accounts)]
pub struct FundGasPool<'info> {
    #[account(
        init_if_needed,
        payer = owner,
        space = GasPool::LEN,
        seeds = [b"gas", owner.key().as_ref()],
        bump
    )]
    pub gas_pool: Account<'info, GasPool>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn fund_gas_pool(ctx: Context<FundGasPool>, amount: u64) -> Result<()> {
    let gas_pool = &mut ctx.accounts.gas_pool;
    let owner = &ctx.accounts.owner;

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: owner.to_account_info(),
                to: gas_pool.to_account_info(),
            },
        ),
        amount,
    )?;

    gas_pool.owner = owner.key();
    gas_pool.bump = ctx.bumps.gas_pool;
    gas_pool.balance = gas_pool.balance
        .checked_add(amount).ok_or(ArenaError::Overflow)?;

    msg!("Gas pool of {} funded to {} lamports", owner.key(), gas_pool.balance);
    Ok(())
}

/// Relay submits `withdraw_stake` for `recipient`, paid from their gas pool
#[derive(Accounts)]
pub struct RelayedWithdraw<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump,
        has_one = relay @ ArenaError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    /// CHECK: only receives lamports; must be a player of `match_account`,
    /// which the state machine enforces
    #[account(mut)]
    pub recipient: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [b"gas", recipient.key().as_ref()],
        bump = gas_pool.bump,
        constraint = gas_pool.owner == recipient.key() @ ArenaError::InvalidRecipient
    )]
    pub gas_pool: Account<'info, GasPool>,

    #[account(mut)]
    pub relay: Signer<'info>,
}

pub fn relayed_withdraw(ctx: Context<RelayedWithdraw>) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let gas_pool = &mut ctx.accounts.gas_pool;
    let recipient = &ctx.accounts.recipient;
    let relay_fee = ctx.accounts.config.relay_fee;

    require!(
        recipient.key() != Pubkey::default(),
        ArenaError::InvalidRecipient
    );
    require!(gas_pool.balance >= relay_fee, ArenaError::InsufficientGas);

    let mut m = match_account.to_logic()?;
    let owed = m
        .withdraw_stake(&identity(&recipient.key()))
        .map_err(ArenaError::from)?;
    match_account.store(&m);
    gas_pool.balance -= relay_fee;

    let (payout, fee) = disburse(
        &match_account.to_account_info(),
        &mut ctx.accounts.config,
        &recipient.to_account_info(),
        &owed,
        match_account.house_fee_bps,
    )?;
    move_lamports(
        &gas_pool.to_account_info(),
        &ctx.accounts.relay.to_account_info(),
        relay_fee,
    )?;

    msg!(
        "Relayed withdrawal from match {} to {}: {} lamports (fee {}, relay fee {})",
        match_account.id,
        recipient.key(),
        payout,
        fee,
        relay_fee,
    );
    Ok(())
}
