//! Admin instructions

use anchor_lang::prelude::*;
use arena_logic::validate_rules;
use crate::state::Config;
use crate::error::ArenaError;

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct InitializeConfigParams {
    pub oracle: Pubkey,
    pub relay: Pubkey,
    pub house_fee_bps: u16,
    pub move_timeout: i64,
    pub max_rounds: u8,
    pub refund_window: i64,
    pub relay_fee: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct UpdateConfigParams {
    pub oracle: Option<Pubkey>,
    pub relay: Option<Pubkey>,
    pub house_fee_bps: Option<u16>,
    pub move_timeout: Option<i64>,
    pub max_rounds: Option<u8>,
    pub refund_window: Option<i64>,
    pub relay_fee: Option<u64>,
}

/// Initialize global config
#[derive(Accounts)]
pub struct InitializeConfig<'info> {
    #[account(
        init,
        payer = admin,
        space = Config::LEN,
        seeds = [b"config"],
        bump
    )]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn initialize_config(
    ctx: Context<InitializeConfig>,
    params: InitializeConfigParams,
) -> Result<()> {
    let InitializeConfigParams {
        oracle,
        relay,
        house_fee_bps,
        move_timeout,
        max_rounds,
        refund_window,
        relay_fee,
    } = params;

    validate_rules(house_fee_bps, move_timeout, max_rounds, refund_window)
        .map_err(ArenaError::from)?;
    require!(oracle != Pubkey::default(), ArenaError::InvalidConfig);

    let config = &mut ctx.accounts.config;

    config.admin = ctx.accounts.admin.key();
    config.oracle = oracle;
    config.relay = relay;
    config.house_fee_bps = house_fee_bps;
    config.move_timeout = move_timeout;
    config.max_rounds = max_rounds;
    config.refund_window = refund_window;
    config.relay_fee = relay_fee;
    config.accumulated_fees = 0;
    config.next_match_id = 0;
    config.next_request_id = 1;
    config.bump = ctx.bumps.config;

    msg!("Config initialized by {}, oracle = {}, relay = {}", config.admin, config.oracle, config.relay);
    msg!(
        "Fee {} bps, {} rounds, move timeout {}s, refund window {}s",
        config.house_fee_bps,
        config.max_rounds,
        config.move_timeout,
        config.refund_window,
    );

    Ok(())
}

/// Update config parameters; existing matches keep their snapshot
#[derive(Accounts)]
pub struct UpdateConfig<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ ArenaError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}

pub fn update_config(
    ctx: Context<UpdateConfig>,
    params: UpdateConfigParams,
) -> Result<()> {
    let UpdateConfigParams {
        oracle,
        relay,
        house_fee_bps,
        move_timeout,
        max_rounds,
        refund_window,
        relay_fee,
    } = params;

    let config = &mut ctx.accounts.config;

    // Validate the combined result before touching the account
    let house_fee_bps = house_fee_bps.unwrap_or(config.house_fee_bps);
    let move_timeout = move_timeout.unwrap_or(config.move_timeout);
    let max_rounds = max_rounds.unwrap_or(config.max_rounds);
    let refund_window = refund_window.unwrap_or(config.refund_window);
    validate_rules(house_fee_bps, move_timeout, max_rounds, refund_window)
        .map_err(ArenaError::from)?;

    if let Some(o) = oracle {
        require!(o != Pubkey::default(), ArenaError::InvalidConfig);
        config.oracle = o;
    }

    if let Some(r) = relay {
        config.relay = r;
    }

    if let Some(fee) = relay_fee {
        config.relay_fee = fee;
    }

    config.house_fee_bps = house_fee_bps;
    config.move_timeout = move_timeout;
    config.max_rounds = max_rounds;
    config.refund_window = refund_window;

    msg!("Config updated");
    Ok(())
}

/// Withdraw accumulated fees
#[derive(Accounts)]
pub struct WithdrawFees<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ ArenaError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn withdraw_fees(ctx: Context<WithdrawFees>) -> Result<()> {
    let config = &mut ctx.accounts.config;

    require!(config.accumulated_fees > 0, ArenaError::NoFeesToWithdraw);

    // Cap withdrawal to preserve rent-exempt minimum
    let rent = Rent::get()?;
    let min_balance = rent.minimum_balance(config.to_account_info().data_len());
    let max_withdraw = config.to_account_info().lamports().saturating_sub(min_balance);
    let amount = config.accumulated_fees.min(max_withdraw);

    config.accumulated_fees = config.accumulated_fees
        .checked_sub(amount).ok_or(ArenaError::Overflow)?;

    // Transfer from config account to admin
    **config.to_account_info().try_borrow_mut_lamports()? -= amount;
    **ctx.accounts.admin.try_borrow_mut_lamports()? += amount;

    msg!("Withdrew {} lamports in fees", amount);
    Ok(())
}
