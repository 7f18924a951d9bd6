//! Match lifecycle instructions

use anchor_lang::prelude::*;
use anchor_lang::system_program;
use arena_logic::{word_from_randomness, Match, MoveOutcome, RoundAdvance, RoundResult};
use crate::state::{identity, Config, MatchAccount, RandomnessRequest};
use crate::error::ArenaError;
use super::payout::settle_refunds;

/// Open a new match
#[derive(Accounts)]
pub struct CreateMatch<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        init,
        payer = creator,
        space = MatchAccount::LEN,
        seeds = [b"match", config.next_match_id.to_le_bytes().as_ref()],
        bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    #[account(mut)]
    pub creator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn create_match(ctx: Context<CreateMatch>) -> Result<()> {
    let config = &mut ctx.accounts.config;
    let match_account = &mut ctx.accounts.match_account;
    let clock = Clock::get()?;

    let id = config.next_match_id;
    let rules = config.match_rules();
    let m = Match::new(id, rules, clock.unix_timestamp);

    match_account.id = id;
    match_account.house_fee_bps = config.house_fee_bps;
    match_account.max_rounds = rules.max_rounds;
    match_account.move_timeout = rules.move_timeout;
    match_account.refund_window = rules.refund_window;
    match_account.request_id = 0;
    match_account.bump = ctx.bumps.match_account;
    match_account.store(&m);

    config.next_match_id = id.checked_add(1).ok_or(ArenaError::Overflow)?;

    msg!(
        "Match #{} created by {}, auto-refund at {}",
        id,
        ctx.accounts.creator.key(),
        match_account.auto_refund_deadline,
    );
    Ok(())
}

/// Join an open match with a lamport stake
#[derive(Accounts)]
pub struct JoinMatch<'info> {
    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    #[account(mut)]
    pub player: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn join_match(ctx: Context<JoinMatch>, stake: u64) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let player = &ctx.accounts.player;

    let mut m = match_account.to_logic()?;
    m.join(identity(&player.key()), stake)
        .map_err(ArenaError::from)?;

    // Transfer stake from player into the match escrow
    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: player.to_account_info(),
                to: match_account.to_account_info(),
            },
        ),
        stake,
    )?;
    match_account.store(&m);

    msg!(
        "Player {} joined match #{} with {} lamports ({} players)",
        player.key(),
        match_account.id,
        stake,
        match_account.players.len(),
    );
    Ok(())
}

/// Lock the roster and open a randomness request
#[derive(Accounts)]
pub struct StartMatch<'info> {
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

    #[account(
        init,
        payer = caller,
        space = RandomnessRequest::LEN,
        seeds = [b"request", config.next_request_id.to_le_bytes().as_ref()],
        bump
    )]
    pub request: Account<'info, RandomnessRequest>,

    #[account(mut)]
    pub caller: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn start_match(ctx: Context<StartMatch>) -> Result<()> {
    let config = &mut ctx.accounts.config;
    let match_account = &mut ctx.accounts.match_account;
    let request = &mut ctx.accounts.request;

    let mut m = match_account.to_logic()?;
    m.start().map_err(ArenaError::from)?;

    let request_id = config.next_request_id;
    request.request_id = request_id;
    request.match_account = match_account.key();
    request.match_id = match_account.id;
    request.bump = ctx.bumps.request;

    config.next_request_id = request_id.checked_add(1).ok_or(ArenaError::Overflow)?;
    match_account.request_id = request_id;
    match_account.store(&m);

    msg!("Match #{} requested randomness #{}", match_account.id, request_id);
    Ok(())
}

/// Oracle delivers randomness for a pending request
#[derive(Accounts)]
pub struct FulfillRandomness<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = oracle @ ArenaError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [b"request", request.request_id.to_le_bytes().as_ref()],
        bump = request.bump,
        constraint = request.match_account == match_account.key() @ ArenaError::UnknownRequest
    )]
    pub request: Account<'info, RandomnessRequest>,

    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    pub oracle: Signer<'info>,
}

pub fn fulfill_randomness(ctx: Context<FulfillRandomness>, randomness: [u8; 32]) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let request_id = ctx.accounts.request.request_id;
    let clock = Clock::get()?;

    // word = first 8 bytes of SHA256(randomness || request_id)
    let mut preimage = Vec::with_capacity(40);
    preimage.extend_from_slice(&randomness);
    preimage.extend_from_slice(&request_id.to_le_bytes());
    let digest = solana_sha256_hasher::hash(&preimage);
    let word = word_from_randomness(&digest.to_bytes());

    // Rejected once the match has left VrfPending (duplicate or late delivery)
    let mut m = match_account.to_logic()?;
    let starter = m
        .on_randomness(word, clock.unix_timestamp)
        .map_err(ArenaError::from)?;
    match_account.store(&m);

    msg!(
        "Match #{} in progress, seat {} starts (request #{})",
        match_account.id,
        starter,
        request_id,
    );
    Ok(())
}

fn log_advance(match_id: u64, advance: &RoundAdvance) {
    match advance {
        RoundAdvance::NextRound { round, starter } => {
            msg!("Match #{} round {} begins, seat {} starts", match_id, round, starter);
        }
        RoundAdvance::Finished { winner } => {
            msg!("Match #{} finished, winner {}", match_id, winner);
        }
        RoundAdvance::Cancelled { refunds } => {
            msg!("Match #{} cancelled with no round won, {} refunds", match_id, refunds.len());
        }
    }
}

/// Place a mark on the board
#[derive(Accounts)]
pub struct MakeMove<'info> {
    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    pub player: Signer<'info>,
    // Refund recipients passed via remaining_accounts
}

pub fn make_move<'info>(
    ctx: Context<'_, '_, '_, 'info, MakeMove<'info>>,
    x: u8,
    y: u8,
) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let player = &ctx.accounts.player;
    let clock = Clock::get()?;

    let mut m = match_account.to_logic()?;
    let outcome = m
        .play(&identity(&player.key()), x as usize, y as usize, clock.unix_timestamp)
        .map_err(ArenaError::from)?;
    match_account.store(&m);

    match outcome {
        MoveOutcome::Continue { next } => {
            msg!("Match #{}: {} played ({}, {}), seat {} to move", match_account.id, player.key(), x, y, next);
        }
        MoveOutcome::RoundOver { result, advance } => {
            match result {
                RoundResult::Won(seat) => msg!("Match #{}: round won by seat {}", match_account.id, seat),
                RoundResult::Draw => msg!("Match #{}: round drawn", match_account.id),
            }
            log_advance(match_account.id, &advance);
            if let RoundAdvance::Cancelled { refunds } = advance {
                settle_refunds(&match_account.to_account_info(), ctx.remaining_accounts, &refunds)?;
            }
        }
    }
    Ok(())
}

/// Waiting player claims the round after the mover stalls
#[derive(Accounts)]
pub struct ClaimTimeoutWin<'info> {
    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    pub claimant: Signer<'info>,
    // Refund recipients passed via remaining_accounts
}

pub fn claim_timeout_win<'info>(
    ctx: Context<'_, '_, '_, 'info, ClaimTimeoutWin<'info>>,
) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let claimant = &ctx.accounts.claimant;
    let clock = Clock::get()?;

    let mut m = match_account.to_logic()?;
    let advance = m
        .claim_timeout_win(&identity(&claimant.key()), clock.unix_timestamp)
        .map_err(ArenaError::from)?;
    match_account.store(&m);

    msg!("Match #{}: timeout win claimed by {}", match_account.id, claimant.key());
    log_advance(match_account.id, &advance);
    if let RoundAdvance::Cancelled { refunds } = advance {
        settle_refunds(&match_account.to_account_info(), ctx.remaining_accounts, &refunds)?;
    }
    Ok(())
}

/// Anyone may cancel a match once its deadline has passed
#[derive(Accounts)]
pub struct AutoRefundExpired<'info> {
    #[account(
        mut,
        seeds = [b"match", match_account.id.to_le_bytes().as_ref()],
        bump = match_account.bump
    )]
    pub match_account: Account<'info, MatchAccount>,

    pub caller: Signer<'info>,
    // Refund recipients passed via remaining_accounts
}

pub fn auto_refund_expired<'info>(
    ctx: Context<'_, '_, '_, 'info, AutoRefundExpired<'info>>,
) -> Result<()> {
    let match_account = &mut ctx.accounts.match_account;
    let clock = Clock::get()?;

    let mut m = match_account.to_logic()?;
    let refunds = m.expire(clock.unix_timestamp).map_err(ArenaError::from)?;
    match_account.store(&m);

    settle_refunds(&match_account.to_account_info(), ctx.remaining_accounts, &refunds)?;

    msg!(
        "Match #{} expired, {} deposits refunded (triggered by {})",
        match_account.id,
        refunds.len(),
        ctx.accounts.caller.key(),
    );
    Ok(())
}
