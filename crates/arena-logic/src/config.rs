//! Arena configuration

use serde::{Deserialize, Serialize};

use crate::board::CELL_COUNT;
use crate::error::ArenaError;
use crate::game::MatchRules;
use crate::types::Identity;

/// House fee on winner payouts, in basis points (2.5%)
pub const DEFAULT_HOUSE_FEE_BPS: u16 = 250;
/// Window for each move after the opening move of a round
pub const DEFAULT_MOVE_TIMEOUT_SECS: i64 = 300;
pub const DEFAULT_MAX_ROUNDS: u8 = 5;
/// Auto-refund opens this long after creation (24h)
pub const DEFAULT_REFUND_WINDOW_SECS: i64 = 86_400;
/// Sponsorship pool charge per relayed withdrawal
pub const DEFAULT_RELAY_FEE: u64 = 5_000;
pub const DEFAULT_MAX_PRICE_AGE_SECS: i64 = 3_600;
/// 1% maximum slippage on deposit swaps
pub const DEFAULT_MAX_SLIPPAGE_BPS: u16 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Receives swept protocol fees
    pub owner: Identity,
    /// Only identity allowed to deliver randomness
    pub oracle: Identity,
    /// Only identity allowed to submit relayed withdrawals
    pub relay: Identity,
    pub house_fee_bps: u16,
    pub move_timeout_secs: i64,
    pub max_rounds: u8,
    pub refund_window_secs: i64,
    pub relay_fee: u64,
    pub max_price_age_secs: i64,
    pub max_slippage_bps: u16,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            owner: Identity::ZERO,
            oracle: Identity::ZERO,
            relay: Identity::ZERO,
            house_fee_bps: DEFAULT_HOUSE_FEE_BPS,
            move_timeout_secs: DEFAULT_MOVE_TIMEOUT_SECS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            refund_window_secs: DEFAULT_REFUND_WINDOW_SECS,
            relay_fee: DEFAULT_RELAY_FEE,
            max_price_age_secs: DEFAULT_MAX_PRICE_AGE_SECS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
        }
    }
}

impl ArenaConfig {
    pub fn from_json(json: &str) -> Result<Self, ArenaError> {
        let config: ArenaConfig =
            serde_json::from_str(json).map_err(|e| ArenaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        validate_rules(
            self.house_fee_bps,
            self.move_timeout_secs,
            self.max_rounds,
            self.refund_window_secs,
        )?;
        if self.max_slippage_bps as u64 > crate::escrow::BPS_DENOMINATOR {
            return Err(ArenaError::InvalidConfig(
                "max_slippage_bps exceeds 10000".to_string(),
            ));
        }
        if self.max_price_age_secs <= 0 {
            return Err(ArenaError::InvalidConfig(
                "max_price_age_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-match snapshot taken at creation
    pub fn match_rules(&self) -> MatchRules {
        MatchRules {
            max_rounds: self.max_rounds,
            move_timeout: self.move_timeout_secs,
            refund_window: self.refund_window_secs,
        }
    }
}

/// Checks shared with the on-chain config account.
///
/// The refund window is sized against the timed moves of a full match
/// (`max_rounds * 9 * move_timeout`). This is a sizing floor only: the
/// deadline runs from creation, and the opening move of each round is
/// untimed, so a slow match can still reach auto-refund mid-play.
pub fn validate_rules(
    house_fee_bps: u16,
    move_timeout_secs: i64,
    max_rounds: u8,
    refund_window_secs: i64,
) -> Result<(), ArenaError> {
    if house_fee_bps as u64 > crate::escrow::BPS_DENOMINATOR {
        return Err(ArenaError::InvalidConfig(
            "house_fee_bps exceeds 10000".to_string(),
        ));
    }
    if move_timeout_secs <= 0 {
        return Err(ArenaError::InvalidConfig(
            "move_timeout_secs must be positive".to_string(),
        ));
    }
    if max_rounds == 0 || max_rounds as usize > CELL_COUNT {
        return Err(ArenaError::InvalidConfig(format!(
            "max_rounds must be within 1..={}",
            CELL_COUNT
        )));
    }
    let slowest_match = (max_rounds as i64)
        .checked_mul(CELL_COUNT as i64)
        .and_then(|moves| moves.checked_mul(move_timeout_secs))
        .ok_or(ArenaError::Overflow)?;
    if refund_window_secs < slowest_match {
        return Err(ArenaError::InvalidConfig(format!(
            "refund_window_secs {} shorter than slowest match {}",
            refund_window_secs, slowest_match
        )));
    }
    Ok(())
}
