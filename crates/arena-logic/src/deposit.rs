//! Deposit normalization
//!
//! Deposits in arbitrary assets are priced by a `ValueNormalizer` and
//! converted by a `SwapExecutor` before they reach escrow. The router
//! rejects any conversion that returns less than the priced value minus the
//! allowed slippage.

use std::collections::BTreeMap;

use crate::error::ArenaError;
use crate::escrow::BPS_DENOMINATOR;
use crate::types::AssetId;

pub trait ValueNormalizer {
    /// Canonical (settlement-unit) value of `amount` of `asset` at `now`
    fn value_of(&self, asset: AssetId, amount: u64, now: i64) -> Result<u64, ArenaError>;
}

pub trait SwapExecutor {
    /// Convert `amount_in` of `asset_in` into settlement units
    fn convert(&mut self, asset_in: AssetId, amount_in: u64) -> Result<u64, ArenaError>;
}

impl<N: ValueNormalizer + ?Sized> ValueNormalizer for &N {
    fn value_of(&self, asset: AssetId, amount: u64, now: i64) -> Result<u64, ArenaError> {
        (**self).value_of(asset, amount, now)
    }
}

impl<S: SwapExecutor + ?Sized> SwapExecutor for &mut S {
    fn convert(&mut self, asset_in: AssetId, amount_in: u64) -> Result<u64, ArenaError> {
        (**self).convert(asset_in, amount_in)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceFeed {
    /// Settlement units per 10^decimals of the asset
    pub price: i64,
    pub decimals: u8,
    pub updated_at: i64,
}

/// Normalizer over a table of pushed price feeds
#[derive(Clone, Debug)]
pub struct PriceFeedNormalizer {
    feeds: BTreeMap<AssetId, PriceFeed>,
    max_age: i64,
}

impl PriceFeedNormalizer {
    pub fn new(max_age: i64) -> Self {
        Self {
            feeds: BTreeMap::new(),
            max_age,
        }
    }

    pub fn set_feed(&mut self, asset: AssetId, feed: PriceFeed) {
        self.feeds.insert(asset, feed);
    }
}

impl ValueNormalizer for PriceFeedNormalizer {
    fn value_of(&self, asset: AssetId, amount: u64, now: i64) -> Result<u64, ArenaError> {
        let feed = self.feeds.get(&asset).ok_or(ArenaError::FeedMissing(asset))?;
        if feed.price <= 0 {
            return Err(ArenaError::NonPositivePrice(asset));
        }
        let age = now.saturating_sub(feed.updated_at);
        if age > self.max_age {
            return Err(ArenaError::StalePrice {
                asset,
                age,
                max_age: self.max_age,
            });
        }
        let scale = 10u128
            .checked_pow(feed.decimals as u32)
            .ok_or(ArenaError::Overflow)?;
        let value = amount as u128 * feed.price as u128 / scale;
        u64::try_from(value).map_err(|_| ArenaError::Overflow)
    }
}

/// Smallest acceptable swap output for a priced value
pub fn min_output(expected: u64, max_slippage_bps: u16) -> u64 {
    let keep = BPS_DENOMINATOR.saturating_sub(max_slippage_bps as u64);
    (expected as u128 * keep as u128).div_ceil(BPS_DENOMINATOR as u128) as u64
}

pub struct DepositRouter<N, S> {
    normalizer: N,
    swapper: S,
    max_slippage_bps: u16,
}

impl<N: ValueNormalizer, S: SwapExecutor> DepositRouter<N, S> {
    pub fn new(normalizer: N, swapper: S, max_slippage_bps: u16) -> Self {
        Self {
            normalizer,
            swapper,
            max_slippage_bps,
        }
    }

    /// Price, convert and slippage-check a deposit; returns settlement units.
    /// A deposit priced at zero is rejected before the swap runs.
    pub fn settle_deposit(
        &mut self,
        asset: AssetId,
        amount: u64,
        now: i64,
    ) -> Result<u64, ArenaError> {
        let expected = self.normalizer.value_of(asset, amount, now)?;
        if expected == 0 {
            return Err(ArenaError::ZeroStake);
        }
        let minimum = min_output(expected, self.max_slippage_bps);
        let actual = self.swapper.convert(asset, amount)?;
        if actual < minimum {
            return Err(ArenaError::SlippageExceeded { minimum, actual });
        }
        Ok(actual)
    }
}
