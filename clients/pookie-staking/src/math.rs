//! Reward accrual arithmetic
//!
//! Rewards accrue linearly per staked NFT at `daily_rate` whole tokens per
//! day, from `max(staked_at, last_claimed_at)` until now.

use crate::state::StakeRecord;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Whole reward tokens per staked NFT per day
pub const DAILY_REWARD_RATE: u64 = 250;

/// Reward token decimals
pub const REWARD_DECIMALS: u8 = 9;

/// Accrued whole tokens at the default rate
pub fn accrual(record: &StakeRecord, now: u64) -> u64 {
    RewardSchedule::default().accrual(record, now)
}

/// Seconds elapsed since rewards started accruing, zero under clock skew
pub fn elapsed_since_claim(record: &StakeRecord, now: u64) -> u64 {
    now.saturating_sub(record.accrual_start())
}

/// Whole days since the NFT was staked
pub fn days_staked(record: &StakeRecord, now: u64) -> u64 {
    now.saturating_sub(record.staked_at) / SECONDS_PER_DAY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSchedule {
    pub daily_rate: u64,
    pub decimals: u8,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            daily_rate: DAILY_REWARD_RATE,
            decimals: REWARD_DECIMALS,
        }
    }
}

impl RewardSchedule {
    pub fn new(daily_rate: u64, decimals: u8) -> Self {
        Self {
            daily_rate,
            decimals,
        }
    }

    /// `⌊elapsed / 86400 × daily_rate⌋` in whole tokens
    pub fn accrual(&self, record: &StakeRecord, now: u64) -> u64 {
        scaled_accrual(elapsed_since_claim(record, now), self.daily_rate as u128)
    }

    /// Raw token amount the program pays for the same elapsed time
    pub fn accrual_base_units(&self, record: &StakeRecord, now: u64) -> u64 {
        let rate = (self.daily_rate as u128)
            .saturating_mul(10u128.saturating_pow(self.decimals as u32));
        scaled_accrual(elapsed_since_claim(record, now), rate)
    }

    /// Convert whole tokens to base units
    pub fn to_base_units(&self, tokens: u64) -> u64 {
        let scaled =
            (tokens as u128).saturating_mul(10u128.saturating_pow(self.decimals as u32));
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

fn scaled_accrual(elapsed: u64, rate_per_day: u128) -> u64 {
    let reward = (elapsed as u128).saturating_mul(rate_per_day) / SECONDS_PER_DAY as u128;
    u64::try_from(reward).unwrap_or(u64::MAX)
}
