use std::{path::Path, time::Duration};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use solana_program::pubkey::Pubkey;

use crate::{
    error::StakingError,
    math::{RewardSchedule, DAILY_REWARD_RATE, REWARD_DECIMALS},
    pda,
    serde::{serde_opt_pubkey, serde_pubkey},
    state::AccountLayout,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// RUST_LOG compatible settings string. Default "info"
    #[serde(default = "default_log")]
    pub log: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Wallet keypair used by the command line client
    #[serde(default)]
    pub keypair_path: Option<String>,
    #[serde(default, deserialize_with = "serde_opt_pubkey::deserialize")]
    pub staking_program_id: Option<Pubkey>,
    #[serde(default, deserialize_with = "serde_opt_pubkey::deserialize")]
    pub reward_mint: Option<Pubkey>,
    /// Defaults to the program authority's associated token account for the
    /// reward mint
    #[serde(default, deserialize_with = "serde_opt_pubkey::deserialize")]
    pub reward_treasury: Option<Pubkey>,
    #[serde(
        default = "default_token_program",
        deserialize_with = "serde_pubkey::deserialize"
    )]
    pub nft_token_program: Pubkey,
    #[serde(
        default = "default_token_program",
        deserialize_with = "serde_pubkey::deserialize"
    )]
    pub reward_token_program: Pubkey,
    #[serde(default)]
    pub account_layout: AccountLayout,
    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,
    /// Micro-lamports per compute unit, 0 = no priority fee
    #[serde(default)]
    pub compute_unit_price: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_daily_reward_rate")]
    pub daily_reward_rate: u64,
    #[serde(default = "default_reward_decimals")]
    pub reward_decimals: u8,
}

fn default_log() -> String {
    "info".to_string()
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_token_program() -> Pubkey {
    spl_token::id()
}

fn default_compute_unit_limit() -> u32 {
    DEFAULT_COMPUTE_UNIT_LIMIT
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_batch_delay_ms() -> u64 {
    DEFAULT_BATCH_DELAY.as_millis() as u64
}

fn default_daily_reward_rate() -> u64 {
    DAILY_REWARD_RATE
}

fn default_reward_decimals() -> u8 {
    REWARD_DECIMALS
}

pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 400_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_200);
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

impl Settings {
    /// Load Settings from a given path. Settings are loaded from a given
    /// optional path and can be overriden with environment variables.
    ///
    /// Environment overrides have the same name as the entries in the
    /// settings file in uppercase and prefixed with "POOKIE__". For example
    /// "POOKIE__RPC_URL" will override the rpc_url setting.
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = path {
            builder = builder
                .add_source(File::with_name(&file.as_ref().to_string_lossy()).required(false));
        }
        builder
            .add_source(Environment::with_prefix("POOKIE").separator("__"))
            .build()
            .and_then(|config| config.try_deserialize())
    }

    /// Load Settings from TOML text, without environment overrides
    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .and_then(|config| config.try_deserialize())
    }

    /// Validate and resolve into the configuration the client runs with
    pub fn staking_config(&self) -> Result<StakingConfig, StakingError> {
        let program_id = self
            .staking_program_id
            .ok_or(StakingError::MissingConfiguration("staking_program_id"))?;
        let reward_mint = self
            .reward_mint
            .ok_or(StakingError::MissingConfiguration("reward_mint"))?;

        let mut config = StakingConfig::new(program_id, reward_mint)?;
        config.nft_token_program = self.nft_token_program;
        config.reward_token_program = self.reward_token_program;
        config.reward_treasury = match self.reward_treasury {
            Some(treasury) => treasury,
            None => config.default_reward_treasury(),
        };
        config.account_layout = self.account_layout;
        config.compute_unit_limit = self.compute_unit_limit;
        config.compute_unit_price = self.compute_unit_price;
        config.max_attempts = self.max_attempts;
        config.retry_delay = Duration::from_millis(self.retry_delay_ms);
        config.batch_delay = Duration::from_millis(self.batch_delay_ms);
        config.rewards = RewardSchedule::new(self.daily_reward_rate, self.reward_decimals);
        Ok(config)
    }
}

/// Resolved addresses and tuning for one deployment of the staking program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingConfig {
    pub program_id: Pubkey,
    pub program_authority: Pubkey,
    pub reward_mint: Pubkey,
    pub reward_treasury: Pubkey,
    pub nft_token_program: Pubkey,
    pub reward_token_program: Pubkey,
    pub account_layout: AccountLayout,
    pub compute_unit_limit: u32,
    pub compute_unit_price: u64,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub batch_delay: Duration,
    pub rewards: RewardSchedule,
}

impl StakingConfig {
    /// Configuration with defaults for everything but the two required
    /// addresses
    pub fn new(program_id: Pubkey, reward_mint: Pubkey) -> Result<Self, StakingError> {
        let (program_authority, _) = pda::derive_program_authority(&program_id)?;
        let reward_token_program = spl_token::id();
        Ok(Self {
            program_id,
            program_authority,
            reward_mint,
            reward_treasury: pda::derive_associated_token_account(
                &reward_mint,
                &program_authority,
                &reward_token_program,
            ),
            nft_token_program: spl_token::id(),
            reward_token_program,
            account_layout: AccountLayout::default(),
            compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            compute_unit_price: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            batch_delay: DEFAULT_BATCH_DELAY,
            rewards: RewardSchedule::default(),
        })
    }

    /// Program authority's associated token account for the reward mint
    pub fn default_reward_treasury(&self) -> Pubkey {
        pda::derive_associated_token_account(
            &self.reward_mint,
            &self.program_authority,
            &self.reward_token_program,
        )
    }
}
