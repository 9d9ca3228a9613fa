//! Staking operations for one wallet
//!
//! Preconditions (staked state, balance, claimable reward) are checked
//! against fresh account reads before any transaction is built, so a
//! rejected operation never costs a signature or a network submission.

use std::collections::HashMap;

use solana_program::{program_pack::Pack, pubkey::Pubkey, rent::Rent};
use solana_sdk::signature::Signature;
use spl_token_2022::{extension::StateWithExtensions, state::Account as TokenAccount};
use tracing::{info, warn};

use crate::{
    config::StakingConfig,
    error::{DecodeError, StakingError},
    instructions::{InstructionBuilder, StakeAccounts, UnsignedTransaction},
    math,
    rpc::RpcConnection,
    signer::TransactionSigner,
    state::{AccountLayout, StakeRecord},
    submit::TransactionSubmitter,
};

/// Lamports set aside for transaction and priority fees in the balance check
pub const FEE_ALLOWANCE_LAMPORTS: u64 = 10_000;

/// Wall-clock source in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Staking state of one NFT as read from chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakingInfo {
    pub mint: Pubkey,
    pub is_staked: bool,
    pub staked_at: Option<u64>,
    pub days_staked: u64,
    /// Live reward estimate in whole tokens
    pub current_reward: u64,
    /// `None` when unstaked, or staked with undecodable data
    pub record: Option<StakeRecord>,
}

impl StakingInfo {
    pub fn unstaked(mint: Pubkey) -> Self {
        Self {
            mint,
            is_staked: false,
            staked_at: None,
            days_staked: 0,
            current_reward: 0,
            record: None,
        }
    }

    /// Build from raw stake account data. Existing but undecodable data
    /// still counts as staked, with the reward unknown. An account whose
    /// initialized flag is clear is not a stake.
    pub fn from_account_data(
        mint: Pubkey,
        data: Option<&[u8]>,
        config: &StakingConfig,
        now: u64,
    ) -> Self {
        let Some(data) = data else {
            return Self::unstaked(mint);
        };
        match StakeRecord::decode(data, config.account_layout) {
            Ok(record) => Self::from_record(record, config, now),
            Err(DecodeError::Uninitialized) => Self::unstaked(mint),
            Err(err) => {
                warn!(%mint, ?err, "stake account exists but could not be decoded");
                Self {
                    is_staked: true,
                    ..Self::unstaked(mint)
                }
            }
        }
    }

    pub fn from_record(record: StakeRecord, config: &StakingConfig, now: u64) -> Self {
        Self {
            mint: record.mint,
            is_staked: true,
            staked_at: Some(record.staked_at),
            days_staked: math::days_staked(&record, now),
            current_reward: config.rewards.accrual(&record, now),
            record: Some(record),
        }
    }

    /// Recompute the time-dependent fields for `now`
    pub fn at(&self, config: &StakingConfig, now: u64) -> Self {
        match self.record {
            Some(record) => Self {
                mint: self.mint,
                ..Self::from_record(record, config, now)
            },
            None => *self,
        }
    }

    pub fn reward_known(&self) -> bool {
        !self.is_staked || self.record.is_some()
    }
}

/// Per-NFT results of a batch operation; failures never abort the batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<(Pubkey, Signature)>,
    pub failed: Vec<(Pubkey, StakingError)>,
}

impl BatchOutcome {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    fn record(&mut self, mint: Pubkey, result: Result<Signature, StakingError>) {
        match result {
            Ok(signature) => self.succeeded.push((mint, signature)),
            Err(err) => self.failed.push((mint, err)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Stake,
    Unstake,
    Claim,
}

pub struct StakingClient<R, S, C = SystemClock> {
    rpc: R,
    signer: S,
    clock: C,
    config: StakingConfig,
    submitter: TransactionSubmitter,
}

impl<R, S> StakingClient<R, S, SystemClock>
where
    R: RpcConnection,
    S: TransactionSigner,
{
    pub fn new(rpc: R, signer: S, config: StakingConfig) -> Self {
        let submitter = TransactionSubmitter::from_config(&config);
        Self {
            rpc,
            signer,
            clock: SystemClock,
            config,
            submitter,
        }
    }
}

impl<R, S, C> StakingClient<R, S, C>
where
    R: RpcConnection,
    S: TransactionSigner,
    C: Clock,
{
    pub fn with_clock<T: Clock>(self, clock: T) -> StakingClient<R, S, T> {
        StakingClient {
            rpc: self.rpc,
            signer: self.signer,
            clock,
            config: self.config,
            submitter: self.submitter,
        }
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn owner(&self) -> Pubkey {
        self.signer.public_key()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Addresses for `mint` staked by this client's wallet
    pub fn accounts(&self, mint: &Pubkey) -> Result<StakeAccounts, StakingError> {
        StakeAccounts::derive(&self.config, mint, &self.owner())
    }

    /// Lamports a wallet needs to cover a stake: rent for the stake
    /// account, rent for one token account, and fees
    pub fn required_lamports(&self) -> u64 {
        required_lamports(self.config.account_layout)
    }

    /// Lamport balance of this client's wallet
    pub async fn balance(&self) -> Result<u64, StakingError> {
        Ok(self.rpc.get_balance(&self.owner()).await?)
    }

    pub async fn has_enough_sol(&self, owner: &Pubkey) -> Result<bool, StakingError> {
        let balance = self.rpc.get_balance(owner).await?;
        Ok(balance >= self.required_lamports())
    }

    async fn ensure_enough_sol(&self) -> Result<(), StakingError> {
        let balance = self.rpc.get_balance(&self.owner()).await?;
        let required = self.required_lamports();
        if balance < required {
            return Err(StakingError::InsufficientFunds { balance, required });
        }
        Ok(())
    }

    pub async fn get_staking_info(&self, mint: &Pubkey) -> Result<StakingInfo, StakingError> {
        let accounts = self.accounts(mint)?;
        let data = self.rpc.get_account_data(&accounts.stake_account).await?;
        Ok(StakingInfo::from_account_data(
            *mint,
            data.as_deref(),
            &self.config,
            self.clock.now(),
        ))
    }

    /// Staking info for many NFTs with a single account read
    pub async fn get_multiple_staking_info(
        &self,
        mints: &[Pubkey],
    ) -> Result<HashMap<Pubkey, StakingInfo>, StakingError> {
        let stake_accounts = mints
            .iter()
            .map(|mint| self.accounts(mint).map(|accounts| accounts.stake_account))
            .collect::<Result<Vec<_>, _>>()?;
        let data = self.rpc.get_multiple_account_data(&stake_accounts).await?;
        if data.len() != mints.len() {
            return Err(StakingError::UnknownError(format!(
                "requested {} accounts, received {}",
                mints.len(),
                data.len()
            )));
        }
        let now = self.clock.now();

        Ok(mints
            .iter()
            .zip(data)
            .map(|(mint, data)| {
                (
                    *mint,
                    StakingInfo::from_account_data(*mint, data.as_deref(), &self.config, now),
                )
            })
            .collect())
    }

    pub async fn stake(&self, mint: &Pubkey) -> Result<Signature, StakingError> {
        info!(%mint, "staking NFT");
        let accounts = self.accounts(mint)?;
        let [stake_account, user_nft_account, program_nft_account]: [Option<Vec<u8>>; 3] = self
            .rpc
            .get_multiple_account_data(&[
                accounts.stake_account,
                accounts.user_nft_account,
                accounts.program_nft_account,
            ])
            .await?
            .try_into()
            .map_err(|_| StakingError::UnknownError("account count mismatch".to_string()))?;

        if holds_stake(stake_account.as_deref(), self.config.account_layout) {
            return Err(StakingError::AlreadyStaked(*mint));
        }
        check_nft_holding(mint, &accounts.user_nft_account, user_nft_account.as_deref())?;
        self.ensure_enough_sol().await?;

        let transaction = InstructionBuilder::new(&self.config)
            .build_stake(&accounts, program_nft_account.is_some());
        match self.submit(Operation::Stake, mint, &transaction).await {
            Err(err) if err.transaction_error().is_some() => {
                // A concurrent stake may have landed first
                match self.rpc.get_account_data(&accounts.stake_account).await {
                    Ok(data) if holds_stake(data.as_deref(), self.config.account_layout) => {
                        Err(StakingError::AlreadyStaked(*mint))
                    }
                    _ => Err(err),
                }
            }
            result => result,
        }
    }

    pub async fn unstake(&self, mint: &Pubkey) -> Result<Signature, StakingError> {
        info!(%mint, "unstaking NFT");
        let accounts = self.accounts(mint)?;
        let data = self.rpc.get_account_data(&accounts.stake_account).await?;
        if !holds_stake(data.as_deref(), self.config.account_layout) {
            return Err(StakingError::NotStaked(*mint));
        }

        let transaction = InstructionBuilder::new(&self.config).build_unstake(&accounts);
        self.submit(Operation::Unstake, mint, &transaction).await
    }

    pub async fn claim_rewards(&self, mint: &Pubkey) -> Result<Signature, StakingError> {
        info!(%mint, "claiming rewards");
        let accounts = self.accounts(mint)?;
        let [stake_account, reward_account]: [Option<Vec<u8>>; 2] = self
            .rpc
            .get_multiple_account_data(&[accounts.stake_account, accounts.user_reward_account])
            .await?
            .try_into()
            .map_err(|_| StakingError::UnknownError("account count mismatch".to_string()))?;

        let data = stake_account.ok_or(StakingError::NotStaked(*mint))?;
        let record = match StakeRecord::decode(&data, self.config.account_layout) {
            Err(DecodeError::Uninitialized) => return Err(StakingError::NotStaked(*mint)),
            result => result?,
        };
        let reward = self.config.rewards.accrual(&record, self.clock.now());
        if reward == 0 {
            return Err(StakingError::NoRewardsToClaim(*mint));
        }

        let transaction =
            InstructionBuilder::new(&self.config).build_claim(&accounts, reward_account.is_some());
        let signature = self.submit(Operation::Claim, mint, &transaction).await?;
        info!(%mint, reward, "rewards claimed");
        Ok(signature)
    }

    /// Stake each NFT in turn, pausing between submissions
    pub async fn stake_selected(&self, mints: &[Pubkey]) -> BatchOutcome {
        self.run_batch(Operation::Stake, mints).await
    }

    /// Unstake each NFT in turn, pausing between submissions
    pub async fn unstake_selected(&self, mints: &[Pubkey]) -> BatchOutcome {
        self.run_batch(Operation::Unstake, mints).await
    }

    /// Claim for each NFT in turn, pausing between submissions
    pub async fn claim_selected(&self, mints: &[Pubkey]) -> BatchOutcome {
        self.run_batch(Operation::Claim, mints).await
    }

    /// Claim for every staked NFT among `mints` with a positive reward
    pub async fn claim_all(&self, mints: &[Pubkey]) -> Result<BatchOutcome, StakingError> {
        let infos = self.get_multiple_staking_info(mints).await?;
        let claimable: Vec<Pubkey> = mints
            .iter()
            .filter(|mint| {
                infos
                    .get(*mint)
                    .is_some_and(|info| info.is_staked && info.current_reward > 0)
            })
            .copied()
            .collect();
        Ok(self.run_batch(Operation::Claim, &claimable).await)
    }

    async fn run_batch(&self, operation: Operation, mints: &[Pubkey]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, mint) in mints.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            let result = match operation {
                Operation::Stake => self.stake(mint).await,
                Operation::Unstake => self.unstake(mint).await,
                Operation::Claim => self.claim_rewards(mint).await,
            };
            outcome.record(*mint, result);
        }
        info!(
            ?operation,
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            "batch finished"
        );
        outcome
    }

    async fn submit(
        &self,
        operation: Operation,
        mint: &Pubkey,
        transaction: &UnsignedTransaction,
    ) -> Result<Signature, StakingError> {
        let result = self
            .submitter
            .submit(&self.rpc, transaction, &self.signer)
            .await;
        match &result {
            Ok(signature) => info!(?operation, %mint, %signature, "operation succeeded"),
            Err(err) => warn!(?operation, %mint, ?err, "operation failed"),
        }
        result
    }
}

/// Lamports needed to stake one NFT with the given stake account layout
pub fn required_lamports(layout: AccountLayout) -> u64 {
    let rent = Rent::default();
    rent.minimum_balance(layout.len())
        .saturating_add(rent.minimum_balance(TokenAccount::LEN))
        .saturating_add(FEE_ALLOWANCE_LAMPORTS)
}

/// Whether stake account data represents a stake. Undecodable data counts,
/// an uninitialized flagged account does not.
fn holds_stake(data: Option<&[u8]>, layout: AccountLayout) -> bool {
    data.is_some_and(|data| {
        !matches!(
            StakeRecord::decode(data, layout),
            Err(DecodeError::Uninitialized)
        )
    })
}

/// The owner's token account must exist, belong to `mint` and hold the NFT
fn check_nft_holding(
    mint: &Pubkey,
    token_account: &Pubkey,
    data: Option<&[u8]>,
) -> Result<(), StakingError> {
    let data = data.ok_or(StakingError::TokenAccountNotFound(*mint))?;
    let account = StateWithExtensions::<TokenAccount>::unpack(data).map_err(|_| {
        StakingError::InvalidMint(format!("{token_account} is not a token account"))
    })?;
    if account.base.mint != *mint {
        return Err(StakingError::InvalidMint(format!(
            "{token_account} holds {} instead of {mint}",
            account.base.mint
        )));
    }
    if account.base.amount == 0 {
        return Err(StakingError::TokenAccountNotFound(*mint));
    }
    Ok(())
}
