//! Caller-owned view of the staking state of a set of NFTs
//!
//! The projection is never authoritative. Entries are read through the
//! client, marked stale after a mutating operation, and re-read on the
//! next refresh.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::{
    client::{BatchOutcome, Clock, StakingClient, StakingInfo},
    config::StakingConfig,
    error::StakingError,
    rpc::RpcConnection,
    signer::TransactionSigner,
};

#[derive(Debug, Clone, Default)]
pub struct StakingProjection {
    entries: BTreeMap<Pubkey, Option<StakingInfo>>,
    stale: BTreeSet<Pubkey>,
    in_flight: BTreeSet<Pubkey>,
}

impl StakingProjection {
    pub fn new<I: IntoIterator<Item = Pubkey>>(mints: I) -> Self {
        let mut projection = Self::default();
        for mint in mints {
            projection.track(mint);
        }
        projection
    }

    /// Start following `mint`; it is read on the next refresh
    pub fn track(&mut self, mint: Pubkey) {
        self.entries.entry(mint).or_insert(None);
        self.stale.insert(mint);
    }

    pub fn untrack(&mut self, mint: &Pubkey) {
        self.entries.remove(mint);
        self.stale.remove(mint);
        self.in_flight.remove(mint);
    }

    pub fn mints(&self) -> Vec<Pubkey> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, mint: &Pubkey) -> Option<&StakingInfo> {
        self.entries.get(mint).and_then(Option::as_ref)
    }

    pub fn is_stale(&self, mint: &Pubkey) -> bool {
        self.stale.contains(mint)
    }

    pub fn invalidate(&mut self, mint: &Pubkey) {
        if self.entries.contains_key(mint) {
            self.stale.insert(*mint);
        }
    }

    pub fn invalidate_all(&mut self) {
        self.stale.extend(self.entries.keys().copied());
    }

    /// Mark `mint` as having an operation in flight. Returns false when
    /// one already is, in which case the caller must not start another.
    pub fn begin(&mut self, mint: &Pubkey) -> bool {
        self.in_flight.insert(*mint)
    }

    /// Clear the in-flight mark; the entry is stale whatever the outcome
    pub fn finish(&mut self, mint: &Pubkey) {
        self.in_flight.remove(mint);
        self.invalidate(mint);
    }

    pub fn is_in_flight(&self, mint: &Pubkey) -> bool {
        self.in_flight.contains(mint)
    }

    /// Invalidate every mint a batch touched
    pub fn apply_outcome(&mut self, outcome: &BatchOutcome) {
        let touched = outcome
            .succeeded
            .iter()
            .map(|(mint, _)| mint)
            .chain(outcome.failed.iter().map(|(mint, _)| mint));
        for mint in touched {
            self.invalidate(mint);
        }
    }

    /// Store freshly read entries for tracked mints
    pub fn update(&mut self, infos: HashMap<Pubkey, StakingInfo>) {
        for (mint, info) in infos {
            if let Some(entry) = self.entries.get_mut(&mint) {
                *entry = Some(info);
                self.stale.remove(&mint);
            }
        }
    }

    /// Re-read every tracked mint
    pub async fn refresh<R, S, C>(
        &mut self,
        client: &StakingClient<R, S, C>,
    ) -> Result<(), StakingError>
    where
        R: RpcConnection,
        S: TransactionSigner,
        C: Clock,
    {
        self.invalidate_all();
        self.refresh_stale(client).await
    }

    /// Re-read only the stale mints
    pub async fn refresh_stale<R, S, C>(
        &mut self,
        client: &StakingClient<R, S, C>,
    ) -> Result<(), StakingError>
    where
        R: RpcConnection,
        S: TransactionSigner,
        C: Clock,
    {
        if self.stale.is_empty() {
            return Ok(());
        }
        let mints: Vec<Pubkey> = self.stale.iter().copied().collect();
        debug!(count = mints.len(), "refreshing staking projection");
        let infos = client.get_multiple_staking_info(&mints).await?;
        self.update(infos);
        Ok(())
    }

    pub fn staked(&self) -> Vec<Pubkey> {
        self.filter(|info| info.is_staked)
    }

    pub fn unstaked(&self) -> Vec<Pubkey> {
        self.filter(|info| !info.is_staked)
    }

    /// Staked mints with a known positive reward at `now`
    pub fn claimable(&self, config: &StakingConfig, now: u64) -> Vec<Pubkey> {
        self.filter(|info| info.is_staked && info.at(config, now).current_reward > 0)
    }

    /// Sum of the live reward estimates at `now`, in whole tokens. NFTs
    /// whose reward is unknown count as zero.
    pub fn total_reward(&self, config: &StakingConfig, now: u64) -> u64 {
        self.entries
            .values()
            .flatten()
            .map(|info| info.at(config, now).current_reward)
            .fold(0u64, u64::saturating_add)
    }

    fn filter<F: Fn(&StakingInfo) -> bool>(&self, predicate: F) -> Vec<Pubkey> {
        self.entries
            .iter()
            .filter_map(|(mint, info)| {
                info.as_ref()
                    .filter(|info| predicate(info))
                    .map(|_| *mint)
            })
            .collect()
    }
}
