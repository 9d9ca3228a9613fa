//! RPC capability used by the client, and its implementation over the
//! nonblocking Solana RPC client

use std::{sync::Arc, time::Duration};

use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use tracing::debug;

use crate::error::Error;

const CONFIRMATION_CHECK_INTERVAL: Duration = Duration::from_millis(500);
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Outcome of waiting for a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// The transaction landed but the program rejected it
    Failed(TransactionError),
}

#[async_trait::async_trait]
pub trait RpcConnection: Send + Sync {
    /// Account data, `None` if the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Error>;

    /// Account data for each address, in order
    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, Error>;

    /// Latest blockhash and the last block height it is valid for
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), Error>;

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<Signature, Error>;

    /// Wait for `confirmed` commitment. Fails with `Error::BlockhashExpired`
    /// once the chain passes `last_valid_block_height` without the signature
    /// landing.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
    ) -> Result<ConfirmationStatus, Error>;

    /// Balance in lamports
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, Error>;
}

#[async_trait::async_trait]
impl<T: RpcConnection + ?Sized> RpcConnection for Arc<T> {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Error> {
        (**self).get_account_data(address).await
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, Error> {
        (**self).get_multiple_account_data(addresses).await
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), Error> {
        (**self).get_latest_blockhash().await
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<Signature, Error> {
        (**self).send_raw_transaction(transaction).await
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
    ) -> Result<ConfirmationStatus, Error> {
        (**self)
            .confirm_transaction(signature, blockhash, last_valid_block_height)
            .await
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, Error> {
        (**self).get_balance(address).await
    }
}

#[async_trait::async_trait]
impl RpcConnection for RpcClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Error> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, Error> {
        let mut result = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self.get_multiple_accounts(chunk).await?;
            result.extend(accounts.into_iter().map(|account| account.map(|a| a.data)));
        }
        Ok(result)
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), Error> {
        Ok(self
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?)
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<Signature, Error> {
        let transaction: Transaction = bincode::deserialize(transaction)?;
        Ok(self
            .send_transaction_with_config(
                &transaction,
                RpcSendTransactionConfig {
                    preflight_commitment: Some(CommitmentLevel::Confirmed),
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _blockhash: &Hash,
        last_valid_block_height: u64,
    ) -> Result<ConfirmationStatus, Error> {
        let commitment = CommitmentConfig::confirmed();
        loop {
            let statuses = self.get_signature_statuses(&[*signature]).await?;
            if let Some(status) = statuses.value.into_iter().next().flatten() {
                if status.satisfies_commitment(commitment) {
                    return Ok(match status.err {
                        Some(err) => ConfirmationStatus::Failed(err),
                        None => ConfirmationStatus::Confirmed,
                    });
                }
            }

            let block_height = self.get_block_height_with_commitment(commitment).await?;
            if block_height > last_valid_block_height {
                return Err(Error::BlockhashExpired {
                    signature: *signature,
                });
            }
            debug!(%signature, block_height, last_valid_block_height, "awaiting confirmation");
            tokio::time::sleep(CONFIRMATION_CHECK_INTERVAL).await;
        }
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, Error> {
        Ok(self
            .get_balance_with_commitment(address, self.commitment())
            .await?
            .value)
    }
}
