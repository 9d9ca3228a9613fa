//! Stamp, sign, broadcast and confirm transactions, retrying network
//! failures with a fresh blockhash

use std::time::Duration;

use solana_sdk::signature::Signature;
use tracing::{debug, info, warn};

use crate::{
    config::{StakingConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY},
    error::{Error, StakingError},
    instructions::UnsignedTransaction,
    rpc::{ConfirmationStatus, RpcConnection},
    signer::TransactionSigner,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSubmitter {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for TransactionSubmitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl TransactionSubmitter {
    /// `max_attempts` of 0 is treated as 1
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &StakingConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Submit a transaction signed by `signer`, who also pays the fee.
    ///
    /// Each attempt fetches a fresh blockhash and asks for a new signature.
    /// A program rejection ends the loop at once; network failures are
    /// retried up to the attempt limit.
    pub async fn submit<R, S>(
        &self,
        rpc: &R,
        transaction: &UnsignedTransaction,
        signer: &S,
    ) -> Result<Signature, StakingError>
    where
        R: RpcConnection + ?Sized,
        S: TransactionSigner + ?Sized,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(rpc, transaction, signer).await {
                Ok(signature) => {
                    info!(%signature, attempt, "transaction confirmed");
                    return Ok(signature);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        ?err,
                        attempt,
                        max_attempts = self.max_attempts,
                        "transaction attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    warn!(?err, attempt, "transaction failed");
                    return Err(StakingError::TransactionFailed {
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    async fn attempt<R, S>(
        &self,
        rpc: &R,
        transaction: &UnsignedTransaction,
        signer: &S,
    ) -> Result<Signature, Error>
    where
        R: RpcConnection + ?Sized,
        S: TransactionSigner + ?Sized,
    {
        let (blockhash, last_valid_block_height) = rpc.get_latest_blockhash().await?;
        let unsigned = transaction.to_transaction(&signer.public_key(), &blockhash);
        let signed = signer
            .sign_transaction(&bincode::serialize(&unsigned)?)
            .await?;

        let signature = rpc.send_raw_transaction(&signed).await?;
        debug!(%signature, %blockhash, last_valid_block_height, "transaction sent");

        match rpc
            .confirm_transaction(&signature, &blockhash, last_valid_block_height)
            .await?
        {
            ConfirmationStatus::Confirmed => Ok(signature),
            ConfirmationStatus::Failed(err) => Err(Error::TransactionError(err)),
        }
    }
}
