//! Wallet capability: one public key and the ability to sign a serialized
//! transaction

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::error::Error;

#[async_trait::async_trait]
pub trait TransactionSigner: Send + Sync {
    fn public_key(&self) -> Pubkey;

    /// Sign bincode-serialized transaction bytes, returning the signed bytes
    async fn sign_transaction(&self, transaction: &[u8]) -> Result<Vec<u8>, Error>;
}

#[async_trait::async_trait]
impl TransactionSigner for Keypair {
    fn public_key(&self) -> Pubkey {
        self.pubkey()
    }

    async fn sign_transaction(&self, transaction: &[u8]) -> Result<Vec<u8>, Error> {
        let mut transaction: Transaction = bincode::deserialize(transaction)?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self], blockhash)
            .map_err(Error::signer)?;
        Ok(bincode::serialize(&transaction)?)
    }
}

#[async_trait::async_trait]
impl<T: TransactionSigner + ?Sized> TransactionSigner for Arc<T> {
    fn public_key(&self) -> Pubkey {
        (**self).public_key()
    }

    async fn sign_transaction(&self, transaction: &[u8]) -> Result<Vec<u8>, Error> {
        (**self).sign_transaction(transaction).await
    }
}
