use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};
use thiserror::Error;

/// Failures reported by the RPC connection or the signer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Signer error: {0}")]
    SignerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Transaction error: {0}")]
    TransactionError(TransactionError),

    #[error("Simulated transaction error: {0}")]
    SimulatedTransactionError(TransactionError),

    #[error("Blockhash expired before {signature} was confirmed")]
    BlockhashExpired { signature: Signature },
}

impl From<solana_client::client_error::ClientError> for Error {
    fn from(value: solana_client::client_error::ClientError) -> Self {
        // Preflight rejections arrive as client errors carrying the
        // program's error
        match value.get_transaction_error() {
            Some(err) => Self::SimulatedTransactionError(err),
            None => Self::RpcError(value.to_string()),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(value: bincode::Error) -> Self {
        Self::SerializationError(value.to_string())
    }
}

impl Error {
    pub fn rpc<S: ToString>(str: S) -> Self {
        Self::RpcError(str.to_string())
    }

    pub fn signer<S: ToString>(str: S) -> Self {
        Self::SignerError(str.to_string())
    }

    /// Network-level failures are worth another attempt with a fresh
    /// blockhash. A program rejection or a refused signature would recur.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RpcError(_) | Self::BlockhashExpired { .. })
    }
}

/// Stake account data could not be decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Account data too small: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Account not initialized")]
    Uninitialized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("Token account not found for mint {0}")]
    TokenAccountNotFound(Pubkey),

    #[error("Insufficient funds: balance {balance} lamports, {required} required")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("Invalid mint: {0}")]
    InvalidMint(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Transaction failed after {attempts} attempt(s): {source}")]
    TransactionFailed {
        attempts: u32,
        #[source]
        source: Error,
    },

    #[error("NFT {0} is already staked")]
    AlreadyStaked(Pubkey),

    #[error("NFT {0} is not staked")]
    NotStaked(Pubkey),

    #[error("No rewards to claim for NFT {0}")]
    NoRewardsToClaim(Pubkey),

    #[error("No valid program address for the given seeds")]
    InvalidPda,

    #[error("Account decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("RPC request failed: {0}")]
    Rpc(#[from] Error),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl StakingError {
    /// The on-chain error carried by a failed transaction, if the program
    /// rejected it
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            Self::TransactionFailed {
                source: Error::TransactionError(err) | Error::SimulatedTransactionError(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}
