//! Pookie NFT staking client
//!
//! Builds, signs and submits the transactions that stake an NFT with the
//! Pookie staking program, unstake it again, and claim the reward tokens
//! it accrues while staked.
//!
//! Reward formula: `reward = ⌊(now - max(staked_at, last_claimed_at)) / 86400 × daily_rate⌋`
//! - A stake record exists for (mint, owner) exactly while the NFT is staked
//! - Claiming moves `last_claimed_at` forward to the claim time
//! - The program pays whatever it computes at execution time; the client
//!   value is a live estimate for display

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

pub mod client;
pub mod config;
pub mod error;
pub mod instructions;
pub mod math;
pub mod pda;
pub mod projection;
pub mod rpc;
pub mod serde;
pub mod signer;
pub mod state;
pub mod submit;

pub use client::{BatchOutcome, Clock, StakingClient, StakingInfo, SystemClock};
pub use config::{Settings, StakingConfig};
pub use error::{DecodeError, Error, StakingError};
pub use instructions::{StakeAccounts, UnsignedTransaction};
pub use projection::StakingProjection;
pub use rpc::{ConfirmationStatus, RpcConnection};
pub use signer::TransactionSigner;
pub use state::{AccountLayout, StakeRecord};
pub use submit::TransactionSubmitter;

/// Program instructions
///
/// Every variant is a unit variant, so the borsh encoding is a single byte
/// holding the variant index.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingInstruction {
    /// Stake an NFT
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Owner (pays rent for the stake account)
    /// 1. `[writable]` Stake account (PDA: ["staking", owner, mint])
    /// 2. `[writable]` Owner's NFT token account
    /// 3. `[writable]` Program's NFT token account (ATA of the authority PDA)
    /// 4. `[]` NFT mint
    /// 5. `[]` Token program
    /// 6. `[]` Rent sysvar
    /// 7. `[]` Clock sysvar
    /// 8. `[]` System program
    StakeNft,

    /// Unstake an NFT, closing the stake account
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Owner (receives the stake account rent)
    /// 1. `[writable]` Stake account
    /// 2. `[writable]` Owner's NFT token account
    /// 3. `[writable]` Program's NFT token account
    /// 4. `[]` NFT mint
    /// 5. `[]` Token program
    /// 6. `[]` Clock sysvar
    UnstakeNft,

    /// Claim rewards accrued by a staked NFT
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Owner
    /// 1. `[]` Owner's NFT token account
    /// 2. `[]` NFT mint
    /// 3. `[writable]` Stake account (last claim time is updated)
    /// 4. `[writable]` Owner's reward token account
    /// 5. `[writable]` Reward treasury token account
    /// 6. `[]` Reward token mint
    /// 7. `[]` Reward token program
    /// 8. `[]` Program authority (PDA: ["authority"])
    /// 9. `[]` Clock sysvar
    ClaimRewards,
}

impl StakingInstruction {
    /// Instruction data as sent on the wire
    pub fn pack(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    /// Parse instruction data; the first byte is the opcode
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, _rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        Self::try_from_slice(&[*tag]).map_err(|_| ProgramError::InvalidInstructionData)
    }
}
