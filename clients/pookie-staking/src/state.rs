//! Stake account layout and decoding

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;
use solana_program::pubkey::Pubkey;

use crate::error::DecodeError;

/// sha256("account:StakeAccount")[..8]
pub const STAKE_ACCOUNT_DISCRIMINATOR: [u8; 8] = [0x50, 0x9e, 0x43, 0x7c, 0x32, 0xbd, 0xc0, 0xff];

/// Byte layout of a stake account as written by the staking program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountLayout {
    /// 8-byte discriminator, owner, mint, staked_at, last_claimed_at
    #[default]
    Discriminated,
    /// 1-byte initialized flag, owner, mint, staked_at, last_claimed_at
    Flagged,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DiscriminatedStakeAccount {
    discriminator: [u8; 8],
    owner: [u8; 32],
    mint: [u8; 32],
    staked_at: [u8; 8],
    last_claimed_at: [u8; 8],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FlaggedStakeAccount {
    is_initialized: u8,
    owner: [u8; 32],
    mint: [u8; 32],
    staked_at: [u8; 8],
    last_claimed_at: [u8; 8],
}

impl AccountLayout {
    /// Minimum account data length for this layout
    pub const fn len(&self) -> usize {
        match self {
            Self::Discriminated => 8 + // discriminator
                32 + // owner
                32 + // mint
                8 +  // staked_at
                8,   // last_claimed_at
            Self::Flagged => 1 + // is_initialized
                32 + // owner
                32 + // mint
                8 +  // staked_at
                8,   // last_claimed_at
        }
    }
}

/// Decoded stake account
/// PDA: ["staking", owner, mint]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeRecord {
    /// Wallet that staked the NFT
    pub owner: Pubkey,

    /// Staked NFT mint
    pub mint: Pubkey,

    /// Unix timestamp when the NFT was staked
    pub staked_at: u64,

    /// Unix timestamp of the last claim (equals staked_at until the first claim)
    pub last_claimed_at: u64,
}

impl StakeRecord {
    pub fn new(owner: Pubkey, mint: Pubkey, staked_at: u64) -> Self {
        Self {
            owner,
            mint,
            staked_at,
            last_claimed_at: staked_at,
        }
    }

    /// Decode account data. Bytes past the layout length are ignored.
    pub fn decode(data: &[u8], layout: AccountLayout) -> Result<Self, DecodeError> {
        let len = layout.len();
        if data.len() < len {
            return Err(DecodeError::TooShort {
                expected: len,
                actual: data.len(),
            });
        }
        let data = &data[..len];

        let (owner, mint, staked_at, last_claimed_at) = match layout {
            AccountLayout::Discriminated => {
                let raw: DiscriminatedStakeAccount = bytemuck::pod_read_unaligned(data);
                (raw.owner, raw.mint, raw.staked_at, raw.last_claimed_at)
            }
            AccountLayout::Flagged => {
                let raw: FlaggedStakeAccount = bytemuck::pod_read_unaligned(data);
                if raw.is_initialized == 0 {
                    return Err(DecodeError::Uninitialized);
                }
                (raw.owner, raw.mint, raw.staked_at, raw.last_claimed_at)
            }
        };

        Ok(Self {
            owner: Pubkey::new_from_array(owner),
            mint: Pubkey::new_from_array(mint),
            staked_at: u64::from_le_bytes(staked_at),
            last_claimed_at: u64::from_le_bytes(last_claimed_at),
        })
    }

    /// Encode into account data of exactly `layout.len()` bytes
    pub fn encode(&self, layout: AccountLayout) -> Vec<u8> {
        let owner = self.owner.to_bytes();
        let mint = self.mint.to_bytes();
        let staked_at = self.staked_at.to_le_bytes();
        let last_claimed_at = self.last_claimed_at.to_le_bytes();
        match layout {
            AccountLayout::Discriminated => bytemuck::bytes_of(&DiscriminatedStakeAccount {
                discriminator: STAKE_ACCOUNT_DISCRIMINATOR,
                owner,
                mint,
                staked_at,
                last_claimed_at,
            })
            .to_vec(),
            AccountLayout::Flagged => bytemuck::bytes_of(&FlaggedStakeAccount {
                is_initialized: 1,
                owner,
                mint,
                staked_at,
                last_claimed_at,
            })
            .to_vec(),
        }
    }

    /// Timestamp rewards accrue from
    pub fn accrual_start(&self) -> u64 {
        self.staked_at.max(self.last_claimed_at)
    }
}
