//! Program-derived and associated token account addresses

use std::str::FromStr;

use solana_program::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;

use crate::error::StakingError;

/// Seed prefixes for PDAs
pub const STAKE_SEED: &[u8] = b"staking";
pub const AUTHORITY_SEED: &[u8] = b"authority";

/// Derive the stake account PDA for an NFT staked by `owner`
/// PDA: ["staking", owner, mint]
pub fn derive_stake_account(
    mint: &Pubkey,
    owner: &Pubkey,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), StakingError> {
    Pubkey::try_find_program_address(&[STAKE_SEED, owner.as_ref(), mint.as_ref()], program_id)
        .ok_or(StakingError::InvalidPda)
}

/// Derive the program authority PDA that owns the NFT escrow and the
/// reward treasury
/// PDA: ["authority"]
pub fn derive_program_authority(program_id: &Pubkey) -> Result<(Pubkey, u8), StakingError> {
    Pubkey::try_find_program_address(&[AUTHORITY_SEED], program_id)
        .ok_or(StakingError::InvalidPda)
}

/// Associated token account of `owner` for `mint` under `token_program`
pub fn derive_associated_token_account(
    mint: &Pubkey,
    owner: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, token_program)
}

/// Parse a base58 mint address
pub fn parse_mint(mint: &str) -> Result<Pubkey, StakingError> {
    Pubkey::from_str(mint.trim()).map_err(|err| StakingError::InvalidMint(format!("{mint}: {err}")))
}
