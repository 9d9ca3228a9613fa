//! Instruction and transaction builders for the staking program
//!
//! Builders are pure: account existence that decides whether a token
//! account must be created is looked up by the caller and passed in.

pub mod claim;
pub mod stake;
pub mod unstake;

pub use claim::*;
pub use stake::*;
pub use unstake::*;

use solana_program::{hash::Hash, instruction::Instruction, pubkey::Pubkey};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, message::Message, transaction::Transaction,
};

use crate::{config::StakingConfig, error::StakingError, pda};

/// Every address a staking operation on one (mint, owner) pair touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeAccounts {
    pub owner: Pubkey,
    pub mint: Pubkey,
    /// PDA: ["staking", owner, mint]
    pub stake_account: Pubkey,
    pub stake_bump: u8,
    /// Owner's associated token account for the NFT
    pub user_nft_account: Pubkey,
    /// Program authority's associated token account for the NFT
    pub program_nft_account: Pubkey,
    /// Owner's associated token account for the reward mint
    pub user_reward_account: Pubkey,
}

impl StakeAccounts {
    pub fn derive(
        config: &StakingConfig,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Self, StakingError> {
        let (stake_account, stake_bump) =
            pda::derive_stake_account(mint, owner, &config.program_id)?;
        Ok(Self {
            owner: *owner,
            mint: *mint,
            stake_account,
            stake_bump,
            user_nft_account: pda::derive_associated_token_account(
                mint,
                owner,
                &config.nft_token_program,
            ),
            program_nft_account: pda::derive_associated_token_account(
                mint,
                &config.program_authority,
                &config.nft_token_program,
            ),
            user_reward_account: pda::derive_associated_token_account(
                &config.reward_mint,
                owner,
                &config.reward_token_program,
            ),
        })
    }
}

/// Instructions awaiting a blockhash, a fee payer and a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub instructions: Vec<Instruction>,
}

impl UnsignedTransaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Compile with the fee payer and blockhash, leaving signatures empty
    pub fn to_transaction(&self, fee_payer: &Pubkey, blockhash: &Hash) -> Transaction {
        Transaction::new_unsigned(Message::new_with_blockhash(
            &self.instructions,
            Some(fee_payer),
            blockhash,
        ))
    }

    /// The staking program instruction, which always comes last
    pub fn staking_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }
}

/// Builds the unsigned transactions for stake, unstake and claim
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder<'a> {
    config: &'a StakingConfig,
}

impl<'a> InstructionBuilder<'a> {
    pub fn new(config: &'a StakingConfig) -> Self {
        Self { config }
    }

    /// Compute unit price directive, if a priority fee is configured
    fn priority_fee(&self) -> Option<Instruction> {
        (self.config.compute_unit_price > 0).then(|| {
            ComputeBudgetInstruction::set_compute_unit_price(self.config.compute_unit_price)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_accounts_derive() {
        let config = StakingConfig::new(Pubkey::new_unique(), Pubkey::new_unique()).unwrap();
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let accounts = StakeAccounts::derive(&config, &mint, &owner).unwrap();
        assert_eq!(
            (accounts.stake_account, accounts.stake_bump),
            pda::derive_stake_account(&mint, &owner, &config.program_id).unwrap()
        );
        assert_eq!(
            accounts.program_nft_account,
            spl_associated_token_account::get_associated_token_address(
                &config.program_authority,
                &mint
            )
        );
        assert_eq!(
            accounts.user_reward_account,
            spl_associated_token_account::get_associated_token_address(
                &owner,
                &config.reward_mint
            )
        );
        assert_eq!(accounts, StakeAccounts::derive(&config, &mint, &owner).unwrap());
    }

    #[test]
    fn test_to_transaction_sets_payer_and_blockhash() {
        let config = StakingConfig::new(Pubkey::new_unique(), Pubkey::new_unique()).unwrap();
        let owner = Pubkey::new_unique();
        let accounts = StakeAccounts::derive(&config, &Pubkey::new_unique(), &owner).unwrap();
        let unsigned = InstructionBuilder::new(&config).build_unstake(&accounts);

        let blockhash = Hash::new_unique();
        let transaction = unsigned.to_transaction(&owner, &blockhash);
        assert_eq!(transaction.message.account_keys[0], owner);
        assert_eq!(transaction.message.recent_blockhash, blockhash);
        assert!(!transaction.is_signed());
    }
}
