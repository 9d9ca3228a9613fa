//! Stake NFT instruction

use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use super::{InstructionBuilder, StakeAccounts, UnsignedTransaction};
use crate::StakingInstruction;

/// Stake an NFT
///
/// Accounts:
/// 0. `[writable, signer]` Owner
/// 1. `[writable]` Stake account (PDA: ["staking", owner, mint])
/// 2. `[writable]` Owner's NFT token account
/// 3. `[writable]` Program's NFT token account
/// 4. `[]` NFT mint
/// 5. `[]` Token program
/// 6. `[]` Rent sysvar
/// 7. `[]` Clock sysvar
/// 8. `[]` System program
pub fn stake_nft(
    program_id: &Pubkey,
    accounts: &StakeAccounts,
    token_program: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.owner, true),
            AccountMeta::new(accounts.stake_account, false),
            AccountMeta::new(accounts.user_nft_account, false),
            AccountMeta::new(accounts.program_nft_account, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: StakingInstruction::StakeNft.pack(),
    }
}

impl InstructionBuilder<'_> {
    /// Stake transaction. Creates the program's NFT token account first
    /// when it does not exist yet, with the owner paying.
    pub fn build_stake(
        &self,
        accounts: &StakeAccounts,
        program_nft_account_exists: bool,
    ) -> UnsignedTransaction {
        let mut instructions = Vec::with_capacity(4);
        if !program_nft_account_exists {
            instructions.push(create_associated_token_account_idempotent(
                &accounts.owner,
                &self.config.program_authority,
                &accounts.mint,
                &self.config.nft_token_program,
            ));
        }
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
            self.config.compute_unit_limit,
        ));
        instructions.extend(self.priority_fee());
        instructions.push(stake_nft(
            &self.config.program_id,
            accounts,
            &self.config.nft_token_program,
        ));
        UnsignedTransaction::new(instructions)
    }
}
