//! Unstake NFT instruction

use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    sysvar,
};

use super::{InstructionBuilder, StakeAccounts, UnsignedTransaction};
use crate::StakingInstruction;

/// Unstake an NFT; the program returns it and closes the stake account
///
/// Accounts:
/// 0. `[writable, signer]` Owner (receives the stake account rent)
/// 1. `[writable]` Stake account
/// 2. `[writable]` Owner's NFT token account
/// 3. `[writable]` Program's NFT token account
/// 4. `[]` NFT mint
/// 5. `[]` Token program
/// 6. `[]` Clock sysvar
pub fn unstake_nft(
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
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
        data: StakingInstruction::UnstakeNft.pack(),
    }
}

impl InstructionBuilder<'_> {
    pub fn build_unstake(&self, accounts: &StakeAccounts) -> UnsignedTransaction {
        let mut instructions = Vec::with_capacity(2);
        instructions.extend(self.priority_fee());
        instructions.push(unstake_nft(
            &self.config.program_id,
            accounts,
            &self.config.nft_token_program,
        ));
        UnsignedTransaction::new(instructions)
    }
}
