//! Claim rewards instruction

use solana_program::{
    instruction::{AccountMeta, Instruction},
    sysvar,
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use super::{InstructionBuilder, StakeAccounts, UnsignedTransaction};
use crate::{config::StakingConfig, StakingInstruction};

/// Claim rewards accrued by a staked NFT
///
/// Accounts:
/// 0. `[writable, signer]` Owner
/// 1. `[]` Owner's NFT token account
/// 2. `[]` NFT mint
/// 3. `[writable]` Stake account (last claim time is updated)
/// 4. `[writable]` Owner's reward token account
/// 5. `[writable]` Reward treasury token account (debited)
/// 6. `[]` Reward token mint
/// 7. `[]` Reward token program
/// 8. `[]` Program authority (PDA: ["authority"], signs the treasury debit)
/// 9. `[]` Clock sysvar
pub fn claim_rewards(config: &StakingConfig, accounts: &StakeAccounts) -> Instruction {
    Instruction {
        program_id: config.program_id,
        accounts: vec![
            AccountMeta::new(accounts.owner, true),
            AccountMeta::new_readonly(accounts.user_nft_account, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.stake_account, false),
            AccountMeta::new(accounts.user_reward_account, false),
            AccountMeta::new(config.reward_treasury, false),
            AccountMeta::new_readonly(config.reward_mint, false),
            AccountMeta::new_readonly(config.reward_token_program, false),
            AccountMeta::new_readonly(config.program_authority, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
        data: StakingInstruction::ClaimRewards.pack(),
    }
}

impl InstructionBuilder<'_> {
    /// Claim transaction. Creates the owner's reward token account first
    /// when it does not exist yet.
    pub fn build_claim(
        &self,
        accounts: &StakeAccounts,
        reward_account_exists: bool,
    ) -> UnsignedTransaction {
        let mut instructions = Vec::with_capacity(3);
        if !reward_account_exists {
            instructions.push(create_associated_token_account_idempotent(
                &accounts.owner,
                &accounts.owner,
                &self.config.reward_mint,
                &self.config.reward_token_program,
            ));
        }
        instructions.extend(self.priority_fee());
        instructions.push(claim_rewards(self.config, accounts));
        UnsignedTransaction::new(instructions)
    }
}
