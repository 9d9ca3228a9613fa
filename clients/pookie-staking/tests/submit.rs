mod common;

use std::{sync::Arc, time::Duration};

use common::MockRpc;
use pookie_staking::{
    Error, StakingError, TransactionSigner, TransactionSubmitter, UnsignedTransaction,
};
use solana_sdk::{
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::TransactionError,
};

fn transfer(payer: &Keypair) -> UnsignedTransaction {
    UnsignedTransaction::new(vec![system_instruction::transfer(
        &payer.pubkey(),
        &Pubkey::new_unique(),
        1,
    )])
}

fn submitter(max_attempts: u32) -> TransactionSubmitter {
    TransactionSubmitter::new(max_attempts, Duration::ZERO)
}

struct RefusingSigner(Pubkey);

#[async_trait::async_trait]
impl TransactionSigner for RefusingSigner {
    fn public_key(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(&self, _transaction: &[u8]) -> Result<Vec<u8>, Error> {
        Err(Error::signer("user rejected the request"))
    }
}

#[tokio::test]
async fn test_submit_confirms_first_attempt() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();

    let signature = submitter(3).submit(&rpc, &transfer(&payer), &payer).await.unwrap();

    let sent = rpc.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].signatures[0], signature);
    assert_eq!(sent[0].message.account_keys[0], payer.pubkey());
    assert_eq!(rpc.confirm_calls(), 1);
}

#[tokio::test]
async fn test_submit_retries_transient_broadcast_failure() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();
    rpc.fail_sends(2);

    let signature = submitter(3).submit(&rpc, &transfer(&payer), &payer).await.unwrap();

    let sent = rpc.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].signatures[0], signature);
    assert_eq!(rpc.blockhash_calls(), 3);
    // Each attempt is stamped with a fresh blockhash
    assert_ne!(sent[0].message.recent_blockhash, sent[1].message.recent_blockhash);
    assert_ne!(sent[1].message.recent_blockhash, sent[2].message.recent_blockhash);
}

#[tokio::test]
async fn test_submit_gives_up_after_max_attempts() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();
    rpc.fail_sends(10);

    let err = submitter(3)
        .submit(&rpc, &transfer(&payer), &payer)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StakingError::TransactionFailed {
            attempts: 3,
            source: Error::rpc("connection reset by peer"),
        }
    );
    assert_eq!(rpc.send_calls(), 3);
    assert_eq!(rpc.confirm_calls(), 0);
}

#[tokio::test]
async fn test_submit_retries_expired_blockhash() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();
    rpc.expire_confirmations(1);

    submitter(3).submit(&rpc, &transfer(&payer), &payer).await.unwrap();

    assert_eq!(rpc.send_calls(), 2);
    assert_eq!(rpc.confirm_calls(), 2);
}

#[tokio::test]
async fn test_submit_does_not_retry_program_rejection() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();
    let rejection = TransactionError::InstructionError(0, InstructionError::Custom(6));
    rpc.fail_on_chain(rejection.clone());

    let err = submitter(3)
        .submit(&rpc, &transfer(&payer), &payer)
        .await
        .unwrap_err();

    assert_eq!(err.transaction_error(), Some(&rejection));
    assert!(matches!(err, StakingError::TransactionFailed { attempts: 1, .. }));
    assert_eq!(rpc.send_calls(), 1);
}

#[tokio::test]
async fn test_submit_does_not_retry_preflight_rejection() {
    let rpc = MockRpc::default();
    let payer = Keypair::new();
    let rejection = TransactionError::InstructionError(3, InstructionError::Custom(3));
    rpc.reject_in_preflight(rejection.clone());

    let err = submitter(3)
        .submit(&rpc, &transfer(&payer), &payer)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StakingError::TransactionFailed {
            attempts: 1,
            source: Error::SimulatedTransactionError(rejection.clone()),
        }
    );
    assert_eq!(err.transaction_error(), Some(&rejection));
    assert_eq!(rpc.send_calls(), 1);
    assert_eq!(rpc.confirm_calls(), 0);
}

#[tokio::test]
async fn test_submit_does_not_retry_refused_signature() {
    let rpc = MockRpc::default();
    let signer = RefusingSigner(Pubkey::new_unique());
    let transaction = UnsignedTransaction::new(vec![system_instruction::transfer(
        &signer.0,
        &Pubkey::new_unique(),
        1,
    )]);

    let err = submitter(3)
        .submit(&rpc, &transaction, &signer)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StakingError::TransactionFailed {
            attempts: 1,
            source: Error::SignerError(_),
        }
    ));
    assert_eq!(rpc.send_calls(), 0);
}

#[tokio::test]
async fn test_zero_max_attempts_still_submits_once() {
    let rpc = Arc::new(MockRpc::default());
    let payer = Arc::new(Keypair::new());
    rpc.fail_sends(1);

    let submitter = submitter(0);
    assert_eq!(submitter.max_attempts(), 1);
    let err = submitter
        .submit(&rpc, &transfer(&payer), &payer)
        .await
        .unwrap_err();

    assert!(matches!(err, StakingError::TransactionFailed { attempts: 1, .. }));
    assert_eq!(rpc.send_calls(), 1);
}
