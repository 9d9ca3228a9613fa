#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use pookie_staking::{
    rpc::{ConfirmationStatus, RpcConnection},
    AccountLayout, Clock, Error, StakeAccounts, StakeRecord, StakingClient, StakingConfig,
};
use solana_program::{program_option::COption, program_pack::Pack};
use solana_sdk::{
    hash::Hash,
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use spl_token::state::{Account as TokenAccount, AccountState};

pub const NOW: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;

#[derive(Default)]
struct State {
    accounts: HashMap<Pubkey, Vec<u8>>,
    balances: HashMap<Pubkey, u64>,
    failing_sends: u32,
    expiring_confirmations: u32,
    on_chain_error: Option<TransactionError>,
    preflight_error: Option<TransactionError>,
    short_multiple_reads: bool,
    created_on_send: Vec<(Pubkey, Vec<u8>)>,
    removed_on_send: Vec<Pubkey>,
    sent: Vec<Transaction>,
    blockhash_calls: u32,
    confirm_calls: u32,
}

/// In-memory chain: account reads, scripted broadcast and confirmation
/// outcomes, and a log of every transaction received
#[derive(Default)]
pub struct MockRpc {
    state: Mutex<State>,
}

impl MockRpc {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state().accounts.insert(address, data);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.state().accounts.remove(address);
    }

    pub fn has_account(&self, address: &Pubkey) -> bool {
        self.state().accounts.contains_key(address)
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.state().balances.insert(address, lamports);
    }

    /// The next `count` broadcasts fail with a network error
    pub fn fail_sends(&self, count: u32) {
        self.state().failing_sends = count;
    }

    /// The next `count` confirmations see the blockhash expire
    pub fn expire_confirmations(&self, count: u32) {
        self.state().expiring_confirmations = count;
    }

    /// Every confirmation reports the program rejecting the transaction
    pub fn fail_on_chain(&self, err: TransactionError) {
        self.state().on_chain_error = Some(err);
    }

    /// Every broadcast is refused by preflight simulation with `err`
    pub fn reject_in_preflight(&self, err: TransactionError) {
        self.state().preflight_error = Some(err);
    }

    /// Multi-account reads drop the last requested entry
    pub fn short_multiple_reads(&self) {
        self.state().short_multiple_reads = true;
    }

    /// Create an account as a side effect of the next broadcast that reaches
    /// the cluster, including one refused in preflight
    pub fn create_on_send(&self, address: Pubkey, data: Vec<u8>) {
        self.state().created_on_send.push((address, data));
    }

    /// Delete an account as a side effect of the next accepted broadcast
    pub fn remove_on_send(&self, address: Pubkey) {
        self.state().removed_on_send.push(address);
    }

    /// Every transaction received, including ones whose broadcast failed
    pub fn sent(&self) -> Vec<Transaction> {
        self.state().sent.clone()
    }

    pub fn send_calls(&self) -> usize {
        self.state().sent.len()
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.state().blockhash_calls
    }

    pub fn confirm_calls(&self) -> u32 {
        self.state().confirm_calls
    }
}

#[async_trait::async_trait]
impl RpcConnection for MockRpc {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.state().accounts.get(address).cloned())
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, Error> {
        let state = self.state();
        let mut data: Vec<_> = addresses
            .iter()
            .map(|address| state.accounts.get(address).cloned())
            .collect();
        if state.short_multiple_reads {
            data.pop();
        }
        Ok(data)
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), Error> {
        self.state().blockhash_calls += 1;
        Ok((Hash::new_unique(), 1_000))
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<Signature, Error> {
        let transaction: Transaction = bincode::deserialize(transaction)?;
        transaction
            .verify()
            .map_err(|err| Error::rpc(format!("invalid transaction: {err}")))?;

        let mut state = self.state();
        state.sent.push(transaction.clone());
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(Error::rpc("connection reset by peer"));
        }
        for (address, data) in std::mem::take(&mut state.created_on_send) {
            state.accounts.insert(address, data);
        }
        for address in std::mem::take(&mut state.removed_on_send) {
            state.accounts.remove(&address);
        }
        if let Some(err) = &state.preflight_error {
            return Err(Error::SimulatedTransactionError(err.clone()));
        }
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _blockhash: &Hash,
        _last_valid_block_height: u64,
    ) -> Result<ConfirmationStatus, Error> {
        let mut state = self.state();
        state.confirm_calls += 1;
        if state.expiring_confirmations > 0 {
            state.expiring_confirmations -= 1;
            return Err(Error::BlockhashExpired {
                signature: *signature,
            });
        }
        Ok(match &state.on_chain_error {
            Some(err) => ConfirmationStatus::Failed(err.clone()),
            None => ConfirmationStatus::Confirmed,
        })
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, Error> {
        Ok(self.state().balances.get(address).copied().unwrap_or(0))
    }
}

/// Clock pinned by the test
#[derive(Clone)]
pub struct TestClock(pub Arc<AtomicU64>);

impl Clock for TestClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn token_account_data(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(
        TokenAccount {
            mint,
            owner,
            amount,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        },
        &mut data,
    )
    .unwrap();
    data
}

pub fn test_config() -> StakingConfig {
    let mut config = StakingConfig::new(Pubkey::new_unique(), Pubkey::new_unique()).unwrap();
    config.retry_delay = Duration::ZERO;
    config.batch_delay = Duration::ZERO;
    config
}

pub type TestClient = StakingClient<Arc<MockRpc>, Keypair, TestClock>;

/// A funded wallet, a mock chain and a client pinned at `NOW`
pub struct Fixture {
    pub rpc: Arc<MockRpc>,
    pub owner: Pubkey,
    pub time: Arc<AtomicU64>,
    pub client: TestClient,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: StakingConfig) -> Self {
        let rpc = Arc::new(MockRpc::default());
        let keypair = Keypair::new();
        let owner = keypair.pubkey();
        rpc.set_balance(owner, LAMPORTS_PER_SOL);
        let time = Arc::new(AtomicU64::new(NOW));
        let client =
            StakingClient::new(rpc.clone(), keypair, config).with_clock(TestClock(time.clone()));
        Self {
            rpc,
            owner,
            time,
            client,
        }
    }

    pub fn accounts(&self, mint: &Pubkey) -> StakeAccounts {
        self.client.accounts(mint).unwrap()
    }

    pub fn advance(&self, seconds: u64) {
        self.time.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Put the NFT in the owner's wallet, unstaked
    pub fn hold_nft(&self, mint: &Pubkey) {
        let accounts = self.accounts(mint);
        self.rpc.set_account(
            accounts.user_nft_account,
            token_account_data(*mint, self.owner, 1),
        );
    }

    /// Write a stake record for the NFT as the program would
    pub fn stake_record(&self, mint: &Pubkey, staked_at: u64) -> StakeRecord {
        let record = StakeRecord::new(self.owner, *mint, staked_at);
        self.rpc.set_account(
            self.accounts(mint).stake_account,
            record.encode(AccountLayout::Discriminated),
        );
        record
    }

    /// Stake account data as the program writes it for `mint` staked now
    pub fn fresh_record_data(&self, mint: &Pubkey) -> Vec<u8> {
        StakeRecord::new(self.owner, *mint, self.client.now()).encode(AccountLayout::Discriminated)
    }
}

/// Whether `key` is writable and not a signer in the compiled message
pub fn is_writable_non_signer(transaction: &Transaction, key: &Pubkey) -> bool {
    let message = &transaction.message;
    let header = &message.header;
    let Some(index) = message.account_keys.iter().position(|k| k == key) else {
        return false;
    };
    index >= header.num_required_signatures as usize
        && index < message.account_keys.len() - header.num_readonly_unsigned_accounts as usize
}

/// Program id and data of each instruction in a compiled transaction
pub fn instructions(transaction: &Transaction) -> Vec<(Pubkey, Vec<u8>)> {
    let message = &transaction.message;
    message
        .instructions
        .iter()
        .map(|ix| {
            (
                message.account_keys[ix.program_id_index as usize],
                ix.data.clone(),
            )
        })
        .collect()
}
