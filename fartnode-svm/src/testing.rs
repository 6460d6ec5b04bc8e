//! In-memory RPC doubles for tests, here and in downstream crates.
//!
//! Enabled by the `test_utils` feature.

use fartnode::Commitment;
use solana_account::Account;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_client::rpc_response::RpcPrioritizationFee;
use solana_commitment_config::CommitmentConfig;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::chain::{RpcClientLike, RpcConnector, SignatureStatus, SimulationResponse};

/// A custom RPC error carrying `message`.
#[must_use]
pub fn rpc_error(message: &str) -> ClientError {
    ClientError::from(ClientErrorKind::Custom(message.to_owned()))
}

/// Scripted responses and recorded calls of a [`MockRpc`].
#[derive(Debug)]
#[allow(missing_docs)]
pub struct MockState {
    pub epoch: Result<u64, String>,
    pub probes: usize,
    pub blockhash: (Hash, u64),
    pub blockhash_calls: usize,
    pub block_heights: VecDeque<u64>,
    pub block_height: u64,
    pub fees: Result<Vec<u64>, String>,
    pub fee_requests: Vec<Vec<Pubkey>>,
    pub accounts: HashMap<Pubkey, Account>,
    pub account_requests: Vec<Pubkey>,
    pub simulation: Result<SimulationResponse, String>,
    pub simulate_configs: Vec<RpcSimulateTransactionConfig>,
    pub simulated: Vec<VersionedTransaction>,
    pub send_results: VecDeque<Result<Signature, String>>,
    pub sent: Vec<VersionedTransaction>,
    pub send_configs: Vec<RpcSendTransactionConfig>,
    pub statuses: VecDeque<SignatureStatus>,
    pub airdrop: Result<Signature, String>,
    pub airdrops: Vec<(Pubkey, u64)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            epoch: Ok(600),
            probes: 0,
            blockhash: (Hash::new_from_array([7; 32]), 1_000),
            blockhash_calls: 0,
            block_heights: VecDeque::new(),
            block_height: 100,
            fees: Ok(Vec::new()),
            fee_requests: Vec::new(),
            accounts: HashMap::new(),
            account_requests: Vec::new(),
            simulation: Ok(SimulationResponse {
                err: None,
                logs: Some(vec!["Program log: ok".to_owned()]),
                units_consumed: Some(1_234),
            }),
            simulate_configs: Vec::new(),
            simulated: Vec::new(),
            send_results: VecDeque::new(),
            sent: Vec::new(),
            send_configs: Vec::new(),
            statuses: VecDeque::new(),
            airdrop: Ok(Signature::from([9; 64])),
            airdrops: Vec::new(),
        }
    }
}

/// A scripted [`RpcClientLike`].
#[derive(Debug)]
pub struct MockRpc {
    url: String,
    state: Mutex<MockState>,
}

impl MockRpc {
    /// A healthy mock for `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Locks the scripted state.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adjusts the scripted state.
    #[must_use]
    pub fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state());
        self
    }
}

impl RpcClientLike for MockRpc {
    fn url(&self) -> String {
        self.url.clone()
    }

    async fn get_epoch(&self) -> Result<u64, ClientError> {
        let mut state = self.state();
        state.probes += 1;
        state.epoch.clone().map_err(|e| rpc_error(&e))
    }

    async fn get_latest_blockhash_with_commitment(
        &self,
        _commitment: CommitmentConfig,
    ) -> Result<(Hash, u64), ClientError> {
        let mut state = self.state();
        state.blockhash_calls += 1;
        Ok(state.blockhash)
    }

    async fn get_block_height_with_commitment(
        &self,
        _commitment: CommitmentConfig,
    ) -> Result<u64, ClientError> {
        let mut state = self.state();
        if let Some(next) = state.block_heights.pop_front() {
            state.block_height = next;
        }
        Ok(state.block_height)
    }

    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<RpcPrioritizationFee>, ClientError> {
        let mut state = self.state();
        state.fee_requests.push(addresses.to_vec());
        let fees = state.fees.clone().map_err(|e| rpc_error(&e))?;
        Ok(fees
            .into_iter()
            .enumerate()
            .map(|(slot, prioritization_fee)| RpcPrioritizationFee {
                slot: u64::try_from(slot).unwrap_or_default(),
                prioritization_fee,
            })
            .collect())
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Account, ClientError> {
        let mut state = self.state();
        state.account_requests.push(*pubkey);
        state
            .accounts
            .get(pubkey)
            .cloned()
            .ok_or_else(|| rpc_error(&format!("AccountNotFound: pubkey={pubkey}")))
    }

    async fn simulate_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSimulateTransactionConfig,
    ) -> Result<SimulationResponse, ClientError> {
        let mut state = self.state();
        state.simulate_configs.push(config);
        state.simulated.push(transaction.clone());
        state.simulation.clone().map_err(|e| rpc_error(&e))
    }

    async fn send_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> Result<Signature, ClientError> {
        let mut state = self.state();
        state.sent.push(transaction.clone());
        state.send_configs.push(config);
        match state.send_results.pop_front() {
            Some(result) => result.map_err(|e| rpc_error(&e)),
            None => Ok(transaction.signatures.first().copied().unwrap_or_default()),
        }
    }

    async fn get_signature_status_with_commitment(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SignatureStatus, ClientError> {
        Ok(self
            .state()
            .statuses
            .pop_front()
            .unwrap_or(SignatureStatus::Confirmed))
    }

    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> Result<Signature, ClientError> {
        let mut state = self.state();
        state.airdrops.push((*pubkey, lamports));
        state.airdrop.clone().map_err(|e| rpc_error(&e))
    }
}

/// Hands out pre-registered mocks per endpoint; unknown endpoints get a healthy default.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    mocks: Arc<Mutex<HashMap<String, Arc<MockRpc>>>>,
    opened: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Serves `rpc` for its URL.
    pub fn register(&self, rpc: MockRpc) -> Arc<MockRpc> {
        let rpc = Arc::new(rpc);
        self.mocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rpc.url.clone(), Arc::clone(&rpc));
        rpc
    }

    /// Number of clients opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl RpcConnector for MockConnector {
    type Client = Arc<MockRpc>;

    fn connect(&self, endpoint: &str, _commitment: Commitment) -> Arc<MockRpc> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Arc::clone(
            self.mocks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(endpoint.to_owned())
                .or_insert_with(|| Arc::new(MockRpc::new(endpoint))),
        )
    }
}

/// Raw account data of an active address lookup table holding `addresses`.
#[must_use]
pub fn lookup_table_data(addresses: &[Pubkey]) -> Vec<u8> {
    let mut data = Vec::with_capacity(56 + addresses.len() * 32);
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&u64::MAX.to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes());
    data.push(0);
    data.push(1);
    data.extend_from_slice(&[1; 32]);
    data.extend_from_slice(&[0, 0]);
    for address in addresses {
        data.extend_from_slice(address.as_ref());
    }
    data
}

/// An account owned by the lookup-table program holding `addresses`.
#[must_use]
pub fn lookup_table_account(addresses: &[Pubkey]) -> Account {
    Account {
        lamports: 1_000_000,
        data: lookup_table_data(addresses),
        owner: solana_address_lookup_table_interface::program::id(),
        executable: false,
        rent_epoch: 0,
    }
}
