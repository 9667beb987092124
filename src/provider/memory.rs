//! In-process stand-in for a wallet provider plus ledger contract.

use super::{
    emit_event, Account, LedgerContract, LedgerEntry, PendingWrite, ProviderEvent, ValueTransfer,
    WalletProvider,
};
use async_trait::async_trait;
use ethers::types::{TxHash, U256};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

/// First block timestamp handed out by a fresh chain
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Remote call observed by the chain, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RequestAccounts,
    ValueTransfer(ValueTransfer),
    AddToBlockchain {
        from: Account,
        to: Account,
        amount: U256,
        message: String,
    },
    GetAllTransactions,
    GetTransactionCount,
}

/// Where the next injected failure fires. One-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    RequestAccounts,
    ValueTransfer,
    LedgerWrite,
    Finality,
    Read,
}

struct ChainState {
    accounts: Vec<Account>,
    entries: Vec<LedgerEntry>,
    calls: Vec<Call>,
    fail_next: Option<FailPoint>,
    clock: u64,
    nonce: u64,
}

#[derive(Clone)]
pub struct MemoryChain {
    state: Arc<Mutex<ChainState>>,
    events: broadcast::Sender<ProviderEvent>,
    /// `true` while ledger writes may reach finality
    finality: Arc<watch::Sender<bool>>,
}

impl MemoryChain {
    pub fn new(accounts: Vec<Account>) -> Self {
        let (events, _) = broadcast::channel(20);
        let (finality, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(ChainState {
                accounts,
                entries: Vec::new(),
                calls: Vec::new(),
                fail_next: None,
                clock: GENESIS_TIMESTAMP,
                nonce: 0,
            })),
            events,
            finality: Arc::new(finality),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state().entries.clone()
    }

    pub fn push_entry(&self, entry: LedgerEntry) {
        self.state().entries.push(entry);
    }

    pub fn fail_next(&self, point: FailPoint) {
        self.state().fail_next = Some(point);
    }

    /// Replaces the exposed accounts and notifies subscribers
    pub fn switch_accounts(&self, accounts: Vec<Account>) {
        self.state().accounts = accounts.clone();
        emit_event(&self.events, ProviderEvent::AccountsChanged(accounts));
    }

    /// Pending writes stay pending until [`MemoryChain::release_finality`]
    pub fn hold_finality(&self) {
        self.finality.send_replace(false);
    }

    pub fn release_finality(&self) {
        self.finality.send_replace(true);
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn check(&self, point: FailPoint) -> anyhow::Result<()> {
        let mut state = self.state();
        if state.fail_next == Some(point) {
            state.fail_next = None;
            return Err(anyhow::anyhow!("injected {:?} failure", point));
        }
        Ok(())
    }

    fn next_hash(&self) -> TxHash {
        let mut state = self.state();
        state.nonce += 1;
        TxHash::from_low_u64_be(state.nonce)
    }
}

#[async_trait]
impl WalletProvider for MemoryChain {
    async fn request_accounts(&self) -> anyhow::Result<Vec<Account>> {
        self.record(Call::RequestAccounts);
        self.check(FailPoint::RequestAccounts)?;
        Ok(self.state().accounts.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    async fn send_value_transfer(&self, transfer: &ValueTransfer) -> anyhow::Result<TxHash> {
        self.record(Call::ValueTransfer(transfer.clone()));
        self.check(FailPoint::ValueTransfer)?;
        Ok(self.next_hash())
    }
}

#[async_trait]
impl LedgerContract for MemoryChain {
    async fn get_all_transactions(&self) -> anyhow::Result<Vec<LedgerEntry>> {
        self.record(Call::GetAllTransactions);
        self.check(FailPoint::Read)?;
        Ok(self.entries())
    }

    async fn add_to_blockchain(
        &self,
        from: &Account,
        to: &Account,
        amount: U256,
        message: &str,
    ) -> anyhow::Result<Box<dyn PendingWrite>> {
        self.record(Call::AddToBlockchain {
            from: from.clone(),
            to: to.clone(),
            amount,
            message: message.to_owned(),
        });
        self.check(FailPoint::LedgerWrite)?;
        Ok(Box::new(MemoryPendingWrite {
            hash: self.next_hash(),
            chain: self.clone(),
            entry: LedgerEntry {
                address_from: from.clone(),
                address_to: to.clone(),
                timestamp: 0,
                message: message.to_owned(),
                amount,
            },
        }))
    }

    async fn get_transaction_count(&self) -> anyhow::Result<U256> {
        self.record(Call::GetTransactionCount);
        Ok(U256::from(self.state().entries.len()))
    }
}

/// The entry is appended to the ledger once finality is observed
struct MemoryPendingWrite {
    hash: TxHash,
    chain: MemoryChain,
    entry: LedgerEntry,
}

#[async_trait]
impl PendingWrite for MemoryPendingWrite {
    fn tx_hash(&self) -> TxHash {
        self.hash
    }

    async fn wait_for_finality(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryPendingWrite { chain, mut entry, .. } = *self;
        let mut open = chain.finality.subscribe();
        open.wait_for(|open| *open).await?;
        chain.check(FailPoint::Finality)?;

        let mut state = chain.state();
        state.clock += 15;
        entry.timestamp = state.clock;
        state.entries.push(entry);
        Ok(())
    }
}
