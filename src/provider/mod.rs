pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use log::error;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
};
use tokio::sync::broadcast;

/// Account address as handed out by the wallet provider.
///
/// No format validation happens here; equality and hashing ignore ASCII case
/// so that checksummed and lower-cased forms of the same address match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the address into its 20-byte form for providers that need it
    pub fn to_address(&self) -> anyhow::Result<Address> {
        self.0
            .parse::<Address>()
            .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", self.0, e))
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self(format!("{:#x}", address))
    }
}

impl From<&str> for Account {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// One record of the remote ledger, exactly as the contract returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub address_from: Account,
    pub address_to: Account,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    pub message: String,
    /// Amount in base units (1e-18 of the display denomination)
    pub amount: U256,
}

impl LedgerEntry {
    /// Whether `account` is either side of this entry
    pub fn touches(&self, account: &Account) -> bool {
        &self.address_from == account || &self.address_to == account
    }
}

/// Funded transfer request handed to the wallet provider for signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueTransfer {
    pub from: Account,
    pub to: Account,
    pub value: U256,
    pub gas_limit: U256,
}

impl ValueTransfer {
    pub fn value_hex(&self) -> String {
        format!("{:#x}", self.value)
    }

    pub fn gas_limit_hex(&self) -> String {
        format!("{:#x}", self.gas_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The provider's exposed account list changed
    AccountsChanged(Vec<Account>),
}

/// Browser-style wallet: account access and transaction signing
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the provider for the accounts the user exposes to us.
    /// Fails when the provider rejects the request.
    async fn request_accounts(&self) -> anyhow::Result<Vec<Account>>;

    /// Receiver for passive provider events (account switches)
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;

    /// Requests a funded value transfer. Resolves once the provider has
    /// accepted and signed it.
    async fn send_value_transfer(&self, transfer: &ValueTransfer) -> anyhow::Result<TxHash>;
}

/// Append-only remote store of transfer records
#[async_trait]
pub trait LedgerContract: Send + Sync {
    async fn get_all_transactions(&self) -> anyhow::Result<Vec<LedgerEntry>>;

    /// Issues the ledger write and returns as soon as it is pending
    async fn add_to_blockchain(
        &self,
        from: &Account,
        to: &Account,
        amount: U256,
        message: &str,
    ) -> anyhow::Result<Box<dyn PendingWrite>>;

    async fn get_transaction_count(&self) -> anyhow::Result<U256>;
}

/// Handle to a ledger write that has been submitted but not yet confirmed
#[async_trait]
pub trait PendingWrite: Send {
    fn tx_hash(&self) -> TxHash;

    /// Suspends until the write is final. Unbounded; callers add their own
    /// deadline.
    async fn wait_for_finality(self: Box<Self>) -> anyhow::Result<()>;
}

pub(crate) fn emit_event(sender: &broadcast::Sender<ProviderEvent>, event: ProviderEvent) {
    if sender.send(event).is_err() {
        error!("Provider event dropped: no subscriber listening");
    }
}
