//! Wallet provider and ledger contract over an Ethereum JSON-RPC endpoint.
//!
//! The endpoint plays the part of the browser wallet: it exposes unlocked
//! accounts and signs `eth_sendTransaction` requests on their behalf.

use super::{
    emit_event, Account, LedgerContract, LedgerEntry, PendingWrite, ProviderEvent, ValueTransfer,
    WalletProvider,
};
use async_trait::async_trait;
use ethers::{
    abi::Abi,
    contract::Contract,
    providers::{Http, Middleware, PendingTransaction, Provider},
    types::{Address, TransactionRequest, TxHash, U256, U64},
};
use log::{debug, error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::{select, sync::broadcast, sync::oneshot, task::JoinHandle, time};

const LEDGER_ABI: &str = r#"[
    {
        "type": "function",
        "name": "addToBlockchain",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "receiver", "type": "address" },
            { "name": "amount", "type": "uint256" },
            { "name": "message", "type": "string" }
        ],
        "outputs": []
    },
    {
        "type": "function",
        "name": "getAllTransactions",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [
            {
                "name": "",
                "type": "tuple[]",
                "components": [
                    { "name": "addressFrom", "type": "address" },
                    { "name": "addressTo", "type": "address" },
                    { "name": "amount", "type": "uint256" },
                    { "name": "message", "type": "string" },
                    { "name": "timestamp", "type": "uint256" }
                ]
            }
        ]
    },
    {
        "type": "function",
        "name": "getTransactionCount",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{ "name": "", "type": "uint256" }]
    }
]"#;

/// `(addressFrom, addressTo, amount, message, timestamp)` as stored on chain
type RawEntry = (Address, Address, U256, String, U256);

pub struct RpcWallet {
    provider: Provider<Http>,
    events: broadcast::Sender<ProviderEvent>,
}

impl RpcWallet {
    pub fn new(network_url: &str) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(network_url)?;
        let (events, _) = broadcast::channel(20);
        Ok(Self { provider, events })
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    /// Polls `eth_accounts` and emits `AccountsChanged` whenever the list
    /// differs from the previous poll. Plain RPC endpoints have no push
    /// notifications for this.
    pub fn spawn_account_poller(&self, every: Duration) -> AccountPoller {
        let provider = self.provider.clone();
        let events = self.events.clone();
        let (shutdown, mut shutdown_receiver) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(every);
            let mut last_seen: Option<Vec<Address>> = None;
            loop {
                select! {
                    _ = &mut shutdown_receiver => return,
                    _ = interval.tick() => {
                        match provider.get_accounts().await {
                            Ok(accounts) => {
                                if last_seen.as_ref().is_some_and(|seen| seen != &accounts) {
                                    debug!("(poller) account list changed to {:?}", accounts);
                                    emit_event(
                                        &events,
                                        ProviderEvent::AccountsChanged(
                                            accounts.iter().copied().map(Account::from).collect(),
                                        ),
                                    );
                                }
                                last_seen = Some(accounts);
                            }
                            Err(e) => warn!("(poller) eth_accounts failed: {}", e),
                        }
                    }
                }
            }
        });

        AccountPoller {
            shutdown: Some(shutdown),
            handle,
        }
    }
}

pub struct AccountPoller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl AccountPoller {
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            error!("Account poller ended abnormally: {}", e);
        }
    }
}

impl Drop for AccountPoller {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> anyhow::Result<Vec<Account>> {
        let accounts: Vec<Address> = self.provider.request("eth_requestAccounts", ()).await?;
        Ok(accounts.into_iter().map(Account::from).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    async fn send_value_transfer(&self, transfer: &ValueTransfer) -> anyhow::Result<TxHash> {
        let request = TransactionRequest::new()
            .from(transfer.from.to_address()?)
            .to(transfer.to.to_address()?)
            .value(transfer.value)
            .gas(transfer.gas_limit);
        debug!(
            "eth_sendTransaction value {} gas {}",
            transfer.value_hex(),
            transfer.gas_limit_hex()
        );
        let hash: TxHash = self.provider.request("eth_sendTransaction", [request]).await?;
        Ok(hash)
    }
}

pub struct RpcLedger {
    contract: Contract<Provider<Http>>,
    provider: Provider<Http>,
    confirmations: usize,
}

impl RpcLedger {
    pub fn new(provider: Provider<Http>, address: Address, confirmations: usize) -> anyhow::Result<Self> {
        let abi: Abi = serde_json::from_str(LEDGER_ABI)?;
        let contract = Contract::new(address, abi, Arc::new(provider.clone()));
        info!("Ledger contract at {:#x}", address);
        Ok(Self {
            contract,
            provider,
            confirmations,
        })
    }
}

#[async_trait]
impl LedgerContract for RpcLedger {
    async fn get_all_transactions(&self) -> anyhow::Result<Vec<LedgerEntry>> {
        let raw: Vec<RawEntry> = self
            .contract
            .method::<_, Vec<RawEntry>>("getAllTransactions", ())?
            .call()
            .await?;

        raw.into_iter()
            .map(|(from, to, amount, message, timestamp)| {
                if timestamp > U256::from(u64::MAX) {
                    return Err(anyhow::anyhow!("Timestamp {} out of range", timestamp));
                }
                Ok(LedgerEntry {
                    address_from: from.into(),
                    address_to: to.into(),
                    timestamp: timestamp.as_u64(),
                    message,
                    amount,
                })
            })
            .collect()
    }

    async fn add_to_blockchain(
        &self,
        from: &Account,
        to: &Account,
        amount: U256,
        message: &str,
    ) -> anyhow::Result<Box<dyn PendingWrite>> {
        let call = self
            .contract
            .method::<_, ()>(
                "addToBlockchain",
                (to.to_address()?, amount, message.to_owned()),
            )?
            .from(from.to_address()?);
        let pending = call.send().await?;
        let hash = pending.tx_hash();
        debug!("ledger write pending as {:?}", hash);

        Ok(Box::new(RpcPendingWrite {
            hash,
            provider: self.provider.clone(),
            confirmations: self.confirmations,
        }))
    }

    async fn get_transaction_count(&self) -> anyhow::Result<U256> {
        Ok(self
            .contract
            .method::<_, U256>("getTransactionCount", ())?
            .call()
            .await?)
    }
}

pub struct RpcPendingWrite {
    hash: TxHash,
    provider: Provider<Http>,
    confirmations: usize,
}

#[async_trait]
impl PendingWrite for RpcPendingWrite {
    fn tx_hash(&self) -> TxHash {
        self.hash
    }

    async fn wait_for_finality(self: Box<Self>) -> anyhow::Result<()> {
        let receipt = PendingTransaction::new(self.hash, &self.provider)
            .confirmations(self.confirmations)
            .await?;
        match receipt {
            Some(receipt) if receipt.status == Some(U64::from(1)) => Ok(()),
            Some(_) => Err(anyhow::anyhow!("Ledger write {:?} reverted", self.hash)),
            None => Err(anyhow::anyhow!("Ledger write {:?} dropped", self.hash)),
        }
    }
}
