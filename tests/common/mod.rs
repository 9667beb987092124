//! Shared helpers for the session integration tests

#![allow(dead_code)]

use ethers::types::U256;
use ledger_session::{
    provider::memory::MemoryChain, App, LedgerContract, LedgerEntry, SubmitSettings,
    WalletProvider,
};
use std::{future::Future, sync::Arc, time::Duration};

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn entry(from: &str, to: &str, timestamp: u64, amount: U256, message: &str) -> LedgerEntry {
    LedgerEntry {
        address_from: from.into(),
        address_to: to.into(),
        timestamp,
        message: message.to_string(),
        amount,
    }
}

pub fn app_over(chain: &MemoryChain) -> App {
    init_logging();
    let wallet: Arc<dyn WalletProvider> = Arc::new(chain.clone());
    let contract: Arc<dyn LedgerContract> = Arc::new(chain.clone());
    App::new(Some(wallet), Some(contract), SubmitSettings::default())
}

pub fn accept(_: &str) -> bool {
    true
}

/// Polls `condition` until it holds, failing the test after five seconds
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}
