//! End-to-end session behaviour against the in-memory chain

mod common;

use common::{accept, app_over, entry, eventually};
use ethers::types::U256;
use ledger_session::{
    alert::{INSTALL_WALLET, TRANSFER_SUCCEEDED, WALLETS_SWITCHED},
    provider::memory::{Call, MemoryChain},
    Account, Alert, App, DraftField, SessionError, SubmitSettings,
};

#[tokio::test]
async fn history_shows_only_entries_of_active_account() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    chain.push_entry(entry("0xAAA", "0xBBB", 1_700_000_000, U256::exp10(16), "E1"));
    chain.push_entry(entry("0xCCC", "0xDDD", 1_700_000_100, U256::exp10(16), "E2"));

    let mut app = app_over(&chain);
    app.start().await.unwrap();

    let view = app.view();
    assert_eq!(view.active_account, Some(Account::new("0xAAA")));
    assert!(view.connected);
    assert_eq!(view.transactions.len(), 1);
    assert_eq!(view.transactions[0].message, "E1");
    app.shutdown().await;
}

#[tokio::test]
async fn submission_lands_in_refreshed_history() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    let mut app = app_over(&chain);
    app.start().await.unwrap();

    app.set_field(DraftField::AddressTo, "0xBBB");
    app.set_field(DraftField::Amount, "0.01");
    app.set_field(DraftField::Message, "hi");
    app.submit(&accept).await.unwrap();

    let transfer = chain
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::ValueTransfer(transfer) => Some(transfer),
            _ => None,
        })
        .unwrap();
    assert_eq!(transfer.value, U256::from(10_000_000_000_000_000u64));
    assert_eq!(transfer.from, Account::new("0xAAA"));

    let view = app.view();
    assert_eq!(view.transactions.len(), 1);
    assert_eq!(view.transactions[0].amount, 0.01);
    assert_eq!(view.transactions[0].address_to, Account::new("0xbbb"));
    assert_eq!(view.alert, Some(Alert::success(TRANSFER_SUCCEEDED)));
    assert!(!view.busy);

    // the form is deliberately left as submitted
    assert_eq!(view.draft.address_to, "0xBBB");
    assert_eq!(view.draft.amount, "0.01");
    assert_eq!(view.draft.message, "hi");
    app.shutdown().await;
}

#[tokio::test]
async fn connect_without_provider_only_alerts() {
    let app = App::new(None, None, SubmitSettings::default());
    assert!(matches!(
        app.connect().await,
        Err(SessionError::ProviderUnavailable)
    ));

    let view = app.view();
    assert_eq!(view.alert, Some(Alert::danger(INSTALL_WALLET)));
    assert_eq!(view.active_account, None);
    assert!(!view.connected);
}

#[tokio::test]
async fn repeated_fetches_are_identical() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    for i in 0..5u64 {
        chain.push_entry(entry("0xAAA", "0xBBB", 1_700_000_000 + i, U256::from(i), "x"));
        chain.push_entry(entry("0xBBB", "0xAAA", 1_700_000_500 + i, U256::from(i), "y"));
    }
    let mut app = app_over(&chain);
    app.start().await.unwrap();

    let first = app.refresh().await.unwrap();
    let second = app.refresh().await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
    app.shutdown().await;
}

#[tokio::test]
async fn switching_wallets_reloads_history() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    chain.push_entry(entry("0xAAA", "0xBBB", 1_700_000_000, U256::one(), "E1"));
    chain.push_entry(entry("0xCCC", "0xDDD", 1_700_000_100, U256::one(), "E2"));

    let mut app = app_over(&chain);
    app.start().await.unwrap();
    chain.switch_accounts(vec!["0xCCC".into()]);

    eventually(|| {
        let view = app.view();
        async move {
            view.active_account == Some(Account::new("0xCCC"))
                && view.transactions.first().map(|t| t.message.as_str()) == Some("E2")
        }
    })
    .await;

    let view = app.view();
    assert_eq!(view.transactions.len(), 1);
    assert_eq!(view.alert, Some(Alert::success(WALLETS_SWITCHED)));
    app.shutdown().await;
}

#[tokio::test]
async fn cancelled_subscription_ignores_switches() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    let mut app = app_over(&chain);
    app.start().await.unwrap();
    app.shutdown().await;

    chain.switch_accounts(vec!["0xCCC".into()]);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(app.view().active_account, Some(Account::new("0xAAA")));
    assert_eq!(app.view().alert, None);
}

#[tokio::test]
async fn restart_keeps_a_single_subscription() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    let mut app = app_over(&chain);
    app.start().await.unwrap();
    app.start().await.unwrap();

    chain.switch_accounts(vec!["0xBBB".into()]);
    eventually(|| {
        let account = app.view().active_account;
        async move { account == Some(Account::new("0xBBB")) }
    })
    .await;

    let lookups = chain
        .calls()
        .iter()
        .filter(|call| **call == Call::RequestAccounts)
        .count();
    // two starts plus exactly one event-driven refresh
    assert_eq!(lookups, 3);
    app.shutdown().await;
}

#[tokio::test]
async fn mixed_case_accounts_match_ledger_entries() {
    let chain = MemoryChain::new(vec!["0xAbCdEf0000000000000000000000000000000001".into()]);
    chain.push_entry(entry(
        "0xabcdef0000000000000000000000000000000001",
        "0x00000000000000000000000000000000000000ff",
        1_700_000_000,
        U256::exp10(18),
        "lower",
    ));
    let mut app = app_over(&chain);
    app.start().await.unwrap();

    let view = app.view();
    assert_eq!(view.transactions.len(), 1);
    assert_eq!(view.transactions[0].amount, 1.0);
    app.shutdown().await;
}

#[tokio::test]
async fn dismiss_clears_message_only() {
    let app = App::new(None, None, SubmitSettings::default());
    let _ = app.connect().await;
    app.dismiss_alert();
    assert_eq!(app.view().alert, None);
    assert_eq!(app.context().alerts().kind(), ledger_session::AlertKind::Danger);
}

#[tokio::test]
async fn view_serializes_for_the_ui() {
    let chain = MemoryChain::new(vec!["0xAAA".into()]);
    chain.push_entry(entry("0xAAA", "0xBBB", 1_700_000_000, U256::exp10(16), "hi"));
    let mut app = app_over(&chain);
    app.start().await.unwrap();

    let json = serde_json::to_value(app.view()).unwrap();
    assert_eq!(json["activeAccount"], "0xAAA");
    assert_eq!(json["busy"], false);
    assert_eq!(json["transactions"][0]["addressFrom"], "0xAAA");
    assert_eq!(json["transactions"][0]["amount"], 0.01);
    assert_eq!(json["draft"]["addressTo"], "");
    app.shutdown().await;
}
