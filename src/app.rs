use super::alert::Alert;
use super::context::SessionContext;
use super::draft::{DraftField, FormDraft};
use super::error::{LedgerError, SessionError, SubmitError};
use super::ledger::{DisplayTransaction, LedgerReader};
use super::provider::{Account, LedgerContract, WalletProvider};
use super::submitter::{Confirm, SubmissionReceipt, SubmitSettings, TransactionSubmitter};
use super::wallet::{AccountSubscription, WalletSession};
use log::debug;
use serde::Serialize;
use std::sync::Arc;

/// Everything the UI renders, captured at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub active_account: Option<Account>,
    pub connected: bool,
    pub busy: bool,
    pub alert: Option<Alert>,
    pub draft: FormDraft,
    pub transactions: Vec<DisplayTransaction>,
}

/// Owns the session context and wires the components around it
pub struct App {
    context: SessionContext,
    wallet: WalletSession,
    ledger: LedgerReader,
    submitter: TransactionSubmitter,
    subscription: Option<AccountSubscription>,
}

impl App {
    /// `wallet` and `contract` are `None` when no provider is present
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        contract: Option<Arc<dyn LedgerContract>>,
        settings: SubmitSettings,
    ) -> Self {
        let context = SessionContext::new();
        let ledger = LedgerReader::new(contract.clone(), context.clone());
        Self::with_reader(wallet, contract, ledger, context, settings)
    }

    pub fn with_reader(
        wallet: Option<Arc<dyn WalletProvider>>,
        contract: Option<Arc<dyn LedgerContract>>,
        ledger: LedgerReader,
        context: SessionContext,
        settings: SubmitSettings,
    ) -> Self {
        Self {
            wallet: WalletSession::new(wallet.clone(), context.clone()),
            submitter: TransactionSubmitter::new(
                wallet,
                contract,
                ledger.clone(),
                context.clone(),
                settings,
            ),
            ledger,
            context,
            subscription: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Session start: silent account discovery, first history load and the
    /// account-change subscription. Later calls only repeat the discovery.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if let Ok(true) = self.wallet.refresh_silently().await {
            let _ = self.ledger.fetch_all().await;
        }
        if self.subscription.is_none() {
            self.subscription = Some(self.wallet.subscribe_account_changes(self.ledger.clone())?);
        }
        Ok(())
    }

    /// Explicit connect; reloads the history when the account changed
    pub async fn connect(&self) -> Result<(), SessionError> {
        if self.wallet.connect().await? {
            let _ = self.ledger.fetch_all().await;
        }
        Ok(())
    }

    pub async fn refresh(&self) -> Result<Vec<DisplayTransaction>, LedgerError> {
        self.ledger.fetch_all().await
    }

    /// Submits the current draft. The draft is left as it was.
    pub async fn submit(&self, confirm: &dyn Confirm) -> Result<SubmissionReceipt, SubmitError> {
        let draft = self.context.draft();
        self.submitter.submit(&draft, confirm).await
    }

    pub fn set_field(&self, field: DraftField, value: impl Into<String>) {
        self.context.set_field(field, value);
    }

    pub fn dismiss_alert(&self) {
        self.context.alerts().dismiss();
    }

    pub fn view(&self) -> SessionView {
        let active_account = self.context.active_account();
        SessionView {
            connected: active_account.is_some(),
            active_account,
            busy: self.context.is_busy(),
            alert: self.context.alerts().current(),
            draft: self.context.draft(),
            transactions: self.context.transactions(),
        }
    }

    /// Tears down the account-change subscription
    pub async fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("Cancelling account subscription");
            subscription.cancel().await;
        }
    }
}
