use super::alert::AlertChannel;
use super::draft::{DraftField, FormDraft};
use super::ledger::DisplayTransaction;
use super::provider::Account;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct SessionState {
    /// Undefined until a connect or account event succeeds
    active_account: Option<Account>,
    busy: bool,
    transactions: Vec<DisplayTransaction>,
    draft: FormDraft,
}

/// Shared session state. Cloning hands out another handle to the same state.
#[derive(Clone, Default)]
pub struct SessionContext {
    state: Arc<RwLock<SessionState>>,
    alerts: AlertChannel,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn alerts(&self) -> &AlertChannel {
        &self.alerts
    }

    pub fn active_account(&self) -> Option<Account> {
        self.read().active_account.clone()
    }

    /// Last write wins. Returns whether the account actually changed.
    pub fn set_active_account(&self, account: Account) -> bool {
        let mut state = self.write();
        let changed = state.active_account.as_ref() != Some(&account);
        state.active_account = Some(account);
        changed
    }

    pub fn is_busy(&self) -> bool {
        self.read().busy
    }

    pub fn set_busy(&self, busy: bool) {
        self.write().busy = busy;
    }

    pub fn transactions(&self) -> Vec<DisplayTransaction> {
        self.read().transactions.clone()
    }

    pub fn set_transactions(&self, transactions: Vec<DisplayTransaction>) {
        self.write().transactions = transactions;
    }

    pub fn draft(&self) -> FormDraft {
        self.read().draft.clone()
    }

    pub fn set_field(&self, field: DraftField, value: impl Into<String>) {
        self.write().draft.set(field, value);
    }
}
