use super::alert::{INSTALL_WALLET, NO_ACCOUNT_FOUND, WALLETS_SWITCHED};
use super::context::SessionContext;
use super::error::SessionError;
use super::ledger::LedgerReader;
use super::provider::{Account, ProviderEvent, WalletProvider};
use log::{debug, error, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{
    select,
    sync::{broadcast::error::RecvError, oneshot},
    task::JoinHandle,
};

/// Tracks the active account against the wallet provider
#[derive(Clone)]
pub struct WalletSession {
    wallet: Option<Arc<dyn WalletProvider>>,
    context: SessionContext,
    subscribed: Arc<AtomicBool>,
}

impl WalletSession {
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, context: SessionContext) -> Self {
        Self {
            wallet,
            context,
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, SessionError> {
        match &self.wallet {
            Some(wallet) => Ok(wallet),
            None => {
                self.context.alerts().danger(INSTALL_WALLET);
                Err(SessionError::ProviderUnavailable)
            }
        }
    }

    /// Explicit connect. Every failure is surfaced as a danger alert.
    ///
    /// Returns whether the active account changed.
    pub async fn connect(&self) -> Result<bool, SessionError> {
        let wallet = self.wallet()?;
        let accounts = wallet.request_accounts().await.map_err(|e| {
            error!("Account request failed: {:#}", e);
            self.context.alerts().danger(e.to_string());
            SessionError::Remote(e)
        })?;

        match accounts.into_iter().next() {
            Some(account) => Ok(self.activate(account)),
            None => {
                self.context.alerts().danger(NO_ACCOUNT_FOUND);
                Err(SessionError::EmptyAccountSet)
            }
        }
    }

    /// Account discovery without user-facing noise. Only a missing provider
    /// raises an alert; everything else is logged.
    pub async fn refresh_silently(&self) -> Result<bool, SessionError> {
        let wallet = self.wallet()?;
        let accounts = wallet.request_accounts().await.map_err(|e| {
            warn!("Silent account refresh failed: {:#}", e);
            SessionError::Remote(e)
        })?;

        match accounts.into_iter().next() {
            Some(account) => Ok(self.activate(account)),
            None => {
                debug!("Wallet exposes no accounts");
                Err(SessionError::EmptyAccountSet)
            }
        }
    }

    fn activate(&self, account: Account) -> bool {
        let changed = self.context.set_active_account(account.clone());
        if changed {
            info!("Account {} is connected", account);
        }
        changed
    }

    /// Starts listening for provider account switches. Each switch refreshes
    /// the active account, announces it and reloads `ledger` if the account
    /// changed.
    ///
    /// Only one subscription may ever be established per session.
    pub fn subscribe_account_changes(
        &self,
        ledger: LedgerReader,
    ) -> Result<AccountSubscription, SessionError> {
        let wallet = self.wallet()?;
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadySubscribed);
        }

        let mut events = wallet.subscribe();
        let session = self.clone();
        let (shutdown, mut shutdown_receiver) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                select! {
                    _ = &mut shutdown_receiver => return,
                    event = events.recv() => match event {
                        Ok(ProviderEvent::AccountsChanged(accounts)) => {
                            debug!("(wallet) accounts changed: {:?}", accounts);
                            session.on_accounts_changed(&ledger).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("(wallet) {} provider events skipped", skipped);
                            session.on_accounts_changed(&ledger).await;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        Ok(AccountSubscription {
            shutdown: Some(shutdown),
            handle,
        })
    }

    async fn on_accounts_changed(&self, ledger: &LedgerReader) {
        let changed = self.refresh_silently().await.unwrap_or(false);
        self.context.alerts().success(WALLETS_SWITCHED);
        if changed {
            // failures are logged by the reader
            let _ = ledger.fetch_all().await;
        }
    }
}

/// Live account-change listener. Dropping it stops the listener as well.
pub struct AccountSubscription {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl AccountSubscription {
    /// Stops listening and waits for the listener to finish
    pub async fn cancel(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            error!("Account subscription ended abnormally: {}", e);
        }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
