use super::alert::{CONNECT_FIRST, INSTALL_WALLET, MISSING_FIELDS, TRANSFER_SUCCEEDED};
use super::amount::to_base_units;
use super::context::SessionContext;
use super::draft::FormDraft;
use super::error::{RemoteStage, SubmitError};
use super::ledger::LedgerReader;
use super::provider::{Account, LedgerContract, ValueTransfer, WalletProvider};
use ethers::types::{TxHash, U256};
use log::{debug, error, info, warn};
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    sync::{watch, Mutex},
    time,
};

/// Gas budget of a plain value transfer (0x5208)
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;
pub const DEFAULT_FINALITY_TIMEOUT: Duration = Duration::from_secs(300);
pub const CONFIRM_PROMPT: &str = "Are you sure to proceed?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    AwaitingConfirmation,
    StageTransfer,
    StageLedgerWrite,
    AwaitingFinality,
    Settled,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::AwaitingConfirmation => "awaiting confirmation",
            SubmissionState::StageTransfer => "value transfer",
            SubmissionState::StageLedgerWrite => "ledger write",
            SubmissionState::AwaitingFinality => "awaiting finality",
            SubmissionState::Settled => "settled",
        };
        f.write_str(name)
    }
}

/// Synchronous yes/no gate put in front of every submission
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitSettings {
    pub gas_limit: U256,
    pub finality_timeout: Duration,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            gas_limit: U256::from(DEFAULT_GAS_LIMIT),
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub sender: Account,
    pub transfer_hash: TxHash,
    pub ledger_hash: TxHash,
    pub amount: U256,
}

/// Runs the two-stage submission: native value transfer, then ledger write
#[derive(Clone)]
pub struct TransactionSubmitter {
    wallet: Option<Arc<dyn WalletProvider>>,
    contract: Option<Arc<dyn LedgerContract>>,
    reader: LedgerReader,
    context: SessionContext,
    settings: SubmitSettings,
    /// Single-slot lock, held for the whole attempt
    slot: Arc<Mutex<()>>,
    state: Arc<watch::Sender<SubmissionState>>,
}

impl TransactionSubmitter {
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        contract: Option<Arc<dyn LedgerContract>>,
        reader: LedgerReader,
        context: SessionContext,
        settings: SubmitSettings,
    ) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            wallet,
            contract,
            reader,
            context,
            settings,
            slot: Arc::new(Mutex::new(())),
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    fn transition(&self, next: SubmissionState) {
        debug!("(submit) {} -> {}", self.state(), next);
        self.state.send_replace(next);
    }

    /// Submits `draft` from the account active at entry.
    ///
    /// A second call while one is in flight is rejected with
    /// [`SubmitError::Busy`]. Whatever happens, the submitter is back to
    /// `Idle` when this returns.
    pub async fn submit(
        &self,
        draft: &FormDraft,
        confirm: &dyn Confirm,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let _slot = self.slot.try_lock().map_err(|_| SubmitError::Busy)?;
        let sender = self.context.active_account();

        let result = self.run(draft, sender, confirm).await;

        self.context.set_busy(false);
        self.transition(SubmissionState::Idle);

        match &result {
            Ok(receipt) => info!(
                "Transfer of {} base units from {} settled",
                receipt.amount, receipt.sender
            ),
            Err(SubmitError::Declined) => debug!("(submit) declined"),
            Err(e) if e.is_remote() => {
                error!("Submission failed: {:#}", e);
                self.context
                    .alerts()
                    .danger(format!("Transaction failed: {}", e));
            }
            Err(e) => debug!("(submit) rejected: {}", e),
        }
        result
    }

    async fn run(
        &self,
        draft: &FormDraft,
        sender: Option<Account>,
        confirm: &dyn Confirm,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.transition(SubmissionState::Validating);
        let alerts = self.context.alerts();

        if !draft.is_complete() {
            alerts.danger(MISSING_FIELDS);
            return Err(SubmitError::Validation);
        }
        let (wallet, contract) = match (&self.wallet, &self.contract) {
            (Some(wallet), Some(contract)) => (wallet, contract),
            _ => {
                alerts.danger(INSTALL_WALLET);
                return Err(SubmitError::ProviderUnavailable);
            }
        };
        let sender = match sender {
            Some(sender) => sender,
            None => {
                alerts.danger(CONNECT_FIRST);
                return Err(SubmitError::NotConnected);
            }
        };
        let amount = to_base_units(&draft.amount).map_err(|e| {
            alerts.danger(format!("Invalid amount: {}", draft.amount));
            SubmitError::from(e)
        })?;
        let recipient = Account::new(draft.address_to.as_str());

        self.transition(SubmissionState::AwaitingConfirmation);
        if !confirm.confirm(CONFIRM_PROMPT) {
            return Err(SubmitError::Declined);
        }
        self.context.set_busy(true);

        self.transition(SubmissionState::StageTransfer);
        let transfer = ValueTransfer {
            from: sender.clone(),
            to: recipient.clone(),
            value: amount,
            gas_limit: self.settings.gas_limit,
        };
        let transfer_hash = wallet
            .send_value_transfer(&transfer)
            .await
            .map_err(SubmitError::remote(RemoteStage::Transfer))?;
        debug!("(submit) value transfer accepted as {:?}", transfer_hash);

        self.transition(SubmissionState::StageLedgerWrite);
        let pending = contract
            .add_to_blockchain(&sender, &recipient, amount, &draft.message)
            .await
            .map_err(SubmitError::remote(RemoteStage::LedgerWrite))?;
        let ledger_hash = pending.tx_hash();

        self.transition(SubmissionState::AwaitingFinality);
        time::timeout(self.settings.finality_timeout, pending.wait_for_finality())
            .await
            .map_err(|_| SubmitError::FinalityTimeout(self.settings.finality_timeout))?
            .map_err(SubmitError::remote(RemoteStage::Finality))?;

        self.transition(SubmissionState::Settled);
        match contract.get_transaction_count().await {
            Ok(count) => info!("Ledger now holds {} transactions", count),
            Err(e) => warn!("Could not read transaction count: {}", e),
        }
        alerts.success(TRANSFER_SUCCEEDED);
        // failures are logged by the reader
        let _ = self.reader.fetch_all().await;

        Ok(SubmissionReceipt {
            sender,
            transfer_hash,
            ledger_hash,
            amount,
        })
    }
}
