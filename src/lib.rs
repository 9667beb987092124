//! Wallet session and ledger synchronisation for a transfer dapp.
//!
//! A [`WalletSession`] tracks the active account, a [`TransactionSubmitter`]
//! pairs every native value transfer with a write to an append-only ledger
//! contract, and a [`LedgerReader`] rebuilds the account's history from that
//! ledger. [`App`] ties them to one shared [`SessionContext`].

pub mod alert;
pub mod amount;
pub mod app;
pub mod config;
pub mod context;
pub mod draft;
pub mod error;
pub mod ledger;
pub mod provider;
pub mod submitter;
pub mod wallet;

pub use alert::{Alert, AlertChannel, AlertKind};
pub use app::{App, SessionView};
pub use config::{Backend, Config};
pub use context::SessionContext;
pub use draft::{DraftField, FormDraft};
pub use error::{AmountError, LedgerError, RemoteStage, SessionError, SubmitError};
pub use ledger::{DisplayTransaction, LedgerReader};
pub use provider::{Account, LedgerContract, LedgerEntry, PendingWrite, ProviderEvent, WalletProvider};
pub use submitter::{Confirm, SubmissionReceipt, SubmissionState, SubmitSettings, TransactionSubmitter};
pub use wallet::{AccountSubscription, WalletSession};
