use ethers::utils::ConversionError;
use std::{fmt, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmountError {
    #[error("Negative amount: {0}")]
    Negative(String),

    #[error("Not a plain decimal amount: {0}")]
    NotDecimal(String),

    #[error("Amount has more than 18 decimal places: {0}")]
    TooPrecise(String),

    #[error("Malformed amount: {0}")]
    Malformed(#[from] ConversionError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No wallet provider available")]
    ProviderUnavailable,

    #[error("Wallet provider returned no accounts")]
    EmptyAccountSet,

    #[error("Account-change subscription already established")]
    AlreadySubscribed,

    #[error("Account request failed: {0}")]
    Remote(#[source] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No ledger provider available")]
    ProviderUnavailable,

    #[error("Ledger read failed: {0}")]
    Remote(#[source] anyhow::Error),
}

/// Remote step of a submission that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStage {
    Transfer,
    LedgerWrite,
    Finality,
}

impl fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStage::Transfer => f.write_str("value transfer"),
            RemoteStage::LedgerWrite => f.write_str("ledger write"),
            RemoteStage::Finality => f.write_str("finality wait"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Recipient address and amount are required")]
    Validation,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("No active account")]
    NotConnected,

    #[error("No wallet provider available")]
    ProviderUnavailable,

    #[error("Submission declined by user")]
    Declined,

    #[error("Another submission is in flight")]
    Busy,

    #[error("{stage} failed: {source}")]
    Remote {
        stage: RemoteStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Ledger write not final after {0:?}")]
    FinalityTimeout(Duration),
}

impl SubmitError {
    pub(crate) fn remote(stage: RemoteStage) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| SubmitError::Remote { stage, source }
    }

    /// Failures raised after the user confirmed, i.e. once remote calls began
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SubmitError::Remote { .. } | SubmitError::FinalityTimeout(_)
        )
    }
}
