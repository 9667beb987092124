use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

pub const INSTALL_WALLET: &str = "Please install MetaMask.";
pub const NO_ACCOUNT_FOUND: &str = "No Account Found..";
pub const WALLETS_SWITCHED: &str = "Wallets Have Been Switched..!";
pub const MISSING_FIELDS: &str = "Please Enter Both Recipients Address & Amount to Send.";
pub const TRANSFER_SUCCEEDED: &str = "Crypto successfully transferred!";
pub const CONNECT_FIRST: &str = "Please connect your wallet first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Danger,
            message: message.into(),
        }
    }
}

/// Single-slot notification. Setting overwrites, nothing ever queues.
#[derive(Clone)]
pub struct AlertChannel {
    slot: Arc<Mutex<Alert>>,
}

impl Default for AlertChannel {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Alert::success(""))),
        }
    }
}

impl AlertChannel {
    pub fn set_alert(&self, kind: AlertKind, message: impl Into<String>) {
        let alert = Alert {
            kind,
            message: message.into(),
        };
        log::debug!("alert {:?}: {}", alert.kind, alert.message);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = alert;
    }

    pub fn success(&self, message: impl Into<String>) {
        self.set_alert(AlertKind::Success, message);
    }

    pub fn danger(&self, message: impl Into<String>) {
        self.set_alert(AlertKind::Danger, message);
    }

    /// Clears the message and keeps the kind
    pub fn dismiss(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .message
            .clear();
    }

    /// The live alert, if any message is showing
    pub fn current(&self) -> Option<Alert> {
        let alert = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if alert.message.is_empty() {
            None
        } else {
            Some(alert.clone())
        }
    }

    pub fn kind(&self) -> AlertKind {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).kind
    }
}
