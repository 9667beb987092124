use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outbound transfer the user is composing.
///
/// Never reset automatically, neither after a settled nor after a failed
/// submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    pub address_to: String,
    /// Decimal string in the display denomination
    pub amount: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    AddressTo,
    Amount,
    Message,
}

impl FromStr for DraftField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addressTo" | "to" => Ok(DraftField::AddressTo),
            "amount" => Ok(DraftField::Amount),
            "message" => Ok(DraftField::Message),
            other => Err(anyhow::anyhow!("Unknown form field {}", other)),
        }
    }
}

impl FormDraft {
    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let slot = match field {
            DraftField::AddressTo => &mut self.address_to,
            DraftField::Amount => &mut self.amount,
            DraftField::Message => &mut self.message,
        };
        *slot = value.into();
    }

    /// Both required fields are filled in
    pub fn is_complete(&self) -> bool {
        !self.address_to.is_empty() && !self.amount.is_empty()
    }
}
