use super::alert::INSTALL_WALLET;
use super::amount::to_decimal;
use super::context::SessionContext;
use super::error::LedgerError;
use super::provider::{Account, LedgerContract, LedgerEntry};
use chrono::{DateTime, Local, TimeZone};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};

/// en-US `toLocaleString` shape, e.g. `3/7/2024, 4:05:09 PM`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// A ledger entry projected for display. Recomputed on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTransaction {
    pub address_from: Account,
    pub address_to: Account,
    pub timestamp: String,
    pub message: String,
    /// Amount in the display denomination
    pub amount: f64,
}

pub fn format_timestamp<Tz>(epoch_seconds: u64, tz: &Tz, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    i64::try_from(epoch_seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(tz).format(format).to_string())
        .unwrap_or_else(|| epoch_seconds.to_string())
}

/// Keeps the entries touching `account`, in ledger order, in display form
pub fn project_for<Tz>(
    entries: &[LedgerEntry],
    account: &Account,
    tz: &Tz,
    format: &str,
) -> Vec<DisplayTransaction>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    entries
        .iter()
        .filter(|entry| entry.touches(account))
        .map(|entry| DisplayTransaction {
            address_from: entry.address_from.clone(),
            address_to: entry.address_to.clone(),
            timestamp: format_timestamp(entry.timestamp, tz, format),
            message: entry.message.clone(),
            amount: to_decimal(entry.amount),
        })
        .collect()
}

/// `0x1234...abcdef` for long strings, untouched otherwise
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 30 {
        return address.to_owned();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Rebuilds the user-scoped history from the full remote ledger
#[derive(Clone)]
pub struct LedgerReader {
    contract: Option<Arc<dyn LedgerContract>>,
    context: SessionContext,
    timestamp_format: Arc<str>,
}

impl LedgerReader {
    pub fn new(contract: Option<Arc<dyn LedgerContract>>, context: SessionContext) -> Self {
        Self {
            contract,
            context,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.into(),
        }
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Fetches every entry, keeps the ones touching the active account and
    /// publishes them to the session.
    ///
    /// Without an active account nothing can match, so the sequence is
    /// cleared without asking the contract. The result is only published if
    /// the active account is still the one it was filtered for.
    pub async fn fetch_all(&self) -> Result<Vec<DisplayTransaction>, LedgerError> {
        let contract = match &self.contract {
            Some(contract) => contract,
            None => {
                self.context.alerts().danger(INSTALL_WALLET);
                return Err(LedgerError::ProviderUnavailable);
            }
        };

        let account = match self.context.active_account() {
            Some(account) => account,
            None => {
                self.context.set_transactions(Vec::new());
                return Ok(Vec::new());
            }
        };

        let entries = contract.get_all_transactions().await.map_err(|e| {
            error!("Failed to fetch ledger entries: {:#}", e);
            LedgerError::Remote(e)
        })?;

        let transactions =
            project_for(&entries, &account, &Local, &self.timestamp_format);
        debug!(
            "{} of {} ledger entries touch {}",
            transactions.len(),
            entries.len(),
            account
        );

        if self.context.active_account().as_ref() == Some(&account) {
            self.context.set_transactions(transactions.clone());
        } else {
            debug!("Active account switched during fetch, result for {} discarded", account);
        }
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Alert;
    use crate::provider::{memory::MemoryChain, PendingWrite};
    use async_trait::async_trait;
    use chrono::Utc;
    use ethers::types::U256;

    /// Switches the active account while the read is in flight
    struct SwitchingLedger {
        context: SessionContext,
        switch_to: Account,
        entries: Vec<LedgerEntry>,
    }

    #[async_trait]
    impl LedgerContract for SwitchingLedger {
        async fn get_all_transactions(&self) -> anyhow::Result<Vec<LedgerEntry>> {
            self.context.set_active_account(self.switch_to.clone());
            Ok(self.entries.clone())
        }

        async fn add_to_blockchain(
            &self,
            _: &Account,
            _: &Account,
            _: U256,
            _: &str,
        ) -> anyhow::Result<Box<dyn PendingWrite>> {
            anyhow::bail!("read-only ledger")
        }

        async fn get_transaction_count(&self) -> anyhow::Result<U256> {
            Ok(U256::from(self.entries.len()))
        }
    }

    fn entry(from: &str, to: &str, timestamp: u64, amount: U256) -> LedgerEntry {
        LedgerEntry {
            address_from: from.into(),
            address_to: to.into(),
            timestamp,
            message: format!("{} -> {}", from, to),
            amount,
        }
    }

    #[test]
    fn keeps_only_entries_touching_account() {
        let entries = vec![
            entry("0xAAA", "0xBBB", 1, U256::exp10(16)),
            entry("0xCCC", "0xDDD", 2, U256::exp10(16)),
        ];
        let shown = project_for(&entries, &"0xaaa".into(), &Utc, DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].address_from, Account::new("0xAAA"));
        assert_eq!(shown[0].amount, 0.01);
    }

    #[test]
    fn preserves_ledger_order() {
        let entries = vec![
            entry("0xAAA", "0xBBB", 30, U256::from(3u64)),
            entry("0xCCC", "0xDDD", 20, U256::from(2u64)),
            entry("0xBBB", "0xaaa", 10, U256::from(1u64)),
        ];
        let shown = project_for(&entries, &"0xAAA".into(), &Utc, "%s");
        let stamps: Vec<&str> = shown.iter().map(|t| t.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["30", "10"]);
    }

    #[test]
    fn formats_like_en_us_locale() {
        assert_eq!(
            format_timestamp(1_700_000_000, &Utc, DEFAULT_TIMESTAMP_FORMAT),
            "11/14/2023, 10:13:20 PM"
        );
        assert_eq!(
            format_timestamp(u64::MAX, &Utc, DEFAULT_TIMESTAMP_FORMAT),
            u64::MAX.to_string()
        );
    }

    #[test]
    fn shortens_long_addresses_only() {
        assert_eq!(
            shorten_address("0x8ba1f109551bd432803012645ac136ddd64dba72"),
            "0x8ba1...4dba72"
        );
        assert_eq!(shorten_address("0xAAA"), "0xAAA");
    }

    #[tokio::test]
    async fn missing_provider_alerts_and_keeps_sequence() {
        let context = SessionContext::new();
        let reader = LedgerReader::new(None, context.clone());
        assert!(matches!(
            reader.fetch_all().await,
            Err(LedgerError::ProviderUnavailable)
        ));
        assert_eq!(context.alerts().current(), Some(Alert::danger(INSTALL_WALLET)));
    }

    #[tokio::test]
    async fn no_account_means_no_contract_call() {
        let chain = MemoryChain::new(vec!["0xAAA".into()]);
        let context = SessionContext::new();
        let reader = LedgerReader::new(Some(Arc::new(chain.clone())), context);
        assert!(reader.fetch_all().await.unwrap().is_empty());
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn read_failure_leaves_previous_sequence() {
        let chain = MemoryChain::new(vec!["0xAAA".into()]);
        chain.push_entry(entry("0xAAA", "0xBBB", 1, U256::one()));
        let context = SessionContext::new();
        context.set_active_account("0xAAA".into());
        let reader = LedgerReader::new(Some(Arc::new(chain.clone())), context.clone());

        assert_eq!(reader.fetch_all().await.unwrap().len(), 1);
        chain.fail_next(crate::provider::memory::FailPoint::Read);
        assert!(matches!(reader.fetch_all().await, Err(LedgerError::Remote(_))));
        assert_eq!(context.transactions().len(), 1);
        assert_eq!(context.alerts().current(), None);
    }

    #[tokio::test]
    async fn result_for_switched_away_account_is_discarded() {
        let context = SessionContext::new();
        context.set_active_account("0xAAA".into());
        let contract = SwitchingLedger {
            context: context.clone(),
            switch_to: "0xCCC".into(),
            entries: vec![
                entry("0xAAA", "0xBBB", 1, U256::one()),
                entry("0xCCC", "0xDDD", 2, U256::one()),
            ],
        };
        let reader = LedgerReader::new(Some(Arc::new(contract)), context.clone());

        let returned = reader.fetch_all().await.unwrap();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].address_from, Account::new("0xAAA"));
        assert_eq!(context.active_account(), Some(Account::new("0xCCC")));
        assert!(context.transactions().is_empty());
    }
}
