//! Runtime configuration from environment variables.
//!
//! Malformed values fall back to their defaults with a warning.

use super::ledger::DEFAULT_TIMESTAMP_FORMAT;
use super::submitter::{SubmitSettings, DEFAULT_FINALITY_TIMEOUT, DEFAULT_GAS_LIMIT};
use ethers::types::{Address, U256};
use log::{info, warn};
use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Ethereum JSON-RPC endpoint
    Rpc,
    /// In-process chain, for demos
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub network_url: String,
    pub contract_address: Option<Address>,
    pub gas_limit: u64,
    pub confirmations: usize,
    pub finality_timeout: Duration,
    pub account_poll_interval: Duration,
    pub timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Rpc,
            network_url: "http://localhost:8545".to_string(),
            contract_address: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            confirmations: 1,
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
            account_poll_interval: Duration::from_secs(2),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Environment variables:
    /// - `LEDGER_BACKEND`: "rpc" (default) or "memory"
    /// - `NETWORK_URL`: JSON-RPC endpoint
    /// - `CONTRACT_ADDRESS`: ledger contract, required for "rpc"
    /// - `GAS_LIMIT`, `CONFIRMATIONS`, `FINALITY_TIMEOUT_SECS`, `ACCOUNT_POLL_SECS`
    /// - `TIMESTAMP_FORMAT`: chrono format string
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let backend = match lookup("LEDGER_BACKEND").map(|b| b.to_lowercase()).as_deref() {
            None | Some("rpc") | Some("") => Backend::Rpc,
            Some("memory") => Backend::Memory,
            Some(other) => {
                warn!("Unknown backend '{}', defaulting to rpc", other);
                Backend::Rpc
            }
        };

        let network_url = lookup("NETWORK_URL").unwrap_or(defaults.network_url);
        let contract_address = lookup("CONTRACT_ADDRESS").and_then(|raw| {
            raw.parse::<Address>()
                .map_err(|e| warn!("Ignoring CONTRACT_ADDRESS '{}': {}", raw, e))
                .ok()
        });

        let config = Self {
            backend,
            network_url,
            contract_address,
            gas_limit: parsed(&lookup, "GAS_LIMIT", defaults.gas_limit),
            confirmations: parsed(&lookup, "CONFIRMATIONS", defaults.confirmations),
            finality_timeout: Duration::from_secs(parsed(
                &lookup,
                "FINALITY_TIMEOUT_SECS",
                defaults.finality_timeout.as_secs(),
            )),
            account_poll_interval: Duration::from_secs(parsed(
                &lookup,
                "ACCOUNT_POLL_SECS",
                defaults.account_poll_interval.as_secs(),
            ))
            .max(Duration::from_millis(100)),
            timestamp_format: lookup("TIMESTAMP_FORMAT").unwrap_or(defaults.timestamp_format),
        };

        info!("Backend: {:?}", config.backend);
        if config.backend == Backend::Rpc {
            info!("Network URL: {}", config.network_url);
            match config.contract_address {
                Some(address) => info!("Ledger contract: {:#x}", address),
                None => warn!("CONTRACT_ADDRESS is not set"),
            }
        }
        config
    }

    pub fn submit_settings(&self) -> SubmitSettings {
        SubmitSettings {
            gas_limit: U256::from(self.gas_limit),
            finality_timeout: self.finality_timeout,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Ignoring {}='{}': {}", key, raw, e);
            default
        }),
    }
}
