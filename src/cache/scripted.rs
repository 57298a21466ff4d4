//! Replay cache service driven by a TOML scenario file.
//!
//! Each account in the scenario lists the progress lines its reload emits,
//! the channel count already cached, and optionally an error to raise once
//! the lines are exhausted:
//!
//! ```toml
//! [[accounts]]
//! id = "acc-1"
//! name = "Portal One"
//! kind = "stalker-portal"
//! cached_channels = 0
//! messages = ["Performing handshake for: Portal One", "Found Channels 120."]
//! error = "connection reset"
//! delay_ms = 50
//! ```
use super::{CacheError, CacheService};
use crate::account::{Account, AccountKind};
use crate::reload::MessageSink;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in scenario file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Scenario file too large: {0}")]
    TooLarge(String),

    #[error("Duplicate account id in scenario: {0}")]
    DuplicateAccount(String),
}

/// One account's scripted reload.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedAccount {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub cached_channels: usize,
    #[serde(default)]
    pub messages: Vec<String>,
    /// Raised after all messages were emitted.
    #[serde(default)]
    pub error: Option<String>,
    /// Pause before each message.
    #[serde(default)]
    pub delay_ms: u64,
}

impl ScriptedAccount {
    pub fn account(&self) -> Account {
        Account::new(self.id.clone(), self.name.clone(), self.kind)
    }
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    accounts: Vec<ScriptedAccount>,
}

#[derive(Debug, Clone)]
pub struct ScriptedCache {
    order: Vec<String>,
    accounts: HashMap<String, ScriptedAccount>,
}

impl ScriptedCache {
    const MAX_FILE_SIZE: u64 = 4 * 1_048_576;

    pub fn new(accounts: Vec<ScriptedAccount>) -> Result<Self, ScenarioError> {
        let mut order = Vec::with_capacity(accounts.len());
        let mut by_id = HashMap::with_capacity(accounts.len());
        for account in accounts {
            if by_id.contains_key(&account.id) {
                return Err(ScenarioError::DuplicateAccount(account.id));
            }
            order.push(account.id.clone());
            by_id.insert(account.id.clone(), account);
        }
        Ok(Self {
            order,
            accounts: by_id,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(content)?;
        Self::new(scenario.accounts)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ScenarioError::TooLarge(format!(
                "Scenario file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let cache = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            accounts = cache.order.len(),
            "Loaded reload scenario"
        );
        Ok(cache)
    }

    /// Accounts in scenario order, as the account directory would list them.
    pub fn accounts(&self) -> Vec<Account> {
        self.order
            .iter()
            .filter_map(|id| self.accounts.get(id))
            .map(ScriptedAccount::account)
            .collect()
    }

    async fn replay(&self, account: &Account, sink: &mut MessageSink) -> Result<(), CacheError> {
        let Some(script) = self.accounts.get(&account.id) else {
            sink.emit(format!("Reload failed: unknown account {}", account.name))
                .await?;
            return Err(CacheError::Other(format!(
                "No scripted reload for account {}",
                account.id
            )));
        };

        for line in &script.messages {
            if script.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
            }
            sink.emit(line.as_str()).await?;
        }

        match &script.error {
            Some(error) => Err(CacheError::Other(error.clone())),
            None => Ok(()),
        }
    }
}

impl CacheService for ScriptedCache {
    fn reload_cache<'a>(
        &'a self,
        account: &'a Account,
        sink: &'a mut MessageSink,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        self.replay(account, sink).boxed()
    }

    fn cached_channel_count<'a>(
        &'a self,
        account_id: &'a str,
    ) -> BoxFuture<'a, Result<usize, CacheError>> {
        let count = self
            .accounts
            .get(account_id)
            .map(|a| a.cached_channels)
            .unwrap_or(0);
        futures::future::ready(Ok(count)).boxed()
    }
}
