//! Boundary to the channel cache.
//!
//! How an account is fetched and where its channels are stored is the
//! cache service's business. A reload run only needs two things from it:
//!
//! - [`CacheService::reload_cache`] - refresh one account, streaming
//!   progress lines into the run's [`MessageSink`]
//! - [`CacheService::cached_channel_count`] - channels currently cached
//!
//! [`ScriptedCache`] replays reloads described in a TOML scenario file.

mod scripted;

use crate::account::Account;
use crate::reload::MessageSink;
use futures::future::BoxFuture;
use thiserror::Error;

pub use scripted::{ScenarioError, ScriptedAccount, ScriptedCache};

/// Errors a cache service may raise while reloading an account.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Upstream handshake was refused or never completed
    #[error("Handshake failed: {0}")]
    Handshake(String),
    /// Network-level failure talking to the source
    #[error("Network error: {0}")]
    Network(String),
    /// Source returned data that could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Local cache storage failed
    #[error("Storage error: {0}")]
    Storage(String),
    /// The operator chose to skip the account after a global call failure
    #[error("Reload skipped by operator")]
    Skipped,
    #[error("{0}")]
    Other(String),
}

/// Channel cache used by a reload run.
///
/// Implementations are shared with the run worker, so they must be
/// `Send + Sync`. Methods return boxed futures to keep the trait usable as
/// `Arc<dyn CacheService>`.
pub trait CacheService: Send + Sync {
    /// Reload the cached channel listing for `account`.
    ///
    /// Every progress line must go through `sink`. When `sink.emit` returns
    /// [`CacheError::Skipped`], implementations should stop and return it.
    fn reload_cache<'a>(
        &'a self,
        account: &'a Account,
        sink: &'a mut MessageSink,
    ) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Number of channels currently cached for the account.
    fn cached_channel_count<'a>(
        &'a self,
        account_id: &'a str,
    ) -> BoxFuture<'a, Result<usize, CacheError>>;
}
