//! Account model as read from the account directory.
//!
//! Accounts are owned by the external directory; a reload run only ever
//! reads them. Selection helpers here mirror how the account picker lists
//! accounts: grouped by kind, portals first.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content source type of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountKind {
    StalkerPortal,
    XtremeApi,
    M3u8Local,
    M3u8Url,
    RssFeed,
}

impl AccountKind {
    /// Listing rank used when presenting accounts for selection.
    pub fn sort_rank(self) -> u32 {
        match self {
            AccountKind::StalkerPortal => 1,
            AccountKind::XtremeApi => 2,
            AccountKind::M3u8Local => 3,
            AccountKind::M3u8Url => 4,
            AccountKind::RssFeed => u32::MAX,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AccountKind::StalkerPortal => "Stalker Portal",
            AccountKind::XtremeApi => "Xtreme API",
            AccountKind::M3u8Local => "M3U8 Local",
            AccountKind::M3u8Url => "M3U8 URL",
            AccountKind::RssFeed => "RSS Feed",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A content source whose channel listing can be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Sort accounts for the selection list: by kind rank, stable within a kind.
pub fn sort_for_selection(accounts: &mut [Account]) {
    accounts.sort_by_key(|a| a.kind.sort_rank());
}

/// Filter applied when picking accounts for a run.
///
/// Empty `kinds` and empty `names` both mean "no restriction". Names match
/// case-insensitively against the display name.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub kinds: Vec<AccountKind>,
    pub names: Vec<String>,
}

impl Selection {
    pub fn matches(&self, account: &Account) -> bool {
        let kind_ok = self.kinds.is_empty() || self.kinds.contains(&account.kind);
        let name_ok = self.names.is_empty()
            || self
                .names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(&account.name));
        kind_ok && name_ok
    }

    /// Apply the filter to a directory listing, returning accounts in
    /// selection-list order.
    pub fn apply(&self, accounts: &[Account]) -> Vec<Account> {
        let mut selected: Vec<Account> = accounts
            .iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect();
        sort_for_selection(&mut selected);
        selected
    }
}
