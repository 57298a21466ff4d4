//! Per-run outcome facts extracted from reloader messages.
use super::messages::{extract_channel_count, is_critical_failure};
use std::collections::{HashMap, HashSet};

/// Facts gathered for one account during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFacts {
    /// Count from the most recently recognized channel-count line.
    pub fetched_channels: usize,
    /// Sticky for the remainder of the run once set.
    pub critical_failure: bool,
}

/// Classifies progress lines into per-account facts.
///
/// Channel counts are last-write-wins: a later fallback fetch replaces an
/// earlier partial count rather than adding to it. Critical failures are
/// never cleared by later lines; only [`OutcomeTracker::clear`] resets them.
#[derive(Debug, Default)]
pub struct OutcomeTracker {
    fetched: HashMap<String, usize>,
    critical: HashSet<String>,
}

impl OutcomeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.fetched.clear();
        self.critical.clear();
    }

    /// Record one line for `account_id`. Blank ids are ignored.
    pub fn record_message(&mut self, account_id: &str, raw: &str, compact: &str) {
        if account_id.trim().is_empty() {
            return;
        }

        if let Some(count) = extract_channel_count(raw) {
            self.fetched.insert(account_id.to_string(), count);
        }

        if is_critical_failure(raw, compact) {
            self.mark_critical(account_id);
        }
    }

    /// Flag an account as critically failed without a matching line, e.g.
    /// when the reloader itself returned an error.
    pub fn mark_critical(&mut self, account_id: &str) {
        if account_id.trim().is_empty() {
            return;
        }
        if self.critical.insert(account_id.to_string()) {
            tracing::debug!(account = %account_id, "Critical failure recorded");
        }
    }

    pub fn fetched_channels(&self, account_id: &str) -> usize {
        self.fetched.get(account_id).copied().unwrap_or(0)
    }

    pub fn has_critical_failure(&self, account_id: &str) -> bool {
        self.critical.contains(account_id)
    }

    pub fn facts(&self, account_id: &str) -> AccountFacts {
        AccountFacts {
            fetched_channels: self.fetched_channels(account_id),
            critical_failure: self.has_critical_failure(account_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::messages::compact_message;
    use proptest::prelude::*;

    fn record(tracker: &mut OutcomeTracker, id: &str, raw: &str) {
        let compact = compact_message(raw);
        tracker.record_message(id, raw, &compact);
    }

    #[test]
    fn test_handshake_failure_overrides_positive_count() {
        let mut tracker = OutcomeTracker::new();
        let id = "acc-stalker-1";

        tracker.record_message(
            id,
            "Found Channels 120. Found 0 Orphaned channels.",
            "ITV Channels: 120",
        );
        tracker.record_message(id, "Handshake failed for: test-account", "Failed: handshake.");

        assert_eq!(tracker.fetched_channels(id), 120);
        assert!(
            tracker.has_critical_failure(id),
            "Handshake failure must override positive channel count"
        );
    }

    #[test]
    fn test_last_resort_collected_updates_count() {
        let mut tracker = OutcomeTracker::new();
        let id = "acc-stalker-2";

        tracker.record_message(
            id,
            "Last-resort fetch succeeded. Collected 42 channels.",
            "Fallback fetch succeeded: 42 channels.",
        );

        assert_eq!(tracker.fetched_channels(id), 42);
        assert!(!tracker.has_critical_failure(id));
    }

    #[test]
    fn test_last_write_wins() {
        let mut tracker = OutcomeTracker::new();
        record(&mut tracker, "a", "Found Channels 10");
        record(&mut tracker, "a", "Last-resort fetch succeeded. Collected 3 channels.");
        assert_eq!(tracker.fetched_channels("a"), 3);
    }

    #[test]
    fn test_blank_account_ignored() {
        let mut tracker = OutcomeTracker::new();
        record(&mut tracker, "", "Handshake failed.");
        record(&mut tracker, "   ", "Found Channels 4");
        tracker.mark_critical("");
        assert_eq!(tracker.facts(""), AccountFacts::default());
        assert_eq!(tracker.facts("   "), AccountFacts::default());
    }

    #[test]
    fn test_unknown_account_defaults() {
        let tracker = OutcomeTracker::new();
        assert_eq!(tracker.fetched_channels("nobody"), 0);
        assert!(!tracker.has_critical_failure("nobody"));
    }

    #[test]
    fn test_accounts_are_isolated() {
        let mut tracker = OutcomeTracker::new();
        record(&mut tracker, "a", "Handshake failed.");
        record(&mut tracker, "b", "Found Channels 8");
        assert!(tracker.has_critical_failure("a"));
        assert!(!tracker.has_critical_failure("b"));
        assert_eq!(tracker.fetched_channels("a"), 0);
        assert_eq!(tracker.fetched_channels("b"), 8);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut tracker = OutcomeTracker::new();
        record(&mut tracker, "a", "Found Channels 5");
        record(&mut tracker, "a", "Reload failed: boom");
        tracker.mark_critical("b");

        tracker.clear();

        for id in ["a", "b"] {
            assert_eq!(tracker.fetched_channels(id), 0);
            assert!(!tracker.has_critical_failure(id));
        }
    }

    proptest! {
        #[test]
        fn prop_critical_failure_is_sticky(
            before in prop::collection::vec(0usize..10_000, 0..5),
            after in prop::collection::vec(0usize..10_000, 1..5),
        ) {
            let mut tracker = OutcomeTracker::new();
            for n in &before {
                record(&mut tracker, "a", &format!("Found Channels {n}"));
            }
            record(&mut tracker, "a", "Network error while loading categories: reset");
            for n in &after {
                record(&mut tracker, "a", &format!("Found Channels {n}"));
                record(&mut tracker, "a", "Handshake successful.");
            }
            prop_assert!(tracker.has_critical_failure("a"));
        }

        #[test]
        fn prop_count_is_last_recognized_value(
            counts in prop::collection::vec((0usize..100_000, any::<bool>()), 1..10),
        ) {
            let mut tracker = OutcomeTracker::new();
            for (n, fallback) in &counts {
                let line = if *fallback {
                    format!("Last-resort fetch succeeded. Collected {n} channels.")
                } else {
                    format!("Found Channels {n}. Found 0 Orphaned channels.")
                };
                record(&mut tracker, "a", &line);
                record(&mut tracker, "a", "Clearing cache for account: a");
            }
            let expected = counts.last().map(|(n, _)| *n).unwrap_or(0);
            prop_assert_eq!(tracker.fetched_channels("a"), expected);
        }
    }
}
