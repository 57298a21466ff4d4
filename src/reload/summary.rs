//! Three-level verdict for a single account's reload.
use serde::Serialize;
use std::fmt;

/// Reason given to an account that loaded nothing and reported nothing.
pub const NO_CHANNELS_REASON: &str = "No channels loaded.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SummaryLevel {
    Good,
    Yellow,
    Bad,
}

impl fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SummaryLevel::Good => "GOOD",
            SummaryLevel::Yellow => "YELLOW",
            SummaryLevel::Bad => "BAD",
        })
    }
}

/// Insertion-ordered set of reason strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReasonSet(Vec<String>);

impl ReasonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reason unless already present. Returns true if it was new.
    pub fn insert(&mut self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if self.0.contains(&reason) {
            return false;
        }
        self.0.push(reason);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for ReasonSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ReasonSet::new();
        for reason in iter {
            set.insert(reason);
        }
        set
    }
}

/// Derived verdict for one account in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStatus {
    pub level: SummaryLevel,
    pub channels_loaded: usize,
    pub reasons: ReasonSet,
}

/// Classify a reload.
///
/// - channels, no issues, not failed: GOOD
/// - channels otherwise: YELLOW
/// - no channels: BAD, always with at least one reason
pub fn classify(channels: usize, failed: bool, issues: &ReasonSet) -> SummaryStatus {
    let level = if channels == 0 {
        SummaryLevel::Bad
    } else if issues.is_empty() && !failed {
        SummaryLevel::Good
    } else {
        SummaryLevel::Yellow
    };

    let mut reasons = issues.clone();
    if level == SummaryLevel::Bad && reasons.is_empty() {
        reasons.insert(NO_CHANNELS_REASON);
    }

    SummaryStatus {
        level,
        channels_loaded: channels,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_good_when_clean() {
        let status = classify(42, false, &ReasonSet::new());
        assert_eq!(status.level, SummaryLevel::Good);
        assert_eq!(status.channels_loaded, 42);
        assert!(status.reasons.is_empty());
    }

    #[test]
    fn test_yellow_with_issue_or_failure() {
        let issues: ReasonSet = ["Handshake failed."].into_iter().collect();
        assert_eq!(classify(120, false, &issues).level, SummaryLevel::Yellow);
        assert_eq!(classify(120, true, &ReasonSet::new()).level, SummaryLevel::Yellow);
    }

    #[test]
    fn test_bad_synthesizes_default_reason() {
        let status = classify(0, false, &ReasonSet::new());
        assert_eq!(status.level, SummaryLevel::Bad);
        assert_eq!(status.reasons.as_slice(), &[NO_CHANNELS_REASON.to_string()]);
    }

    #[test]
    fn test_bad_keeps_existing_reasons() {
        let issues: ReasonSet = ["Handshake failed."].into_iter().collect();
        let status = classify(0, true, &issues);
        assert_eq!(status.reasons.as_slice(), &["Handshake failed.".to_string()]);
    }

    #[test]
    fn test_reason_set_dedupes_in_order() {
        let mut set = ReasonSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(set.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_classifier_totality(
            channels in 0usize..1_000,
            failed in any::<bool>(),
            issues in prop::collection::vec("[a-z]{1,6}", 0..4),
        ) {
            let issues: ReasonSet = issues.into_iter().collect();
            let status = classify(channels, failed, &issues);
            let good = channels > 0 && issues.is_empty() && !failed;
            prop_assert_eq!(status.level == SummaryLevel::Good, good);
            prop_assert_eq!(status.level == SummaryLevel::Bad, channels == 0);
            if !good && channels > 0 {
                prop_assert_eq!(status.level, SummaryLevel::Yellow);
            }
            if status.level == SummaryLevel::Bad {
                prop_assert!(!status.reasons.is_empty());
            }
        }
    }
}
