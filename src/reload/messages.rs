//! Recognition of the free-text progress lines produced by cache reloaders.
//!
//! The reloader protocol is open-ended text. Only the templates below carry
//! meaning for a run; every other line is a plain log entry.
use crate::util::strip_control_chars;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of every compacted line that describes a terminal failure.
pub const FAILURE_MARKER: &str = "Failed:";

static FOUND_CHANNELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Found\s+Channels\s+(\d+)").expect("valid regex")
});

static COLLECTED_CHANNELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Collected\s+(\d+)\s+channels").expect("valid regex")
});

static FOUND_CATEGORIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Found\s+Categories\s+(\d+)").expect("valid regex")
});

static SAVED_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+Categories\s*&\s*(\d+)\s+Channels\s+saved")
        .expect("valid regex")
});

static LAST_RESORT_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Last-resort fetch failed for category\s+(\S+)")
        .expect("valid regex")
});

static GLOBAL_CALL_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Global call failed:\s*([A-Za-z0-9_.\-]+)(?:\s*\(mode=([A-Za-z0-9_]+)\))?(?:\s*:\s*(.*))?$")
        .expect("valid regex")
});

/// Failure of a whole-source listing call, such as `get_all_channels` or a
/// category listing for one content mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalCallFailure {
    pub call: String,
    pub mode: Option<String>,
    pub detail: Option<String>,
}

impl GlobalCallFailure {
    /// Parse `Global call failed: <call>[ (mode=<MODE>)][: <detail>]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = GLOBAL_CALL_FAILED.captures(raw.trim())?;
        let call = caps.get(1)?.as_str().to_string();
        let mode = caps.get(2).map(|m| m.as_str().to_string());
        let detail = caps
            .get(3)
            .map(|d| d.as_str().trim().to_string())
            .filter(|d| !d.is_empty());
        Some(Self { call, mode, detail })
    }

    /// Operator-facing description, used as the gate question's reason.
    pub fn describe(&self) -> String {
        let mut text = format!("{} call failed", self.call);
        if let Some(mode) = &self.mode {
            text.push_str(&format!(" for mode {mode}"));
        }
        if let Some(detail) = &self.detail {
            text.push_str(&format!(" ({detail})"));
        }
        text
    }

    /// Canonical issue reason. Excludes the detail so repeats collapse.
    pub fn reason(&self) -> String {
        match &self.mode {
            Some(mode) => format!("Global call {} failed for mode {}.", self.call, mode),
            None => format!("Global call {} failed.", self.call),
        }
    }
}

/// Extract a reported channel count.
///
/// "Found Channels N" takes precedence over "Collected N channels" when both
/// appear in one line.
pub fn extract_channel_count(raw: &str) -> Option<usize> {
    let caps = FOUND_CHANNELS
        .captures(raw)
        .or_else(|| COLLECTED_CHANNELS.captures(raw))?;
    caps.get(1)?.as_str().parse().ok()
}

/// True when the line reports a failure that must downgrade the account.
pub fn is_critical_failure(raw: &str, compact: &str) -> bool {
    if compact.starts_with(FAILURE_MARKER) {
        return true;
    }
    let trimmed = raw.trim();
    trimmed.starts_with("Reload failed:")
        || trimmed == "Handshake failed."
        || trimmed.starts_with("Handshake failed for")
        || trimmed.starts_with("Network error while loading categories")
        || trimmed.starts_with("Failed to parse channels")
        || trimmed.starts_with("Last-resort fetch failed for category")
        || GLOBAL_CALL_FAILED.is_match(trimmed)
}

/// Canonical reason recorded against an account when this line appears.
pub fn issue_reason(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if let Some(failure) = GlobalCallFailure::parse(trimmed) {
        return Some(failure.reason());
    }
    let reason = if trimmed.starts_with("Handshake failed") {
        "Handshake failed."
    } else if trimmed.starts_with("Reload failed:") {
        "Reload failed."
    } else if trimmed.starts_with("Network error while loading categories") {
        "Network error while loading categories."
    } else if trimmed.starts_with("Failed to parse channels") {
        "Failed to parse channels."
    } else if trimmed.starts_with("Last-resort fetch failed for category") {
        "Last-resort fetch failed."
    } else if trimmed.starts_with("Error fetching channels for category") {
        "Some categories failed to load."
    } else if trimmed.starts_with("No categories found") {
        "No categories found."
    } else if trimmed.starts_with("Error processing channel data") {
        "Channel data could not be processed."
    } else if trimmed.starts_with("Error: Could not save unmatched channels") {
        "Unmatched channels were not saved."
    } else {
        return None;
    };
    Some(reason.to_string())
}

/// Shorten a raw line for the run log.
///
/// Failure templates compact to the [`FAILURE_MARKER`] form. Lines that match
/// no template are returned trimmed and stripped of control characters.
pub fn compact_message(raw: &str) -> String {
    let clean = strip_control_chars(raw);
    let trimmed = clean.trim();

    if let Some(failure) = GlobalCallFailure::parse(trimmed) {
        return match failure.mode {
            Some(mode) => format!("{FAILURE_MARKER} {} call ({mode}).", failure.call),
            None => format!("{FAILURE_MARKER} {} call.", failure.call),
        };
    }
    if trimmed.starts_with("Handshake failed") {
        return format!("{FAILURE_MARKER} handshake.");
    }
    if trimmed.starts_with("Reload failed:") {
        return format!("{FAILURE_MARKER} reload.");
    }
    if trimmed.starts_with("Network error while loading categories") {
        return format!("{FAILURE_MARKER} network error loading categories.");
    }
    if trimmed.starts_with("Failed to parse channels") {
        return format!("{FAILURE_MARKER} channel parsing.");
    }
    if let Some(caps) = LAST_RESORT_FAILED.captures(trimmed) {
        return format!("{FAILURE_MARKER} fallback fetch (category {}).", &caps[1]);
    }
    if trimmed.starts_with("Last-resort fetch succeeded") {
        if let Some(n) = extract_channel_count(trimmed) {
            return format!("Fallback fetch succeeded: {n} channels.");
        }
    }
    if let Some(caps) = FOUND_CHANNELS.captures(trimmed) {
        return format!("Live channels: {}", &caps[1]);
    }
    if let Some(caps) = FOUND_CATEGORIES.captures(trimmed) {
        return format!("Categories: {}", &caps[1]);
    }
    if let Some(caps) = SAVED_SUMMARY.captures(trimmed) {
        return format!("Saved {} categories, {} channels.", &caps[1], &caps[2]);
    }
    if trimmed.starts_with("Performing handshake") {
        return "Handshake...".to_string();
    }
    if trimmed == "Handshake successful." {
        return "Handshake OK.".to_string();
    }
    if trimmed.starts_with("No channels found") {
        return "No channels found.".to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_found_channels_count() {
        assert_eq!(
            extract_channel_count("Found Channels 120. Found 0 Orphaned channels."),
            Some(120)
        );
        assert_eq!(extract_channel_count("found   channels 7"), Some(7));
    }

    #[test]
    fn test_collected_channels_count() {
        assert_eq!(
            extract_channel_count("Last-resort fetch succeeded. Collected 42 channels."),
            Some(42)
        );
        assert_eq!(extract_channel_count("COLLECTED 3 CHANNELS"), Some(3));
    }

    #[test]
    fn test_found_takes_precedence_within_one_line() {
        assert_eq!(
            extract_channel_count("Collected 5 channels; Found Channels 9"),
            Some(9)
        );
    }

    #[test]
    fn test_no_count_in_unrelated_lines() {
        assert_eq!(extract_channel_count("Found Categories 12"), None);
        assert_eq!(extract_channel_count("Handshake successful."), None);
        // Overflowing counts are ignored rather than wrapped
        assert_eq!(
            extract_channel_count("Found Channels 99999999999999999999999999"),
            None
        );
    }

    #[test]
    fn test_critical_templates() {
        let critical = [
            "Reload failed: socket closed",
            "Handshake failed.",
            "Handshake failed for: portal",
            "Network error while loading categories: timeout",
            "Failed to parse channels from get_all_channels: bad json",
            "Last-resort fetch failed for category 12 at page 0: eof",
            "Global call failed: get_all_channels",
        ];
        for line in critical {
            assert!(is_critical_failure(line, line), "{line}");
        }
    }

    #[test]
    fn test_failure_marker_in_compact_is_critical() {
        assert!(is_critical_failure("anything", "Failed: something"));
        assert!(!is_critical_failure("Found Channels 3", "Live channels: 3"));
        assert!(!is_critical_failure(
            "No channels found. Keeping existing cache.",
            "No channels found."
        ));
    }

    #[test]
    fn test_global_call_failure_parsing() {
        let failure =
            GlobalCallFailure::parse("Global call failed: get_categories (mode=VOD): HTTP 500")
                .unwrap();
        assert_eq!(failure.call, "get_categories");
        assert_eq!(failure.mode.as_deref(), Some("VOD"));
        assert_eq!(failure.detail.as_deref(), Some("HTTP 500"));
        assert_eq!(
            failure.describe(),
            "get_categories call failed for mode VOD (HTTP 500)"
        );
        assert_eq!(failure.reason(), "Global call get_categories failed for mode VOD.");

        let bare = GlobalCallFailure::parse("global call failed: get_all_channels").unwrap();
        assert_eq!(bare.mode, None);
        assert_eq!(bare.detail, None);
        assert_eq!(bare.reason(), "Global call get_all_channels failed.");
    }

    #[test]
    fn test_ordinary_failures_are_not_global() {
        assert!(GlobalCallFailure::parse("Handshake failed for: portal").is_none());
        assert!(GlobalCallFailure::parse("Error fetching channels for category 4: eof").is_none());
    }

    #[test]
    fn test_issue_reasons() {
        assert_eq!(
            issue_reason("Handshake failed for: X").as_deref(),
            Some("Handshake failed.")
        );
        assert_eq!(
            issue_reason("Error fetching channels for category 7: reset").as_deref(),
            Some("Some categories failed to load.")
        );
        assert_eq!(issue_reason("No channels found. Keeping existing cache."), None);
        assert_eq!(
            issue_reason("Last-resort fetch succeeded. Collected 42 channels."),
            None
        );
    }

    #[test]
    fn test_compaction() {
        assert_eq!(
            compact_message("Handshake failed for: test-account"),
            "Failed: handshake."
        );
        assert_eq!(
            compact_message("Found Channels 120. Found 0 Orphaned channels."),
            "Live channels: 120"
        );
        assert_eq!(
            compact_message("Last-resort fetch succeeded. Collected 42 channels."),
            "Fallback fetch succeeded: 42 channels."
        );
        assert_eq!(
            compact_message("Last-resort fetch failed for category 12 at page 1: eof"),
            "Failed: fallback fetch (category 12)."
        );
        assert_eq!(
            compact_message("Global call failed: get_categories (mode=ITV)"),
            "Failed: get_categories call (ITV)."
        );
        assert_eq!(
            compact_message("31 Categories & 950 Channels saved Successfully \u{2713}"),
            "Saved 31 categories, 950 channels."
        );
    }

    #[test]
    fn test_unknown_lines_pass_through() {
        assert_eq!(
            compact_message("  Clearing cache for account: Foo  "),
            "Clearing cache for account: Foo"
        );
        assert_eq!(compact_message("odd\x1b[31m line"), "odd line");
    }
}
