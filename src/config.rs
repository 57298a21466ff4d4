//! Configuration file parser for ~/.config/bulkreload/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted and logged.
use crate::reload::RunOptions;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// How the console answers the operator question after a global call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionMode {
    /// Ask on the terminal.
    Prompt,
    /// Always keep going with the account.
    CarryOn,
    /// Always mark the account bad and move on.
    Skip,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds to wait for an operator decision. 0 = wait indefinitely.
    pub decision_timeout_secs: u64,

    /// Capacity of the worker -> view event channel.
    pub event_buffer: usize,

    /// Log lines kept by the run view.
    pub max_log_lines: usize,

    /// Ring the terminal bell when a run completes.
    pub bell_on_complete: bool,

    pub decision_mode: DecisionMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decision_timeout_secs: 0,
            event_buffer: 64,
            max_log_lines: 10_000,
            bell_on_complete: true,
            decision_mode: DecisionMode::Prompt,
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "decision_timeout_secs",
        "event_buffer",
        "max_log_lines",
        "bell_on_complete",
        "decision_mode",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            decision_mode = ?config.decision_mode,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        (self.decision_timeout_secs > 0).then(|| Duration::from_secs(self.decision_timeout_secs))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            decision_timeout: self.decision_timeout(),
            event_buffer: self.event_buffer.max(1),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("bulkreload_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.decision_timeout_secs, 0);
        assert_eq!(config.decision_timeout(), None);
        assert_eq!(config.event_buffer, 64);
        assert_eq!(config.max_log_lines, 10_000);
        assert!(config.bell_on_complete);
        assert_eq!(config.decision_mode, DecisionMode::Prompt);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/bulkreload_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.decision_mode, DecisionMode::Prompt);
    }

    #[test]
    fn test_whitespace_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.event_buffer, 64);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let (dir, path) = write_config(
            "full",
            r#"
decision_timeout_secs = 45
event_buffer = 8
max_log_lines = 200
bell_on_complete = false
decision_mode = "carry-on"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.decision_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.max_log_lines, 200);
        assert!(!config.bell_on_complete);
        assert_eq!(config.decision_mode, DecisionMode::CarryOn);

        let options = config.run_options();
        assert_eq!(options.event_buffer, 8);
        assert_eq!(options.decision_timeout, Some(Duration::from_secs(45)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_and_unknown_keys() {
        let (dir, path) = write_config("partial", "decision_mode = \"skip\"\nmystery = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.decision_mode, DecisionMode::Skip);
        assert_eq!(config.event_buffer, 64);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "decision_mode = 42\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_event_buffer_is_clamped() {
        let config = Config {
            event_buffer: 0,
            ..Config::default()
        };
        assert_eq!(config.run_options().event_buffer, 1);
    }
}
