use anyhow::{Context, Result};
use bulkreload::account::{AccountKind, Selection};
use bulkreload::cache::ScriptedCache;
use bulkreload::config::{Config, DecisionMode};
use bulkreload::reload::{self, ProblematicAccount, RunQueue};
use bulkreload::ui::Console;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Get the config directory path (~/.config/bulkreload/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("bulkreload"))
}

#[derive(Parser, Debug)]
#[command(
    name = "bulkreload",
    about = "Reload cached channel listings for a set of IPTV accounts"
)]
struct Args {
    /// Scenario file describing accounts and their scripted reloads
    #[arg(long, value_name = "FILE")]
    scenario: PathBuf,

    /// Config file (defaults to ~/.config/bulkreload/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only reload accounts with this name (repeatable)
    #[arg(long = "account", value_name = "NAME")]
    accounts: Vec<String>,

    /// Only reload accounts of this kind (repeatable)
    #[arg(long = "kind", value_name = "KIND", value_parser = parse_kind)]
    kinds: Vec<AccountKind>,

    /// How to answer after a global call failure (overrides config)
    #[arg(long, value_enum)]
    answer: Option<DecisionMode>,

    /// Print the final report as JSON on stdout instead of text
    #[arg(long)]
    json: bool,

    /// Write problematic accounts and their reasons to this JSON file
    #[arg(long, value_name = "FILE")]
    problematic_out: Option<PathBuf>,

    /// Write the timestamped run log to this file
    #[arg(long, value_name = "FILE")]
    log_out: Option<PathBuf>,
}

fn parse_kind(value: &str) -> Result<AccountKind, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| {
            format!(
                "unknown account kind '{value}' (expected stalker-portal, xtreme-api, m3u8-local, m3u8-url, rss-feed)"
            )
        })
}

fn write_problematic(path: &Path, problematic: &[ProblematicAccount]) -> Result<()> {
    let json = serde_json::to_string_pretty(problematic)
        .context("Failed to serialize problematic accounts")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write problematic accounts to '{}'", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    let mode = args.answer.unwrap_or(config.decision_mode);

    let cache = ScriptedCache::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario '{}'", args.scenario.display()))?;

    let selection = Selection {
        kinds: args.kinds.clone(),
        names: args.accounts.clone(),
    };
    let selected = selection.apply(&cache.accounts());
    if selected.is_empty() {
        eprintln!("No accounts match the selection.");
        std::process::exit(1);
    }

    let queue = RunQueue::new(selected);
    let (handle, events) = reload::start(queue, Arc::new(cache), config.run_options())
        .context("Failed to start reload run")?;

    let log_text = if args.json {
        // Keep stdout clean for the JSON report
        let mut console = Console::new(std::io::stderr(), mode, config.max_log_lines, false);
        console.present(events).await.context("Failed to write run output")?;
        console.view().log_text()
    } else {
        let mut console = Console::new(
            std::io::stdout(),
            mode,
            config.max_log_lines,
            config.bell_on_complete,
        );
        console.present(events).await.context("Failed to write run output")?;
        console.view().log_text()
    };

    let report = handle.join().await?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    }

    if let Some(path) = &args.problematic_out {
        write_problematic(path, &report.problematic)?;
        if !args.json {
            println!(
                "Wrote {} problematic account(s) to {}",
                report.problematic.len(),
                path.display()
            );
        }
    }

    if let Some(path) = &args.log_out {
        std::fs::write(path, log_text)
            .with_context(|| format!("Failed to write run log to '{}'", path.display()))?;
    }

    Ok(())
}
