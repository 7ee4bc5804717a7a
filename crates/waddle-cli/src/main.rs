// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Waddle Social

//! waddle-inspect - decode recorded XMPP stanzas through the Waddle adapters.
//!
//! Each subcommand reads one stanza (or JSON document) from a file and prints
//! what the adapters make of it as JSON on stdout. Logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minidom::Element;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use waddle_core::config::{config_path, load_config_from, Config};
use waddle_xmpp::parse_element;

mod commands;
mod replay;

/// Inspect pubsub, roster and vCard stanzas offline
#[derive(Parser)]
#[command(name = "waddle-inspect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir/waddle/adapters.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override: trace | debug | info | warn | error
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a pubsub event <message/> and list the emitted events
    Notification {
        file: PathBuf,

        /// Receiving account (default: [account] jid, else the stanza's 'to')
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Run a roster push <iq type='set'/> through sender authorization
    RosterPush {
        file: PathBuf,

        /// Receiving account (default: [account] jid, else the stanza's 'to')
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Decode a roster result
    Roster { file: PathBuf },
    /// Decode a pubsub items result, including its result set
    Items { file: PathBuf },
    /// Decode a vCard result
    Vcard { file: PathBuf },
    /// Encode a JSON object as a vCard element
    VcardEncode { file: PathBuf },
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            let path = config_path();
            if path.exists() {
                load_config_from(&path)
                    .with_context(|| format!("loading config {}", path.display()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn read_stanza(path: &Path) -> Result<Element> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_element(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(config.logging.level.as_str()));
    debug!(?config, "configuration loaded");

    let output = match cli.command {
        Commands::Notification { file, account } => {
            let stanza = read_stanza(&file)?;
            let account = commands::resolve_account(
                account.as_deref().or(config.account.jid.as_deref()),
                &stanza,
            )?;
            commands::notification(&stanza, account)?
        }
        Commands::RosterPush { file, account } => {
            let stanza = read_stanza(&file)?;
            let account = commands::resolve_account(
                account.as_deref().or(config.account.jid.as_deref()),
                &stanza,
            )?;
            commands::roster_push(&stanza, account)?
        }
        Commands::Roster { file } => commands::roster(read_stanza(&file)?).await?,
        Commands::Items { file } => {
            commands::items(read_stanza(&file)?, config.rsm.numbers).await?
        }
        Commands::Vcard { file } => {
            commands::vcard(read_stanza(&file)?, config.vcard.mixed_content).await?
        }
        Commands::VcardEncode { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            println!("{}", commands::vcard_encode(&json)?);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "waddle-inspect",
            "roster-push",
            "push.xml",
            "--account",
            "juliet@example.com",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Commands::RosterPush { ref account, .. } if account.as_deref() == Some("juliet@example.com")
        ));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rsm]\nnumbers = \"lenient\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(
            config.rsm.numbers,
            waddle_core::config::RsmNumberPolicy::Lenient
        );
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/adapters.toml"))).is_err());
    }

    #[test]
    fn unreadable_stanza_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<not-closed").unwrap();

        let error = read_stanza(file.path()).unwrap_err();
        assert!(format!("{error:#}").contains("parsing"));
    }
}
