//! keyward: local custody for AI provider API keys
//!
//! Commands:
//!   keys add|list|delete|verify   - manage encrypted keys
//!   models <id> [--refresh]       - list a provider's models (cached 24h)
//!   settings show|allow|disallow|rate-limit
//!   allowlist check <url>         - test a URL against the fetch allowlist
//!   log                           - show the audit log
//!   config show                   - display current configuration
//!
//! Every command that needs a key asks for its passphrase; nothing is cached
//! between invocations.

mod prompt;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

use keyward_core::config::{expand_tilde, KeywardConfig};
use keyward_core::{KeyId, KeywardError, Provider, RateLimit};
use keyward_providers::http::build_client;
use keyward_providers::{DocsPageScraper, ProviderRegistry};
use keyward_session::{CredentialSession, ModelSource, PassphrasePrompter};
use keyward_store::{KeyStore, SettingsDebouncer, StoreBackend};

use crate::prompt::{read_hidden, TerminalPrompter};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "keyward", version, about = "Encrypted API key custody for AI providers")]
struct Cli {
    /// Path to keyward.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "KEYWARD_CONFIG",
        default_value = "~/.config/keyward/keyward.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "KEYWARD_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "KEYWARD_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypted key management
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// List models for a stored key's provider
    Models {
        /// Stored key id
        id: KeyId,
        /// Ignore the cache and fetch live
        #[arg(long)]
        refresh: bool,
    },

    /// Application settings (allowlist, rate limits)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Outbound fetch allowlist
    Allowlist {
        #[command(subcommand)]
        action: AllowlistAction,
    },

    /// Show the provider operation audit log
    Log,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Encrypt and store a new key
    Add {
        /// Provider (venice, gemini, openai, perplexity, xai)
        #[arg(long, short = 'p')]
        provider: Provider,
        /// Display label
        #[arg(long, short = 'l')]
        label: String,
        /// Read the key from the first line of stdin instead of the terminal
        #[arg(long)]
        stdin: bool,
    },
    /// List stored keys (never shows key material)
    List,
    /// Delete a stored key
    Delete { id: KeyId },
    /// Check that the provider accepts a stored key
    Verify { id: KeyId },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Add a domain to the allowlist
    Allow { domain: String },
    /// Remove a domain from the allowlist
    Disallow { domain: String },
    /// Set a provider's rate-limit hint
    RateLimit {
        provider: Provider,
        #[arg(long)]
        rpm: u32,
        #[arg(long)]
        burst: u32,
    },
}

#[derive(Subcommand, Debug)]
enum AllowlistAction {
    /// Exit non-zero if the URL's host is not allowlisted
    Check { url: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Display current configuration
    Show,
}

// ── Entry point ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = KeywardConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = match &cli.log_format {
        Some(f) => f.clone(),
        None if config.logging.format.eq_ignore_ascii_case("json") => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(&level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "keyward starting"
    );

    match run(cli.command, &config, &config_path).await {
        Err(e) if is_cancelled(&e) => {
            eprintln!("cancelled: passphrase required");
            Ok(())
        }
        other => other,
    }
}

async fn run(command: Commands, config: &KeywardConfig, config_path: &Path) -> Result<()> {
    match command {
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(config, config_path),
        Commands::Keys { action } => match action {
            KeysAction::Add {
                provider,
                label,
                stdin,
            } => cmd_keys_add(config, provider, &label, stdin).await,
            KeysAction::List => cmd_keys_list(config),
            KeysAction::Delete { id } => cmd_keys_delete(config, id).await,
            KeysAction::Verify { id } => cmd_keys_verify(config, id).await,
        },
        Commands::Models { id, refresh } => cmd_models(config, id, refresh).await,
        Commands::Settings { action } => cmd_settings(config, action).await,
        Commands::Allowlist {
            action: AllowlistAction::Check { url },
        } => cmd_allowlist_check(config, &url),
        Commands::Log => cmd_log(config),
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<KeywardError>()
        .map(KeywardError::is_user_cancelled)
        .unwrap_or(false)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output stays pipeable
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────────────────

fn open_store(config: &KeywardConfig) -> Result<Arc<StoreBackend>> {
    let path = expand_tilde(&config.store.path);
    let store = StoreBackend::open(&path)
        .with_context(|| format!("opening store {}", path.display()))?;
    tracing::debug!(backend = store.kind(), path = %path.display(), "store opened");
    Ok(Arc::new(store))
}

fn open_session(
    config: &KeywardConfig,
    prompter: Arc<dyn PassphrasePrompter>,
) -> Result<CredentialSession> {
    let store = open_store(config)?;
    let settings = store
        .get_settings()
        .context("reading settings")?
        .unwrap_or_default();

    let scraper = DocsPageScraper::new(
        build_client(&config.http).context("building HTTP client")?,
        settings,
    );
    let registry = ProviderRegistry::from_config(&config.providers, &config.http, Arc::new(scraper))
        .context("building provider registry")?;

    Ok(CredentialSession::new(store, registry, prompter).with_models_ttl(config.cache.models_ttl()))
}

// ── Commands ───────────────────────────────────────────────────────────────────

fn cmd_config_show(config: &KeywardConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

async fn cmd_keys_add(
    config: &KeywardConfig,
    provider: Provider,
    label: &str,
    from_stdin: bool,
) -> Result<()> {
    let secret = if from_stdin {
        read_stdin_line()?
    } else {
        read_hidden(&format!("{provider} API key: "))
    };
    let Some(secret) = secret else {
        anyhow::bail!("no key entered");
    };

    let session = open_session(config, Arc::new(TerminalPrompter::confirming()))?;
    let id = session.add_key(provider, label, secret).await?;
    println!("added key {id} ({provider}, '{label}')");
    Ok(())
}

fn read_stdin_line() -> Result<Option<SecretString>> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading key from stdin")?;
    let trimmed = line.trim();
    Ok((!trimmed.is_empty()).then(|| SecretString::from(trimmed.to_string())))
}

fn cmd_keys_list(config: &KeywardConfig) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    let keys = session.keys()?;
    if keys.is_empty() {
        println!("no keys stored");
        return Ok(());
    }
    println!("{:>4}  {:<18}  {:<24}  created", "id", "provider", "label");
    for key in keys {
        println!(
            "{:>4}  {:<18}  {:<24}  {}",
            key.id,
            key.provider.display_name(),
            key.label,
            key.created_at
        );
    }
    Ok(())
}

async fn cmd_keys_delete(config: &KeywardConfig, id: KeyId) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    if session.delete_key(id).await? {
        println!("deleted key {id}");
    } else {
        println!("no key with id {id}");
    }
    Ok(())
}

async fn cmd_keys_verify(config: &KeywardConfig, id: KeyId) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    let verification = session.verify_key(id).await?;
    if verification.ok {
        println!("key {id}: accepted (HTTP {})", verification.status);
    } else {
        println!("key {id}: rejected (HTTP {})", verification.status);
    }
    Ok(())
}

async fn cmd_models(config: &KeywardConfig, id: KeyId, refresh: bool) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    let listing = if refresh {
        session.refresh_models(id).await?
    } else {
        session.list_models(id).await?
    };

    let source = match listing.source {
        ModelSource::Cache => "cached",
        ModelSource::Live => "live",
    };
    println!(
        "# {} models ({source}, fetched at {})",
        listing.models.provider, listing.models.fetched_at
    );
    for model in &listing.models.list {
        println!("{model}");
    }
    Ok(())
}

async fn cmd_settings(config: &KeywardConfig, action: SettingsAction) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    let mut settings = session.load_settings().await?;

    match action {
        SettingsAction::Show => {
            let rendered = toml::to_string_pretty(&settings).context("serializing settings")?;
            print!("{rendered}");
            return Ok(());
        }
        SettingsAction::Allow { domain } => {
            if !settings.allow(&domain) {
                println!("{domain} already allowed");
                return Ok(());
            }
        }
        SettingsAction::Disallow { domain } => {
            if !settings.disallow(&domain) {
                println!("{domain} was not on the allowlist");
                return Ok(());
            }
        }
        SettingsAction::RateLimit {
            provider,
            rpm,
            burst,
        } => {
            settings
                .rate_limits
                .insert(provider.display_name().to_string(), RateLimit { rpm, burst });
        }
    }

    let writer = SettingsDebouncer::spawn(session.store(), config.store.settings_debounce());
    writer.submit(settings);
    writer.shutdown().await.context("saving settings")?;
    println!("settings saved");
    Ok(())
}

fn cmd_allowlist_check(config: &KeywardConfig, url: &str) -> Result<()> {
    let store = open_store(config)?;
    let settings = store
        .get_settings()
        .context("reading settings")?
        .unwrap_or_default();
    if settings.allows(url) {
        println!("allowed: {url}");
        Ok(())
    } else {
        anyhow::bail!("blocked: {url}")
    }
}

fn cmd_log(config: &KeywardConfig) -> Result<()> {
    let session = open_session(config, Arc::new(TerminalPrompter::default()))?;
    for entry in session.audit_log()? {
        let tokens = entry.tokens.map(|t| t.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:>5}  {}  {:<18}  {:<12}  {:>3}  {tokens}",
            entry.id,
            entry.at,
            entry.provider.display_name(),
            entry.op,
            entry.status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_keys_add() {
        let cli = Cli::try_parse_from([
            "keyward", "keys", "add", "--provider", "xai", "--label", "work",
        ])
        .unwrap();
        match cli.command {
            Commands::Keys {
                action:
                    KeysAction::Add {
                        provider,
                        label,
                        stdin,
                    },
            } => {
                assert_eq!(provider, Provider::Xai);
                assert_eq!(label, "work");
                assert!(!stdin);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_provider_display_name() {
        let cli = Cli::try_parse_from([
            "keyward",
            "settings",
            "rate-limit",
            "Venice.ai",
            "--rpm",
            "60",
            "--burst",
            "5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Settings {
                action: SettingsAction::RateLimit {
                    provider: Provider::VeniceAi,
                    rpm: 60,
                    burst: 5
                }
            }
        ));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from([
            "keyward", "keys", "add", "--provider", "anthropic", "--label", "x"
        ])
        .is_err());
    }

    #[test]
    fn cancel_detection_sees_through_context() {
        let err = anyhow::Error::new(KeywardError::PassphraseRequired).context("verifying key");
        assert!(is_cancelled(&err));
        let err = anyhow::Error::new(KeywardError::DecryptionFailed);
        assert!(!is_cancelled(&err));
    }
}
