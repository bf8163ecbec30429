//! hush: client-side message encryption CLI
//!
//! Commands:
//!   encrypt --user U [TEXT]      - seal TEXT (or stdin) for user U
//!   decrypt --user U [TEXT]      - open an envelope; plaintext passes through
//!   key export --user U          - print the master key backup string
//!   key import --user U [--yes]  - overwrite the master key from a backup
//!   key status --user U          - show whether a key exists (never creates one)
//!   config show                  - display the active configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::ExposeSecret;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

use hush_core::config::HushConfig;
use hush_vault::{DecryptOutcome, OverwriteConfirmed, Vault};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hush",
    version,
    about = "Client-side encryption for chat messages and journal entries",
    long_about = "hush: seal text before it reaches a remote store, and manage the per-user master keys that open it"
)]
struct Cli {
    /// Path to hush config file
    #[arg(long, short = 'c', env = "HUSH_CONFIG", default_value = "~/.config/hush/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "HUSH_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "HUSH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal text for a user and print the envelope
    Encrypt {
        /// User identity the key belongs to
        #[arg(long, short = 'u')]
        user: String,
        /// Text to seal; read from stdin when omitted or "-"
        text: Option<String>,
    },

    /// Open an envelope for a user and print the plaintext
    ///
    /// Text that is not an envelope is printed unchanged. Envelopes no known
    /// key can open print a placeholder.
    Decrypt {
        #[arg(long, short = 'u')]
        user: String,
        /// Envelope to open; read from stdin when omitted or "-"
        text: Option<String>,
        /// Session token for envelopes from the token-derived scheme
        #[arg(long, env = "HUSH_SESSION_TOKEN", hide_env_values = true)]
        session_token: Option<String>,
        /// Exit with an error instead of printing the placeholder
        #[arg(long)]
        strict: bool,
    },

    /// Master key backup and restore
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Print the user's master key as a backup string
    Export {
        #[arg(long, short = 'u')]
        user: String,
    },

    /// Replace the user's master key with a backup string
    Import {
        #[arg(long, short = 'u')]
        user: String,
        /// Skip the interactive overwrite confirmation
        #[arg(long)]
        yes: bool,
        /// Read the backup string from stdin instead of a hidden prompt
        #[arg(long)]
        from_stdin: bool,
    },

    /// Show whether the user has a key, without creating one
    Status {
        #[arg(long, short = 'u')]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let (config, found) = load_config(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    if !found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            config_path.display()
        );
    }

    match cli.command {
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
        Commands::Encrypt { user, text } => {
            let vault = open_vault(&config)?;
            cmd_encrypt(&vault, &user, text.as_deref()).await
        }
        Commands::Decrypt {
            user,
            text,
            session_token,
            strict,
        } => {
            let vault = open_vault(&config)?;
            cmd_decrypt(&vault, &user, text.as_deref(), session_token.as_deref(), strict).await
        }
        Commands::Key {
            action: KeyAction::Export { user },
        } => cmd_key_export(&open_vault(&config)?, &user).await,
        Commands::Key {
            action:
                KeyAction::Import {
                    user,
                    yes,
                    from_stdin,
                },
        } => cmd_key_import(&open_vault(&config)?, &user, yes, from_stdin).await,
        Commands::Key {
            action: KeyAction::Status { user },
        } => cmd_key_status(&open_vault(&config)?, &user).await,
    }
}

/// Load the config file, or defaults when it is absent. Runs before logging
/// is set up, so the caller reports a missing file; `found` says which case hit.
fn load_config(path: &Path) -> Result<(HushConfig, bool)> {
    let loaded = HushConfig::load_if_present(path)
        .with_context(|| format!("loading config: {}", path.display()))?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.keystore.dir = expand_tilde(&config.keystore.dir);
    Ok((config, found))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
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

fn open_vault(config: &HushConfig) -> Result<Vault> {
    Vault::from_config(config).context("opening key store")
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

/// The positional argument, or all of stdin when it is absent or "-".
fn read_input(text: Option<&str>) -> Result<String> {
    match text {
        Some(t) if t != "-" => Ok(t.to_string()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

// ── `hush encrypt` / `hush decrypt` ──────────────────────────────────────────

async fn cmd_encrypt(vault: &Vault, user: &str, text: Option<&str>) -> Result<()> {
    let plaintext = read_input(text)?;
    let sealed = vault
        .encrypt_message(&plaintext, user)
        .await
        .context("encrypting message")?;
    println!("{sealed}");
    Ok(())
}

async fn cmd_decrypt(
    vault: &Vault,
    user: &str,
    text: Option<&str>,
    session_token: Option<&str>,
    strict: bool,
) -> Result<()> {
    let input = read_input(text)?;
    let outcome = vault
        .decrypt_message_with_token(&input, user, session_token)
        .await
        .context("decrypting message")?;

    if strict && outcome.is_undecryptable() {
        anyhow::bail!("envelope could not be decrypted with any known key for this user");
    }
    if let DecryptOutcome::PassthroughPlaintext(_) = outcome {
        tracing::info!("input is not an envelope; printed unchanged");
    }
    println!("{}", outcome.display_text());
    Ok(())
}

// ── `hush key` ───────────────────────────────────────────────────────────────

async fn cmd_key_export(vault: &Vault, user: &str) -> Result<()> {
    let exported = vault
        .export_encryption_key(user)
        .await
        .context("exporting master key")?;

    eprintln!("WARNING: {}", exported.warning);
    eprintln!("Fingerprint: {}", exported.fingerprint);
    println!("{}", exported.key.expose_secret());
    Ok(())
}

async fn cmd_key_import(vault: &Vault, user: &str, yes: bool, from_stdin: bool) -> Result<()> {
    let status = vault.key_status(user).await.context("reading current key")?;
    if let Some(fp) = &status.fingerprint {
        eprintln!("A key already exists for this user (fingerprint {fp}).");
    }

    if !yes && !confirm_overwrite()? {
        anyhow::bail!("import cancelled; existing key left unchanged");
    }

    let backup = if from_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading backup string from stdin")?;
        line
    } else {
        rpassword::prompt_password("Backup string: ").context("reading backup string")?
    };

    let report = vault
        .import_encryption_key(user, &backup, OverwriteConfirmed::acknowledge())
        .await
        .context("importing master key")?;

    println!("Imported key {}", report.fingerprint);
    match report.replaced {
        Some(old) if old == report.fingerprint => println!("(same key as before)"),
        Some(old) => println!("Replaced key {old}"),
        None => {}
    }
    Ok(())
}

fn confirm_overwrite() -> Result<bool> {
    eprintln!(
        "Importing overwrites this device's key for the user. Anything sealed only\n\
         under the current key becomes unreadable unless you have its backup."
    );
    eprint!("Type 'overwrite' to continue: ");
    std::io::stderr().flush().ok();

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(answer.trim() == "overwrite")
}

async fn cmd_key_status(vault: &Vault, user: &str) -> Result<()> {
    let status = vault.key_status(user).await.context("reading key status")?;

    println!("backend:     {}", status.backend);
    println!("user tag:    {}", hush_crypto::user_tag(user));
    match (&status.fingerprint, status.corrupted) {
        (_, true) => println!("key:         CORRUPTED (will be regenerated on next use)"),
        (Some(fp), false) => println!("key:         {fp}"),
        (None, false) => println!("key:         none (created on first encrypt)"),
    }
    Ok(())
}

// ── `hush config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &HushConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    print!("{}", toml::to_string_pretty(config).context("serializing config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::parse_from([
            "hush",
            "key",
            "import",
            "--user",
            "u1",
            "--yes",
            "--from-stdin",
        ]);
        match cli.command {
            Commands::Key {
                action:
                    KeyAction::Import {
                        user,
                        yes,
                        from_stdin,
                    },
            } => {
                assert_eq!(user, "u1");
                assert!(yes && from_stdin);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = load_config(&dir.path().join("absent.toml")).unwrap();
        assert!(!found);
        assert_eq!(config.log.level, "info");

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[keystore]\nbackend = \"memory\"\n").unwrap();
        let (config, found) = load_config(&path).unwrap();
        assert!(found);
        assert_eq!(config.keystore.backend, hush_core::config::KeyStoreBackend::Memory);
    }

    #[test]
    fn test_expand_tilde() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_tilde(Path::new("~/.config/hush/config.toml")),
            PathBuf::from("/home/tester/.config/hush/config.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/hush.toml")), PathBuf::from("/etc/hush.toml"));
    }
}
