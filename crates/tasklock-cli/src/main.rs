//! tasklock: client CLI
//!
//! Commands:
//!   encryption setup          - generate a master key and back it up as a recovery phrase
//!   encryption status         - show key file and config state
//!   encryption show-recovery  - print the recovery phrase for the current key
//!   encryption recover        - restore the master key from a recovery phrase
//!   encryption rotate-key     - (refused) replace the master key
//!   encryption delete         - remove the master key from this machine
//!   config show               - display current configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::{Confirm, Input};
use secrecy::{ExposeSecret, SecretString};

use tasklock_core::config::{default_config_path, expand_tilde, TasklockConfig};
use tasklock_secrets::{EncryptionService, KeyStorage, SecretsError};
use tasklock_storage::FieldCrypto;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "tasklock",
    version,
    about = "tasklock task manager client",
    long_about = "tasklock: manage tasks with client-side end-to-end encryption"
)]
struct Cli {
    /// Path to tasklock config file (default: <config dir>/tasklock/config.toml)
    #[arg(long, short = 'c', env = "TASKLOCK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides config [log].level)
    #[arg(long = "log", env = "TASKLOCK_LOG", global = true)]
    log_level: Option<String>,

    /// Log output format (overrides config [log].format)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Directory holding the master key (overrides $TASKLOCK_KEY_DIR and config)
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// End-to-end encryption key management
    Encryption {
        #[command(subcommand)]
        action: EncryptionAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum EncryptionAction {
    /// Generate a new master key and turn encryption on
    ///
    /// The key is only saved after you confirm that the 24-word recovery
    /// phrase has been written down and re-type it correctly.
    Setup {
        /// Non-interactive: skip all confirmations and phrase verification
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show key file and encryption state
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the recovery phrase for the current key
    #[command(name = "show-recovery")]
    ShowRecovery {
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Restore the master key from a recovery phrase (read from the terminal)
    Recover {
        /// Replace an existing key without asking
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Replace the master key with a new one
    #[command(name = "rotate-key")]
    RotateKey,

    /// Remove the master key from this machine and turn encryption off
    Delete {
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_config(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path).await?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.log.format));
    init_logging(level, format);

    let app = App {
        service: Arc::new(build_service(&config, cli.key_dir.as_deref())),
        config,
        config_path,
    };

    match cli.command {
        Commands::Encryption { action } => match action {
            EncryptionAction::Setup { yes } => cmd_setup(app, yes),
            EncryptionAction::Status { json } => cmd_status(&app, json),
            EncryptionAction::ShowRecovery { yes } => cmd_show_recovery(&app, yes),
            EncryptionAction::Recover { yes } => cmd_recover(app, yes),
            EncryptionAction::RotateKey => cmd_rotate_key(),
            EncryptionAction::Delete { yes } => cmd_delete(app, yes),
        },
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&app),
    }
}

struct App {
    config: TasklockConfig,
    config_path: PathBuf,
    service: Arc<EncryptionService>,
}

impl App {
    /// Flip `[e2ee].enabled` and write the config file back.
    fn set_e2ee_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.config.e2ee.enabled == enabled {
            return Ok(());
        }
        self.config.e2ee.enabled = enabled;
        self.config
            .save(&self.config_path)
            .with_context(|| format!("writing config: {}", self.config_path.display()))?;
        tracing::debug!(enabled, path = %self.config_path.display(), "updated e2ee flag");
        Ok(())
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for command output (phrases, JSON status)
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

async fn load_config(path: &Path) -> Result<TasklockConfig> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || TasklockConfig::load(&owned))
        .await
        .context("config loader task panicked")?
        .with_context(|| format!("loading config: {}", path.display()))
}

fn build_service(config: &TasklockConfig, key_dir: Option<&Path>) -> EncryptionService {
    match key_dir {
        Some(dir) => EncryptionService::new(KeyStorage::with_file_name(
            expand_tilde(dir),
            &config.e2ee.key_file,
        )),
        None => EncryptionService::from_config(&config.e2ee),
    }
}

// ── `tasklock encryption setup` ───────────────────────────────────────────────

fn cmd_setup(mut app: App, yes: bool) -> Result<()> {
    let key_path = app.service.storage().key_path().to_path_buf();

    if app.service.storage().has_key() {
        eprintln!("warning: an encryption key already exists at {}", key_path.display());
        eprintln!("         tasks encrypted with it cannot be read without its recovery phrase.");
        if !yes && !confirm("Replace the existing key?")? {
            println!("Setup cancelled; existing key kept.");
            return Ok(());
        }
    }

    let (manager, phrase) = app.service.setup().context("generating master key")?;
    let phrase = SecretString::from(phrase);

    println!("Your recovery phrase:");
    println!();
    print!("{}", format_phrase(phrase.expose_secret()));
    println!();
    println!("Write these 24 words down and keep them somewhere safe.");
    println!("They are the only way to read your tasks if this key file is lost.");
    println!();

    if !yes {
        if !confirm("I have written down my recovery phrase")? {
            anyhow::bail!("setup cancelled; no key was saved");
        }
        let typed: String = Input::new()
            .with_prompt("Re-enter the recovery phrase to verify")
            .interact_text()?;
        if !manager.verify_recovery_phrase(&typed) {
            anyhow::bail!("recovery phrase did not match; no key was saved");
        }
    }

    app.service
        .save_manager(manager)
        .with_context(|| format!("saving key to {}", key_path.display()))?;
    app.set_e2ee_enabled(true)?;

    println!("Encryption enabled.");
    println!("  key file: {}", key_path.display());
    println!("  config:   {}", app.config_path.display());
    Ok(())
}

// ── `tasklock encryption status` ──────────────────────────────────────────────

fn cmd_status(app: &App, json: bool) -> Result<()> {
    let status = app.service.status();
    let fields = FieldCrypto::from_config(&app.config.e2ee, Some(Arc::clone(&app.service)));

    if json {
        let mut value = serde_json::to_value(&status).context("serializing status")?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("configEnabled".into(), app.config.e2ee.enabled.into());
            obj.insert("fieldsEncrypted".into(), fields.is_enabled().into());
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serializing status")?
        );
        return Ok(());
    }

    println!("tasklock encryption");
    println!("  config flag:      {}", on_off(app.config.e2ee.enabled));
    println!("  key file exists:  {}", yes_no(status.key_file_exists));
    match &status.key_file_path {
        Some(path) => println!("  key file:         {}", path.display()),
        None => println!(
            "  key file:         (none; expected at {})",
            app.service.storage().key_path().display()
        ),
    }
    println!("  key valid:        {}", yes_no(status.key_valid));
    if let Some(err) = &status.error {
        println!("  error:            {err}");
    }
    println!("  fields encrypted: {}", yes_no(fields.is_enabled()));

    if status.key_valid && !app.config.e2ee.enabled {
        println!();
        println!("A key is present but encryption is off in the config; new tasks are stored in plain text.");
    } else if !status.key_file_exists {
        println!();
        println!("Run `tasklock encryption setup` to turn on end-to-end encryption.");
    }
    Ok(())
}

// ── `tasklock encryption show-recovery` ───────────────────────────────────────

fn cmd_show_recovery(app: &App, yes: bool) -> Result<()> {
    if !app.service.storage().has_key() {
        anyhow::bail!(SecretsError::KeyNotFound(
            app.service.storage().key_path().to_path_buf()
        ));
    }
    if !yes
        && !confirm("Anyone who sees the recovery phrase can read your tasks. Show it?")?
    {
        return Ok(());
    }

    let phrase = SecretString::from(
        app.service
            .recovery_phrase()
            .context("deriving recovery phrase")?,
    );
    print!("{}", format_phrase(phrase.expose_secret()));
    Ok(())
}

// ── `tasklock encryption recover` ─────────────────────────────────────────────

fn cmd_recover(mut app: App, yes: bool) -> Result<()> {
    let key_path = app.service.storage().key_path().to_path_buf();

    if app.service.storage().has_key() {
        eprintln!("warning: an encryption key already exists at {}", key_path.display());
        if !yes && !confirm("Replace it with the key from your recovery phrase?")? {
            println!("Recovery cancelled; existing key kept.");
            return Ok(());
        }
    }

    let phrase = SecretString::from(
        rpassword::prompt_password("Recovery phrase (input hidden): ")
            .context("reading recovery phrase")?,
    );

    let manager = match app.service.recover(phrase.expose_secret()) {
        Ok(manager) => manager,
        Err(SecretsError::InvalidRecoveryPhrase(reason)) => {
            anyhow::bail!("that recovery phrase is not valid ({reason}); check the words and try again")
        }
        Err(e) => return Err(e.into()),
    };

    app.service
        .save_manager(manager)
        .with_context(|| format!("saving key to {}", key_path.display()))?;
    app.set_e2ee_enabled(true)?;

    println!("Master key restored to {}", key_path.display());
    Ok(())
}

// ── `tasklock encryption rotate-key` ──────────────────────────────────────────

fn cmd_rotate_key() -> Result<()> {
    anyhow::bail!(
        "key rotation is not available: tasks already encrypted under the current key \
         would have to be re-encrypted first, and that is not supported yet"
    )
}

// ── `tasklock encryption delete` ──────────────────────────────────────────────

fn cmd_delete(mut app: App, yes: bool) -> Result<()> {
    let key_path = app.service.storage().key_path().to_path_buf();

    if !app.service.storage().has_key() {
        println!("No encryption key at {}", key_path.display());
        return app.set_e2ee_enabled(false);
    }

    eprintln!("warning: tasks encrypted with this key become unreadable");
    eprintln!("         unless you still have the recovery phrase.");
    if !yes && !confirm(&format!("Delete {}?", key_path.display()))? {
        println!("Delete cancelled.");
        return Ok(());
    }

    app.service
        .delete_key()
        .with_context(|| format!("deleting {}", key_path.display()))?;
    app.set_e2ee_enabled(false)?;

    println!("Encryption key deleted; encryption disabled.");
    Ok(())
}

// ── `tasklock config show` ────────────────────────────────────────────────────

fn cmd_config_show(app: &App) -> Result<()> {
    if app.config_path.exists() {
        println!("# Configuration from: {}", app.config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            app.config_path.display()
        );
    }
    println!(
        "# Resolved key file: {}",
        app.service.storage().key_path().display()
    );
    println!();
    let rendered = toml::to_string_pretty(&app.config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(Into::into)
}

/// Numbered words, four per row.
fn format_phrase(phrase: &str) -> String {
    let mut out = String::new();
    for (i, word) in phrase.split_whitespace().enumerate() {
        out.push_str(&format!("{:>4}. {:<10}", i + 1, word));
        if (i + 1) % 4 == 0 {
            out.truncate(out.trim_end().len());
            out.push('\n');
        }
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}
