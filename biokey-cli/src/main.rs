use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use biokey_core::config::Config;
use biokey_core::core_keys::{
    decode_base58, encode_base58, enroll, forget, unlock, BiometricCapture, BiometricType, DerivationParams,
    FileSessionStore, KeyDerivationEngine, MemoryCapture, SessionStore, SolanaKeypair,
};
use biokey_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use biokey_core::metrics::init_metrics;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "biokey")]
#[command(author, version, about = "Deterministic biometric wallet keys", long_about = None)]
struct Cli {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    /// TOML configuration file; BIOKEY_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Identity {
    #[arg(long)]
    device_id: String,

    #[arg(long, allow_hyphen_values = true)]
    user_id: i64,
}

#[derive(Args, Debug)]
struct Token {
    /// Biometric token from the device
    #[arg(long, env = "BIOKEY_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Message {
    /// UTF-8 message
    #[arg(long)]
    message: Option<String>,

    /// Base64 encoded binary message
    #[arg(long)]
    message_base64: Option<String>,
}

impl Message {
    fn bytes(&self) -> Result<Vec<u8>> {
        match (&self.message, &self.message_base64) {
            (Some(text), _) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => STANDARD.decode(encoded).context("Invalid --message-base64"),
            (None, None) => bail!("A message is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive one keypair
    Derive {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        token: Token,
        /// Salt override; empty means the deterministic salt
        #[arg(long)]
        salt: Option<String>,
        #[arg(long)]
        biometric_type: Option<BiometricType>,
    },

    /// Derive several keypairs labelled m/44'/501'/i'
    DeriveMany {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        token: Token,
        /// Number of keys (defaults to the configured count)
        #[arg(long)]
        count: Option<u32>,
    },

    /// Check that a token reproduces a public key
    Validate {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        token: Token,
        #[arg(long)]
        public_key: String,
    },

    /// Create a key backup
    Backup {
        #[command(flatten)]
        identity: Identity,
    },

    /// Decode a key backup
    Restore {
        #[arg(long)]
        backup: String,
    },

    /// Manage stored biometric sessions
    Session {
        /// Session directory (defaults to the configured one)
        #[arg(long, global = true)]
        session_dir: Option<String>,

        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Sign a message with a base58 secret key
    Sign {
        #[arg(long, env = "BIOKEY_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        #[command(flatten)]
        message: Message,
    },

    /// Verify a base58 signature
    Verify {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        signature: String,
        #[command(flatten)]
        message: Message,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Enroll a token and store the resulting session
    Create {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        token: Token,
        #[arg(long, default_value = "finger")]
        biometric_type: BiometricType,
    },

    /// Recreate the private key of a stored session
    Unlock {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        token: Token,
    },

    /// List stored sessions
    List,

    /// Delete a stored session
    Remove {
        #[command(flatten)]
        identity: Identity,
    },
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Invalid BIOKEY_* environment")?,
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json_format = true;
    }
    Ok(config)
}

fn init_cli_logging(config: &Config) -> Result<()> {
    let log_config = LogConfig::from_config(&config.logging).unwrap_or_else(|e| {
        eprintln!("{}, using 'info'", e);
        LogConfig::new(LogLevel::Info).json_format(config.logging.json_format)
    });
    init_logging_with_config(log_config)?;
    Ok(())
}

fn open_store(config: &Config, session_dir: Option<String>) -> Result<FileSessionStore> {
    let dir = session_dir.unwrap_or_else(|| config.store.session_dir.to_string_lossy().into_owned());
    let dir = shellexpand::tilde(&dir).into_owned();
    debug!(dir = %dir, "Opening session store");
    FileSessionStore::new(dir).context("Failed to open session store")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_cli_logging(&config)?;
    init_metrics();

    let engine = KeyDerivationEngine::new(config.derivation.clone());
    info!(iterations = engine.config().iterations, "biokey started");

    match cli.command {
        Command::Derive {
            identity,
            token,
            salt,
            biometric_type,
        } => {
            let mut params = DerivationParams::new(token.token, identity.device_id, identity.user_id);
            params.salt = salt;
            params.biometric_type = biometric_type;

            let key = engine.derive_in_background(params).await?;
            print_json(&key)?;
        }

        Command::DeriveMany {
            identity,
            token,
            count,
        } => {
            let params = DerivationParams::new(token.token, identity.device_id, identity.user_id);
            let keys = match count {
                Some(count) => engine.derive_multiple_keys(&params, count)?,
                None => engine.derive_default_keys(&params)?,
            };
            print_json(&keys)?;
        }

        Command::Validate {
            identity,
            token,
            public_key,
        } => {
            let params = DerivationParams::new(token.token, identity.device_id, identity.user_id);
            let valid = engine.validate_biometric_key(&params, &public_key);
            print_json(&json!({ "valid": valid }))?;
            if !valid {
                bail!("Biometric token does not match public key");
            }
        }

        Command::Backup { identity } => {
            let params = DerivationParams::new("", identity.device_id, identity.user_id);
            let backup = engine.create_key_backup(&params)?;
            print_json(&json!({ "backup": backup }))?;
        }

        Command::Restore { backup } => {
            let restored = engine.restore_from_backup(&backup)?;
            print_json(&restored)?;
        }

        Command::Session { session_dir, command } => {
            let store = open_store(&config, session_dir)?;
            run_session_command(&engine, &store, command)?;
        }

        Command::Sign { private_key, message } => {
            let keypair = SolanaKeypair::from_base58_secret(&private_key)?;
            let signature = keypair.sign(&message.bytes()?);
            print_json(&json!({
                "publicKey": keypair.public_key_base58(),
                "signature": encode_base58(&signature),
            }))?;
        }

        Command::Verify {
            public_key,
            signature,
            message,
        } => {
            let signature = decode_base58(&signature)?;
            let valid = SolanaKeypair::verify(&public_key, &message.bytes()?, &signature);
            print_json(&json!({ "valid": valid }))?;
            if !valid {
                bail!("Signature verification failed");
            }
        }
    }

    Ok(())
}

fn run_session_command(engine: &KeyDerivationEngine, store: &FileSessionStore, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Create {
            identity,
            token,
            biometric_type,
        } => {
            let capture = MemoryCapture::new(identity.device_id, token.token).with_biometric_type(biometric_type);
            let session = enroll(engine, &capture, identity.user_id)?;
            store.save(&session)?;
            info!(user_id = session.user_id, "Session stored");
            print_json(&session)?;
        }

        SessionCommand::Unlock { identity, token } => {
            let session = store.load(identity.user_id, &identity.device_id)?;
            let capture = MemoryCapture::new(identity.device_id.clone(), token.token);
            capture.request_access("unlock");

            match unlock(engine, &capture, &session)? {
                Some(private_key) => {
                    let session = store.touch(identity.user_id, &identity.device_id)?;
                    print_json(&json!({
                        "publicKey": session.public_key,
                        "privateKey": private_key,
                        "lastUsed": session.last_used,
                    }))?;
                }
                None => bail!("Biometric token does not match the stored session"),
            }
        }

        SessionCommand::List => {
            print_json(&store.list()?)?;
        }

        SessionCommand::Remove { identity } => {
            let capture = MemoryCapture::new(identity.device_id, "");
            forget(&capture, store, identity.user_id)?;
            print_json(&json!({ "removed": true }))?;
        }
    }

    Ok(())
}
