use clap::Subcommand;
use moodmeter_core::{Authorizer, Config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole configuration as TOML
    Show,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "usage.poll_interval_secs", "counter.ramp_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Write a fresh configuration, optionally with a shared secret
    Init {
        /// Shared secret; only its SHA-256 digest is stored
        #[arg(long)]
        secret: Option<String>,
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::Init { secret, force } => {
            let path = Config::path()?;
            if path.exists() && !force {
                let existing = Config::load()?;
                if existing.auth.secret_sha256.is_some() && secret.is_some() {
                    return Err("a secret is already configured (use --force to replace it)".into());
                }
            }
            let mut config = if force { Config::default() } else { Config::load()? };
            if let Some(secret) = secret {
                if secret.is_empty() {
                    return Err("secret must not be empty".into());
                }
                config.auth.secret_sha256 = Some(Authorizer::hex_digest_of(&secret));
            }
            config.save()?;
            println!("config written to {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
