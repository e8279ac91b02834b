use std::path::PathBuf;

use poise::serenity_prelude::UserId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set.")]
    Missing(&'static str),

    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("{0} points to a non-existing path")]
    NoSuchPath(&'static str),

    #[error("{key} is not valid: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Contains environment variables and other configurations.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub bot_owner_uid: UserId,
    pub yt_dlp_path: String,

    pub command_prefix: String,
    pub playlist_directory: PathBuf,
    pub default_art_file: PathBuf,
    pub startup_file: PathBuf,
    pub autofill_cache_length: usize,
}

impl Config {
    /// Read the configuration from the process environment, exiting if it
    /// is unusable.
    pub fn init() -> Self {
        match Self::from_lookup(|key| std::env::var(key).ok()) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    /// Whether `DEBUG` is switched on; read before logging is set up.
    pub fn debug_enabled() -> bool {
        parse_flag(std::env::var("DEBUG").ok().as_deref())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |key: &'static str| -> Result<String, ConfigError> {
            let value = lookup(key).ok_or(ConfigError::Missing(key))?;
            if value.is_empty() {
                return Err(ConfigError::Empty(key));
            }
            Ok(value)
        };
        let get_env_or = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            discord_token: get_env("DISCORD_TOKEN")?,
            bot_owner_uid: {
                let value = get_env("BOT_OWNER_UID")?;
                match value.parse::<u64>() {
                    Ok(id) if id != 0 => UserId::new(id),
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: "BOT_OWNER_UID",
                            value,
                        })
                    }
                }
            },
            yt_dlp_path: {
                let path = get_env("YT_DLP_PATH")?;
                if !std::path::Path::new(&path).exists() {
                    return Err(ConfigError::NoSuchPath("YT_DLP_PATH"));
                }
                path
            },

            command_prefix: get_env_or("COMMAND_PREFIX", "!;"),
            playlist_directory: get_env_or("PLAYLIST_DIRECTORY", "lib/mp3").into(),
            default_art_file: get_env_or("DEFAULT_ART_FILE", "lib/img/art_not_found.png").into(),
            startup_file: get_env_or("STARTUP_FILE", "startup.json").into(),
            autofill_cache_length: {
                let value = get_env_or("AUTOFILL_CACHE_LENGTH", "10");
                match value.parse::<usize>() {
                    Ok(length) if length > 0 => length,
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: "AUTOFILL_CACHE_LENGTH",
                            value,
                        })
                    }
                }
            },
        })
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
