//! Command-line interface definition.

use channel_gate::config::GateConfig;
use clap::Parser;
use std::path::PathBuf;

/// Deliver a single artifact to users who joined two Telegram channels.
#[derive(Parser, Debug)]
#[command(name = "channel-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Bot API token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Identifier of the first required channel.
    #[arg(long, env = "CHANNEL_1", allow_negative_numbers = true)]
    pub channel_1: Option<i64>,

    /// Identifier of the second required channel.
    #[arg(long, env = "CHANNEL_2", allow_negative_numbers = true)]
    pub channel_2: Option<i64>,

    /// Join link of the first channel.
    #[arg(long, env = "CHANNEL_1_URL")]
    pub channel_1_url: Option<String>,

    /// Join link of the second channel.
    #[arg(long, env = "CHANNEL_2_URL")]
    pub channel_2_url: Option<String>,

    /// Path of the artifact to deliver.
    #[arg(long, env = "APK_PATH")]
    pub apk_path: Option<PathBuf>,

    /// Chat the artifact is uploaded into once to obtain a reusable file id.
    #[arg(long, env = "STORAGE_CHAT_ID", allow_negative_numbers = true)]
    pub storage_chat_id: Option<i64>,

    /// Seconds between verification attempts of one user.
    #[arg(long, env = "COOLDOWN_SECS")]
    pub cooldown_secs: Option<u64>,

    /// Log level, overriding `log_level` from the config file.
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI arguments into a `GateConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<GateConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            GateConfig::from_file(path)?
        } else {
            GateConfig::default()
        };

        // Override with CLI arguments
        if let Some(token) = self.bot_token {
            config.bot_token = token;
        }
        if let Some(id) = self.channel_1 {
            config.groups.primary.id = id;
        }
        if let Some(id) = self.channel_2 {
            config.groups.secondary.id = id;
        }
        if let Some(url) = self.channel_1_url {
            config.groups.primary.join_url = url;
        }
        if let Some(url) = self.channel_2_url {
            config.groups.secondary.join_url = url;
        }
        if let Some(path) = self.apk_path {
            config.artifact.path = path;
        }
        if let Some(id) = self.storage_chat_id {
            config.artifact.storage_chat_id = id;
        }
        if let Some(secs) = self.cooldown_secs {
            config.verification.cooldown_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}
