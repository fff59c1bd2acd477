//! Runtime configuration, loaded from `immerse.toml`.
//!
//! ```toml
//! [feed]
//! lookahead = 2
//! preload_cache_capacity = 4
//! block_check = "fail_closed"
//!
//! [upload]
//! max_video_bytes = 104857600
//!
//! [redis]
//! url = "${REDIS_URL}"
//! prefix = "immerse"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ImmerseError;
use crate::feed::BlockCheckPolicy;
use crate::feed::preload::BufferPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "immerse.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImmerseConfig {
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub registration: RegistrationSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Posts after the visible one that get a playback resource ahead of time.
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    #[serde(default = "default_preload_cache_capacity")]
    pub preload_cache_capacity: usize,
    #[serde(default = "default_forward_buffer_ms")]
    pub forward_buffer_ms: u64,
    /// Bits per second.
    #[serde(default = "default_peak_bitrate")]
    pub peak_bitrate: u64,
    #[serde(default)]
    pub block_check: BlockCheckPolicy,
}

impl FeedSettings {
    pub fn buffer_policy(&self) -> BufferPolicy {
        BufferPolicy {
            forward_buffer: Duration::from_millis(self.forward_buffer_ms),
            peak_bitrate: self.peak_bitrate,
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            preload_cache_capacity: default_preload_cache_capacity(),
            forward_buffer_ms: default_forward_buffer_ms(),
            peak_bitrate: default_peak_bitrate(),
            block_check: BlockCheckPolicy::default(),
        }
    }
}

fn default_lookahead() -> usize {
    2
}

fn default_preload_cache_capacity() -> usize {
    4
}

fn default_forward_buffer_ms() -> u64 {
    2_000
}

fn default_peak_bitrate() -> u64 {
    2_500_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_video_bytes: default_max_video_bytes(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_max_video_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSettings {
    /// Candidates tried (`name`, `name1`, `name2`, ...) before giving up on a username.
    #[serde(default = "default_max_username_attempts")]
    pub max_username_attempts: u32,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            max_username_attempts: default_max_username_attempts(),
            min_password_len: default_min_password_len(),
        }
    }
}

fn default_max_username_attempts() -> u32 {
    10
}

fn default_min_password_len() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_redis_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_redis_prefix() -> String {
    "immerse".to_string()
}

fn config_error(message: impl Into<String>) -> ImmerseError {
    ImmerseError::Config {
        message: message.into().into(),
    }
}

impl ImmerseConfig {
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|err| config_error(format!("failed to parse config: {err}")))
    }

    /// Loads `path`, then applies environment overrides.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| config_error(format!("failed to read {}: {err}", path.display())))?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise starts from defaults.
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// `REDIS_URL` and `IMMERSE_PREFIX` win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL")
            && !url.is_empty()
        {
            self.redis.url = url;
        }
        if let Ok(prefix) = std::env::var("IMMERSE_PREFIX")
            && !prefix.is_empty()
        {
            self.redis.prefix = prefix;
        }
    }

    /// The Redis URL with `${VAR}` placeholders expanded.
    pub fn redis_url(&self) -> crate::Result<String> {
        expand_env(&self.redis.url)
    }
}

/// Expands `${VAR}` placeholders from the process environment.
pub fn expand_env(raw: &str) -> crate::Result<String> {
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| config_error(format!("unterminated placeholder in `{raw}`")))?;
        let name = &after[..end];
        let value =
            std::env::var(name).map_err(|_| config_error(format!("environment variable {name} is not set")))?;
        expanded.push_str(&value);
        rest = &after[end + 1..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}
