use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use immerse::backend::{MemoryAuth, MemoryObjectStorage};
use immerse::{DEFAULT_CONFIG_FILE, Immerse, ImmerseConfig};

/// Base URL reported for media the terminal client stores; it never uploads blobs itself.
const LOCAL_MEDIA_BASE: &str = "file:///tmp/immerse-media";

/// Everything a command needs: the loaded configuration and a connected client.
pub struct ClientContext {
    pub config_path: PathBuf,
    pub immerse: Immerse,
}

impl ClientContext {
    /// Loads the configuration and connects to Redis, acting as `viewer` when given.
    pub async fn connect(config_path: Option<&Path>, viewer: Option<&str>) -> Result<Self> {
        let config_path = config_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        let config = ImmerseConfig::load_or_default(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let auth = match viewer {
            Some(uid) => MemoryAuth::signed_in(uid),
            None => MemoryAuth::new(),
        };
        let immerse = Immerse::connect(
            config,
            Arc::new(auth),
            Arc::new(MemoryObjectStorage::new(LOCAL_MEDIA_BASE)),
        )
        .await
        .context("Failed to connect to the document store (is REDIS_URL set?)")?;

        Ok(Self { config_path, immerse })
    }
}
