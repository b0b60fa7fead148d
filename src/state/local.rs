//! Local file-based state storage.
//!
//! Every document is written to a temporary sibling first and renamed into
//! place, so readers never observe a partially written file.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, SpaceOdtError};

use super::store::StateStore;
use super::types::{ActionState, RunState};

/// Action state file name.
pub const ACTION_STATE_FILE: &str = "action_state.json";

/// Run state file name.
pub const RUN_STATE_FILE: &str = "run_state.json";

/// Writes `value` as pretty JSON, atomically.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub async fn save_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating state directory: {}", parent.display());
            fs::create_dir_all(parent).await?;
        }
    }

    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    debug!("Saved {}", path.display());
    Ok(())
}

/// Reads a JSON document, `None` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).await?;
    let value = serde_json::from_str(&content).map_err(|e| {
        SpaceOdtError::internal(format!("Failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(value))
}

/// State store rooted at the v2.1 output directory.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    base_dir: PathBuf,
}

impl LocalStateStore {
    /// Creates a store writing under `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding the state files.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn action_state_path(&self) -> PathBuf {
        self.base_dir.join(ACTION_STATE_FILE)
    }

    fn run_state_path(&self) -> PathBuf {
        self.base_dir.join(RUN_STATE_FILE)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load_action_state(&self) -> Result<ActionState> {
        Ok(load_json(&self.action_state_path()).await?.unwrap_or_default())
    }

    async fn save_action_state(&self, state: &ActionState) -> Result<()> {
        save_json(&self.action_state_path(), state).await
    }

    async fn load_run_state(&self) -> Result<Option<RunState>> {
        load_json(&self.run_state_path()).await
    }

    async fn save_run_state(&self, state: &RunState) -> Result<()> {
        save_json(&self.run_state_path(), state).await
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
