//! Where export rows come from.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::webex::WebexClient;

/// Read-only listing of Webex collections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Every item of the list endpoint at `path`, across all pages.
    async fn list_items(&self, path: &str) -> Result<Vec<Value>>;
}

#[async_trait]
impl ExportSource for WebexClient {
    async fn list_items(&self, path: &str) -> Result<Vec<Value>> {
        Self::list_items(self, path, &[], None).await
    }
}
