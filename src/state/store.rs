//! State store trait definition.
//!
//! This module defines the common interface for execution state backends.

use async_trait::async_trait;

use super::types::{ActionState, RunState};
use crate::error::Result;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the per-action state; empty when none was written yet.
    async fn load_action_state(&self) -> Result<ActionState>;

    /// Saves the per-action state.
    async fn save_action_state(&self, state: &ActionState) -> Result<()>;

    /// Loads the last run summary.
    ///
    /// Returns `None` if no run was recorded yet.
    async fn load_run_state(&self) -> Result<Option<RunState>>;

    /// Saves the run summary.
    async fn save_run_state(&self, state: &RunState) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load_action_state(&self) -> Result<ActionState> {
        (**self).load_action_state().await
    }

    async fn save_action_state(&self, state: &ActionState) -> Result<()> {
        (**self).save_action_state(state).await
    }

    async fn load_run_state(&self) -> Result<Option<RunState>> {
        (**self).load_run_state().await
    }

    async fn save_run_state(&self, state: &RunState) -> Result<()> {
        (**self).save_run_state(state).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
