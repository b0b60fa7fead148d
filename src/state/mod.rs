//! State management module for SpaceOdT.
//!
//! This module persists the outcome of provisioning actions and runs, and
//! provides the atomic JSON helpers shared with the job store.

mod local;
mod store;
mod types;

pub use local::{ACTION_STATE_FILE, LocalStateStore, RUN_STATE_FILE, load_json, save_json};
pub use store::StateStore;
pub use types::{
    ActionOutcome, ActionState, ActionStateItem, ActionStatus, RunCounts, RunMode, RunState,
};
