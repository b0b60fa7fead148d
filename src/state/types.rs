//! Persisted execution state.
//!
//! `action_state.json` keeps the last outcome of every action index and
//! `run_state.json` the summary of the last full run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::planner::{PlanRow, PlannedAction, Stage};

/// Status of the last execution of an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Read-only pass.
    Previewed,
    /// Stage applied without error.
    Applied,
    /// Stage raised an error.
    Failed,
}

/// Whether a run mutated remote state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Plan only.
    DryRun,
    /// Every action applied.
    Apply,
}

/// One entry of `action_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionStateItem {
    /// Stage of the action.
    pub stage: Stage,
    /// Entity key of the action.
    pub entity_key: String,
    /// Outcome.
    pub status: ActionStatus,
    /// When it last ran.
    pub last_executed_at: DateTime<Utc>,
    /// Error text if it failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// Contents of `action_state.json`, keyed by action index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionState {
    /// Items by stringified action id.
    #[serde(default)]
    pub items: BTreeMap<String, ActionStateItem>,
}

impl ActionState {
    /// Records the latest outcome of `action_id`, replacing any previous one.
    pub fn record(&mut self, action_id: usize, item: ActionStateItem) {
        self.items.insert(action_id.to_string(), item);
    }

    /// Latest outcome of `action_id`.
    #[must_use]
    pub fn get(&self, action_id: usize) -> Option<&ActionStateItem> {
        self.items.get(&action_id.to_string())
    }
}

/// Result of executing one action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionOutcome {
    /// Index in the plan.
    pub action_id: usize,
    /// The action.
    pub action: PlannedAction,
    /// State before the stage.
    pub before: Value,
    /// State after the stage.
    pub after: Value,
    /// `before != after`.
    pub changed: bool,
    /// Error raised while applying, if any.
    pub error: Option<String>,
    /// Resulting status.
    pub status: ActionStatus,
}

impl ActionOutcome {
    /// Builds the `action_state.json` entry for this outcome.
    #[must_use]
    pub fn state_item(&self) -> ActionStateItem {
        ActionStateItem {
            stage: self.action.stage,
            entity_key: self.action.entity_key.clone(),
            status: self.status,
            last_executed_at: Utc::now(),
            error: self.error.clone(),
        }
    }
}

/// Outcome counters of a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunCounts {
    /// Planned actions.
    pub planned: usize,
    /// Applied without error.
    pub applied: usize,
    /// Failed actions.
    pub failed: usize,
}

/// Contents of `run_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run finished.
    pub executed_at: DateTime<Utc>,
    /// Mode.
    pub mode: RunMode,
    /// Counters.
    pub counts: RunCounts,
    /// SHA-256 of the serialized plan.
    pub plan_fingerprint: String,
    /// The plan that was run.
    pub planned_actions: Vec<PlanRow>,
    /// Per-action outcomes; empty for dry runs.
    #[serde(default)]
    pub results: Vec<ActionOutcome>,
}

impl RunState {
    /// Creates a run record stamped now, with counts derived from `results`.
    #[must_use]
    pub fn new(
        mode: RunMode,
        plan_fingerprint: String,
        planned_actions: Vec<PlanRow>,
        results: Vec<ActionOutcome>,
    ) -> Self {
        let failed = results.iter().filter(|r| r.status == ActionStatus::Failed).count();
        let applied = results.iter().filter(|r| r.status == ActionStatus::Applied).count();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            executed_at: Utc::now(),
            mode,
            counts: RunCounts {
                planned: planned_actions.len(),
                applied,
                failed,
            },
            plan_fingerprint,
            planned_actions,
            results,
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Previewed => "previewed",
            Self::Applied => "applied",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self {
            Self::DryRun => "dry_run",
            Self::Apply => "apply",
        };
        write!(f, "{mode}")
    }
}
