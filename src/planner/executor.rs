//! Action executor for provisioning plans.
//!
//! This module runs planned actions one at a time: resolve references,
//! capture the state before, apply the stage, capture the state after and
//! persist the outcome. Failures are recorded per action and never abort the
//! run; nothing is rolled back.

use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PlanError, Result};
use crate::inputs::{
    LOCATIONS_FILE, LocationRow, POLICY_FILE, StaticPolicy, USERS_FILE, UserRow, WORKSPACES_FILE,
    WorkspaceRow, bootstrap_v21_inputs, load_locations, load_users, load_workspaces,
    require_existing,
};
use crate::state::{
    ActionOutcome, ActionState, ActionStatus, LocalStateStore, RUN_STATE_FILE, RunCounts,
    RunMode, RunState, StateStore,
};
use crate::webex::WebexApi;

use super::plan::{PlanRow, build_plan, plan_fingerprint, plan_rows, write_plan_csv};
use super::resolver::ResolvedRefs;
use super::stages::StageContext;

/// Plan file name.
pub const PLAN_FILE: &str = "plan.csv";

/// Loaded v2.1 templates.
#[derive(Debug, Clone)]
pub struct ProvisioningInputs {
    /// Location records.
    pub locations: Vec<LocationRow>,
    /// User records.
    pub users: Vec<UserRow>,
    /// Workspace records.
    pub workspaces: Vec<WorkspaceRow>,
    /// Static policy.
    pub policy: StaticPolicy,
}

impl ProvisioningInputs {
    /// Loads the templates from `dir`, creating any that are missing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InputError::TemplatesCreated`] when a template
    /// had to be generated, or a parse error for an invalid file.
    pub fn load(dir: &Path) -> Result<Self> {
        require_existing(bootstrap_v21_inputs(dir)?)?;
        Ok(Self {
            locations: load_locations(&dir.join(LOCATIONS_FILE))?,
            users: load_users(&dir.join(USERS_FILE))?,
            workspaces: load_workspaces(&dir.join(WORKSPACES_FILE))?,
            policy: StaticPolicy::load(&dir.join(POLICY_FILE))?,
        })
    }

    /// The numbered plan for these inputs.
    #[must_use]
    pub fn plan(&self) -> Vec<PlanRow> {
        plan_rows(build_plan(
            &self.locations,
            &self.users,
            &self.workspaces,
            &self.policy,
        ))
    }
}

/// Loads the templates in `dir` and returns the numbered plan.
///
/// # Errors
///
/// Returns an error if the inputs are missing or invalid.
pub fn load_plan_rows(dir: &Path) -> Result<Vec<PlanRow>> {
    Ok(ProvisioningInputs::load(dir)?.plan())
}

/// Summary of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: String,
    /// Mode.
    pub mode: RunMode,
    /// Counters.
    pub counts: RunCounts,
    /// Written artifacts.
    pub outputs: RunOutputs,
}

/// Artifacts written by a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    /// `plan.csv`.
    pub plan_csv: PathBuf,
    /// `run_state.json`.
    pub run_state: PathBuf,
}

/// Executes v2.1 plans against the Webex API.
pub struct ActionExecutor<'a> {
    api: &'a dyn WebexApi,
    v21_dir: PathBuf,
    store: LocalStateStore,
}

impl<'a> ActionExecutor<'a> {
    /// Creates an executor working in `v21_dir`.
    #[must_use]
    pub fn new(api: &'a dyn WebexApi, v21_dir: impl Into<PathBuf>) -> Self {
        let v21_dir = v21_dir.into();
        Self {
            api,
            store: LocalStateStore::with_base_dir(&v21_dir),
            v21_dir,
        }
    }

    /// Working directory.
    #[must_use]
    pub fn v21_dir(&self) -> &Path {
        &self.v21_dir
    }

    /// Executes one action of the current plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ActionOutOfRange`] for an unknown index, or an
    /// error if the inputs or the state file cannot be read. Failures of the
    /// stage itself are reported in the outcome.
    pub async fn run_single_action(&self, action_id: usize, apply: bool) -> Result<ActionOutcome> {
        let inputs = ProvisioningInputs::load(&self.v21_dir)?;
        let rows = inputs.plan();
        let row = rows.get(action_id).ok_or(PlanError::ActionOutOfRange {
            action_id,
            len: rows.len(),
        })?;

        let mut refs = ResolvedRefs::new();
        let mut state = self.store.load_action_state().await?;
        self.execute(row, &inputs.policy, &mut refs, apply, &mut state)
            .await
    }

    /// Builds the plan and, unless `dry_run`, applies every action in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid or the artifacts cannot be
    /// written.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary> {
        let inputs = ProvisioningInputs::load(&self.v21_dir)?;
        let rows = inputs.plan();
        let mode = if dry_run { RunMode::DryRun } else { RunMode::Apply };
        info!("Starting {mode} run with {} planned actions", rows.len());

        let mut results = Vec::new();
        if !dry_run {
            let mut refs = ResolvedRefs::new();
            let mut state = self.store.load_action_state().await?;
            for row in &rows {
                let outcome = self
                    .execute(row, &inputs.policy, &mut refs, true, &mut state)
                    .await?;
                results.push(outcome);
            }
        }

        let plan_csv = self.v21_dir.join(PLAN_FILE);
        write_plan_csv(&plan_csv, &rows)?;

        let fingerprint = plan_fingerprint(&rows)?;
        let run = RunState::new(mode, fingerprint, rows, results);
        self.store.save_run_state(&run).await?;

        info!(
            "Run {} finished: {} planned, {} applied, {} failed",
            run.run_id, run.counts.planned, run.counts.applied, run.counts.failed
        );

        Ok(RunSummary {
            run_id: run.run_id,
            mode,
            counts: run.counts,
            outputs: RunOutputs {
                plan_csv,
                run_state: self.v21_dir.join(RUN_STATE_FILE),
            },
        })
    }

    async fn execute(
        &self,
        row: &PlanRow,
        policy: &StaticPolicy,
        refs: &mut ResolvedRefs,
        apply: bool,
        state: &mut ActionState,
    ) -> Result<ActionOutcome> {
        let action = &row.action;
        let ops = action.stage.ops();
        let mut payload = action.payload.clone();
        let mut ctx = StageContext {
            api: self.api,
            policy,
            refs,
        };
        debug!("Executing action {}: {action}", row.action_id);

        let mut error = None;
        let before = match ops.read_state(&mut ctx, &mut payload).await {
            Ok(value) => value,
            Err(err) => {
                error = Some(err.to_string());
                json!({"error": err.to_string()})
            }
        };
        let mut after = before.clone();

        if apply && error.is_none() {
            match ops.apply(&mut ctx, &mut payload).await {
                Ok(()) => match ops.read_state(&mut ctx, &mut payload).await {
                    Ok(value) => after = value,
                    Err(err) => error = Some(err.to_string()),
                },
                Err(err) => error = Some(err.to_string()),
            }
        }

        let status = match (&error, apply) {
            (Some(_), _) => ActionStatus::Failed,
            (None, true) => ActionStatus::Applied,
            (None, false) => ActionStatus::Previewed,
        };
        if let Some(message) = &error {
            warn!("Action {} ({}) failed: {message}", row.action_id, action.stage);
        }

        let outcome = ActionOutcome {
            action_id: row.action_id,
            action: action.clone(),
            changed: before != after,
            before,
            after,
            error,
            status,
        };
        state.record(row.action_id, outcome.state_item());
        self.store.save_action_state(state).await?;
        Ok(outcome)
    }
}
