//! v2 softphone runner.
//!
//! Stages run in fixed order. For each stage the decision provider is asked
//! once; the answer then applies to every record that needs the stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::inputs::{
    POLICY_FILE, Payload, SOFTPHONES_FILE, SoftphoneRow, StaticPolicy, bootstrap_v2_inputs,
    load_softphones, require_existing,
};
use crate::planner::{ResolvedRefs, SoftphoneStage, StageDecision};
use crate::state::{RUN_STATE_FILE, RunMode, save_json};
use crate::webex::WebexApi;

use super::decisions::{DecisionProvider, load_overrides, merge_overrides, overrides_path};
use super::stages::{apply_stage, build_stages};

/// Outcome of one stage for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Applied without error.
    Applied,
    /// Would be applied; dry run.
    Planned,
    /// Operator answered `no`.
    Skipped,
    /// The stage raised an error.
    Failed,
}

/// One row of the softphone results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// CSV row number.
    pub row_number: usize,
    /// User email.
    pub user_email: String,
    /// Stage.
    pub stage: SoftphoneStage,
    /// Outcome.
    pub status: StageStatus,
    /// API response or request body.
    #[serde(default)]
    pub response: Value,
    /// Error text.
    #[serde(default)]
    pub error: Option<String>,
}

/// Decision recorded for a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedDecision {
    /// Keyword.
    pub decision: StageDecision,
    /// Overrides file for `yesbut`.
    #[serde(default)]
    pub overrides: Option<PathBuf>,
}

/// Contents of `v2/run_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftphoneRunState {
    /// Run identifier.
    pub run_id: String,
    /// When the run finished.
    pub executed_at: DateTime<Utc>,
    /// Mode.
    pub mode: RunMode,
    /// Records loaded.
    pub record_count: usize,
    /// Decision per stage name.
    pub decisions: HashMap<String, RecordedDecision>,
    /// Per record and stage outcomes.
    pub results: Vec<StageResult>,
}

impl SoftphoneRunState {
    /// Number of failed stage executions.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == StageStatus::Failed)
            .count()
    }
}

/// Runs the v2 softphone flow.
pub struct SoftphoneRunner<'a> {
    api: &'a dyn WebexApi,
    v2_dir: PathBuf,
    decisions: &'a dyn DecisionProvider,
}

impl<'a> SoftphoneRunner<'a> {
    /// Creates a runner working in `v2_dir`.
    #[must_use]
    pub fn new(
        api: &'a dyn WebexApi,
        v2_dir: impl Into<PathBuf>,
        decisions: &'a dyn DecisionProvider,
    ) -> Self {
        Self {
            api,
            v2_dir: v2_dir.into(),
            decisions,
        }
    }

    /// Working directory.
    #[must_use]
    pub fn v2_dir(&self) -> &Path {
        &self.v2_dir
    }

    /// Loads the inputs, asks for decisions and runs every stage.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InputError::TemplatesCreated`] when templates
    /// were missing, or an error for invalid inputs, decisions or overrides.
    /// Stage failures are recorded in the results.
    pub async fn run(&self, apply: bool) -> Result<SoftphoneRunState> {
        require_existing(bootstrap_v2_inputs(&self.v2_dir)?)?;
        let records = load_softphones(&self.v2_dir.join(SOFTPHONES_FILE))?;
        let policy = StaticPolicy::load(&self.v2_dir.join(POLICY_FILE))?;
        let plans: Vec<Vec<SoftphoneStage>> = records.iter().map(build_stages).collect();
        info!("Loaded {} softphone records", records.len());

        let mut refs = ResolvedRefs::new();
        let mut decisions = HashMap::new();
        let mut results = Vec::new();

        for stage in SoftphoneStage::ALL {
            let targets: Vec<&SoftphoneRow> = records
                .iter()
                .zip(&plans)
                .filter(|(_, stages)| stages.contains(&stage))
                .map(|(record, _)| record)
                .collect();
            if targets.is_empty() {
                continue;
            }

            let (decision, overrides_file) = self.decisions.decide(stage)?;
            let overrides_file = overrides_file.map(|raw| overrides_path(&self.v2_dir, &raw));
            decisions.insert(
                stage.as_str().to_string(),
                RecordedDecision {
                    decision,
                    overrides: overrides_file.clone(),
                },
            );
            let overrides = match &overrides_file {
                Some(path) => load_overrides(path)?,
                None => HashMap::new(),
            };

            for record in targets {
                let result = if decision == StageDecision::No {
                    StageResult::new(record, stage, StageStatus::Skipped, Value::Null, None)
                } else if !apply {
                    StageResult::new(record, stage, StageStatus::Planned, Value::Null, None)
                } else {
                    let mut payload: Payload = record.payload.clone();
                    if let Some(row) = overrides.get(&record.user_email) {
                        merge_overrides(&mut payload, row);
                    }
                    match apply_stage(self.api, &policy, &mut refs, stage, record, &mut payload)
                        .await
                    {
                        Ok(response) => {
                            StageResult::new(record, stage, StageStatus::Applied, response, None)
                        }
                        Err(err) => {
                            warn!("{stage} failed for {}: {err}", record.user_email);
                            StageResult::new(
                                record,
                                stage,
                                StageStatus::Failed,
                                Value::Null,
                                Some(err.to_string()),
                            )
                        }
                    }
                };
                results.push(result);
            }
        }

        let state = SoftphoneRunState {
            run_id: uuid::Uuid::new_v4().to_string(),
            executed_at: Utc::now(),
            mode: if apply { RunMode::Apply } else { RunMode::DryRun },
            record_count: records.len(),
            decisions,
            results,
        };
        save_json(&self.v2_dir.join(RUN_STATE_FILE), &state).await?;
        info!(
            "Softphone run {} finished: {} results, {} failed",
            state.run_id,
            state.results.len(),
            state.failed_count()
        );
        Ok(state)
    }
}

impl StageResult {
    fn new(
        record: &SoftphoneRow,
        stage: SoftphoneStage,
        status: StageStatus,
        response: Value,
        error: Option<String>,
    ) -> Self {
        Self {
            row_number: record.row_number,
            user_email: record.user_email.clone(),
            stage,
            status,
            response,
            error,
        }
    }
}
