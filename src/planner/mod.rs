//! Provisioning planner module.
//!
//! This module handles:
//! - Stage and entity definitions
//! - Deterministic plan construction
//! - Per-run resolution of external IDs
//! - Stage execution with before/after capture

mod executor;
mod plan;
mod resolver;
mod stage;
mod stages;

pub use executor::{
    ActionExecutor, PLAN_FILE, ProvisioningInputs, RunOutputs, RunSummary, load_plan_rows,
};
pub use plan::{
    ActionMode, PlanRow, PlannedAction, build_plan, plan_fingerprint, plan_rows, write_plan_csv,
};
pub use resolver::{ResolvedRefs, org_id};
pub use stage::{EntityType, SoftphoneStage, Stage, StageDecision, parse_stage_decision};
pub use stages::{StageContext, StageOps, legacy_target};
pub(crate) use stages::{new_location, set_always_forward};
