//! v2 softphone provisioning.
//!
//! This module handles:
//! - Per-record stage selection from trigger columns
//! - Operator decisions (`yes`, `no`, `yesbut <overrides.csv>`)
//! - Stage execution and `v2/run_state.json`

mod decisions;
mod runner;
mod stages;

pub use decisions::{
    Decision, DecisionProvider, FileDecisions, PromptDecisions, load_overrides, merge_overrides,
    overrides_path,
};
pub use runner::{RecordedDecision, SoftphoneRunState, SoftphoneRunner, StageResult, StageStatus};
pub use stages::{apply_stage, build_stages};
