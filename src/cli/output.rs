//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::export::{ExportSummary, ModuleResult};
use crate::planner::{PlanRow, RunSummary};
use crate::softphone::{SoftphoneRunState, StageStatus};
use crate::state::{ActionOutcome, ActionStatus};
use crate::transform::TransformResult;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Softphone stage row for table display.
#[derive(Tabled)]
struct StageResultRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true when JSON output was requested.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Formats the provisioning plan.
    #[must_use]
    pub fn format_plan(&self, rows: &[PlanRow], plan_csv: &Path) -> String {
        if self.is_json() {
            return Self::json(&serde_json::json!({
                "plan_csv": plan_csv,
                "items": rows,
            }));
        }
        if rows.is_empty() {
            return format!("{} Nothing to provision.\n", "✓".green());
        }

        let table_rows: Vec<PlanActionRow> = rows
            .iter()
            .map(|r| PlanActionRow {
                index: r.action_id,
                entity: r.action.entity_type.to_string(),
                key: r.action.entity_key.clone(),
                stage: r.action.stage.to_string(),
                details: Self::truncate(&r.action.details, 40),
            })
            .collect();

        let mut output = String::from("\nProvisioning Plan\n");
        output.push_str(&Table::new(table_rows).to_string());
        output.push('\n');
        let _ = write!(
            output,
            "\nPlan: {} actions written to {}\n",
            rows.len().to_string().green(),
            plan_csv.display()
        );
        output
    }

    /// Formats the summary of a full run.
    #[must_use]
    pub fn format_run(&self, summary: &RunSummary) -> String {
        if self.is_json() {
            return Self::json(summary);
        }
        let counts = &summary.counts;
        let failed = if counts.failed > 0 {
            counts.failed.to_string().red()
        } else {
            counts.failed.to_string().normal()
        };

        let mut output = String::new();
        let _ = writeln!(output, "Run {} ({})", summary.run_id, summary.mode);
        let _ = writeln!(
            output,
            "  planned: {}  applied: {}  failed: {failed}",
            counts.planned,
            counts.applied.to_string().green(),
        );
        let _ = writeln!(output, "  plan:      {}", summary.outputs.plan_csv.display());
        let _ = writeln!(output, "  run state: {}", summary.outputs.run_state.display());
        output
    }

    /// Formats the outcome of a single action.
    #[must_use]
    pub fn format_action(&self, outcome: &ActionOutcome) -> String {
        if self.is_json() {
            return Self::json(outcome);
        }
        let status = match outcome.status {
            ActionStatus::Applied => outcome.status.to_string().green(),
            ActionStatus::Previewed => outcome.status.to_string().cyan(),
            ActionStatus::Failed => outcome.status.to_string().red(),
        };

        let mut output = String::new();
        let _ = writeln!(
            output,
            "Action {}: {} {} -> {status}",
            outcome.action_id, outcome.action.entity_key, outcome.action.stage
        );
        let _ = writeln!(output, "  changed: {}", outcome.changed);
        if let Some(error) = &outcome.error {
            let _ = writeln!(output, "  error:   {}", error.red());
        }
        let _ = writeln!(output, "  before:  {}", outcome.before);
        let _ = writeln!(output, "  after:   {}", outcome.after);
        output
    }

    /// Formats an export summary, one `module -> result -> count -> files`
    /// line per module.
    #[must_use]
    pub fn format_export(&self, summary: &ExportSummary) -> String {
        if self.is_json() {
            return Self::json(summary);
        }
        let mut output = String::new();
        for module in &summary.report.modules {
            let result = match module.result {
                ModuleResult::Ok => module.result.as_str().green(),
                ModuleResult::Forbidden | ModuleResult::NotFound => module.result.as_str().yellow(),
                ModuleResult::Error => module.result.as_str().red(),
            };
            let _ = writeln!(
                output,
                "{} -> {result} -> {} -> {}",
                module.module,
                module.count,
                module.file_paths.join(", ")
            );
        }
        let _ = writeln!(
            output,
            "\n{} modules, {} items in {}",
            summary.report.total_modules,
            summary.report.total_items,
            summary.out_dir.display()
        );
        if let Some(path) = &summary.report_path {
            let _ = writeln!(output, "Report: {}", path.display());
        }
        output
    }

    /// Formats the softphone stage results.
    #[must_use]
    pub fn format_softphones(&self, state: &SoftphoneRunState) -> String {
        if self.is_json() {
            return Self::json(state);
        }
        let mut output = String::new();
        let _ = writeln!(
            output,
            "Softphones run {} ({}), {} records",
            state.run_id, state.mode, state.record_count
        );
        if !state.results.is_empty() {
            let rows: Vec<StageResultRow> = state
                .results
                .iter()
                .map(|r| StageResultRow {
                    row: r.row_number,
                    user: r.user_email.clone(),
                    stage: r.stage.to_string(),
                    status: Self::stage_status(r.status),
                    error: r.error.as_deref().map_or_else(String::new, |e| Self::truncate(e, 40)),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }
        let failed = state.failed_count();
        if failed > 0 {
            let _ = writeln!(output, "{} stage(s) failed", failed.to_string().red());
        }
        output
    }

    /// Formats a transformation result. Both formats print JSON; text mode
    /// prefixes a status line.
    #[must_use]
    pub fn format_transform(&self, result: &TransformResult) -> String {
        let body = Self::json(result);
        if self.is_json() {
            body
        } else {
            format!("{} {}\n{body}", "✓".green(), result.status)
        }
    }

    /// Formats the dummy users outcome.
    #[must_use]
    pub fn format_users(&self, count: usize, path: &Path) -> String {
        if self.is_json() {
            return Self::json(&serde_json::json!({ "count": count, "output": path }));
        }
        format!("Generated {count} users in {}\n", path.display())
    }

    fn json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_default()
    }

    fn stage_status(status: StageStatus) -> String {
        match status {
            StageStatus::Applied => "applied".green().to_string(),
            StageStatus::Planned => "planned".cyan().to_string(),
            StageStatus::Skipped => "skipped".dimmed().to_string(),
            StageStatus::Failed => "failed".red().to_string(),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}
