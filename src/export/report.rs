//! `report.json` and the static HTML report.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::status::{ModuleResult, StatusRecord};

/// One module in `report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Module name.
    pub module: String,
    /// Outcome.
    pub result: ModuleResult,
    /// Exported rows.
    pub count: usize,
    /// JSON and CSV files written for the module.
    pub file_paths: Vec<String>,
}

/// Contents of `report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Per-module entries in export order.
    pub modules: Vec<ModuleReport>,
    /// Number of modules.
    pub total_modules: usize,
    /// Rows across all modules.
    pub total_items: usize,
}

impl ExportReport {
    /// Builds the totals from the module entries.
    #[must_use]
    pub fn new(modules: Vec<ModuleReport>) -> Self {
        Self {
            total_modules: modules.len(),
            total_items: modules.iter().map(|m| m.count).sum(),
            modules,
        }
    }
}

const STYLE: &str = "\
body { font-family: Inter, Segoe UI, Arial, sans-serif; margin: 0; background: #f6f8fc; color: #1f2a44; }
.wrap { max-width: 1280px; margin: 0 auto; padding: 24px; }
.top { display: flex; gap: 12px; margin: 14px 0 20px; flex-wrap: wrap; }
.chip { background: #fff; border: 1px solid #dce2ef; border-radius: 999px; padding: 8px 14px; }
.layout { display: grid; grid-template-columns: 340px 1fr; gap: 16px; align-items: start; }
.card { background: #fff; border: 1px solid #dce2ef; border-radius: 12px; padding: 14px; }
ul { list-style: none; padding: 0; margin: 0; }
li { display: flex; justify-content: space-between; border-bottom: 1px dashed #e8ecf5; padding: 7px 0; }
table { border-collapse: collapse; width: 100%; font-size: 14px; }
th, td { border-bottom: 1px solid #edf1f7; padding: 8px; text-align: left; vertical-align: top; }
.badge { border-radius: 999px; padding: 2px 10px; font-size: 12px; font-weight: 600; text-transform: uppercase; }
.ok { background: #e9f9ef; color: #1f7a44; }
.error, .forbidden, .not_found { background: #feecef; color: #b42318; }
code { background: #f3f6fd; padding: 1px 4px; border-radius: 4px; }";

/// Renders `report/index.html`.
#[must_use]
pub fn render_html(records: &[StatusRecord]) -> String {
    let ok = records.iter().filter(|r| r.result == ModuleResult::Ok).count();

    let mut inventory = String::new();
    let mut sorted: Vec<&StatusRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.module.cmp(&b.module));
    for record in sorted {
        let _ = write!(
            inventory,
            "<li><span>{}</span><strong>{}</strong></li>",
            escape(&record.module),
            record.count
        );
    }

    let mut rows = String::new();
    for record in records {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td><code>{}</code></td><td><span class='badge {result}'>{result}</span></td><td>{}</td><td>{}</td></tr>",
            escape(&record.module),
            escape(&record.method),
            record.count,
            escape(&record.error),
            result = record.result,
        );
    }

    format!(
        "<!doctype html>
<html><head><meta charset='utf-8'><title>SpaceOdT Export Report</title>
<style>
{STYLE}
</style></head>
<body>
<div class='wrap'>
<h1>SpaceOdT Export Report</h1>
<div class='top'>
  <div class='chip'>Modules: <strong>{total}</strong></div>
  <div class='chip'>OK: <strong>{ok}</strong></div>
  <div class='chip'>With errors: <strong>{failed}</strong></div>
</div>
<div class='layout'>
  <aside class='card'><h2>Inventory</h2><ul>{inventory}</ul></aside>
  <section class='card'><h2>Status by method</h2><table><thead><tr><th>Module</th><th>Method</th><th>Result</th><th>Count</th><th>Error</th></tr></thead><tbody>{rows}</tbody></table></section>
</div>
</div>
</body></html>
",
        total = records.len(),
        failed = records.len() - ok,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
