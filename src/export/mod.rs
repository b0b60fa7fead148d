//! Configuration export.
//!
//! This module handles:
//! - The fixed list of exported collections and their CSV columns
//! - Failure isolation and status records per module
//! - `report.json`, the HTML report and `cache.json`

mod modules;
mod report;
mod runner;
mod source;
mod status;
mod writer;

pub use modules::{ExportModule, group_members_path};
pub use report::{ExportReport, ModuleReport, render_html};
pub use runner::{
    CACHE_FILE, CACHE_SCHEMA_VERSION, ExportOptions, ExportRunner, ExportSummary, REPORT_JSON,
    STATUS_CSV, STATUS_JSON,
};
pub use source::ExportSource;
pub use status::{ModuleResult, StatusRecord};
pub use writer::write_csv;
