//! Export of every module to JSON and CSV.
//!
//! A failing module is classified, written as an empty export and recorded
//! in the status files; the run continues with the next module.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::inputs::{Payload, payload_string};
use crate::state::save_json;

use super::modules::{ExportModule, group_members_path};
use super::report::{ExportReport, ModuleReport, render_html};
use super::source::ExportSource;
use super::status::{ModuleResult, StatusRecord};
use super::writer::write_csv;

/// Status JSON file name.
pub const STATUS_JSON: &str = "status.json";
/// Status CSV file name.
pub const STATUS_CSV: &str = "status.csv";
/// Report JSON file name.
pub const REPORT_JSON: &str = "report.json";
/// Cache file name.
pub const CACHE_FILE: &str = "cache.json";
/// Cache schema version.
pub const CACHE_SCHEMA_VERSION: &str = "v1";

/// What to export and which extra artifacts to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Artifacts directory.
    pub out_dir: PathBuf,
    /// Export `group_members`.
    pub group_members: bool,
    /// Write `report.json` and `report/index.html`.
    pub write_report: bool,
    /// Write `cache.json`.
    pub write_cache: bool,
}

impl ExportOptions {
    /// Options taken from the settings file.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let toggles = settings.contract().toggles;
        Self {
            out_dir: settings.out_dir.clone(),
            group_members: toggles.group_members,
            write_report: toggles.report_enabled,
            write_cache: toggles.cache_enabled,
        }
    }

    /// Modules exported with these options.
    #[must_use]
    pub fn modules(&self) -> Vec<ExportModule> {
        ExportModule::ALL
            .into_iter()
            .filter(|m| self.group_members || *m != ExportModule::GroupMembers)
            .collect()
    }
}

/// What an export run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Artifacts directory.
    pub out_dir: PathBuf,
    /// Per-module outcome.
    pub report: ExportReport,
    /// Status records.
    pub status: Vec<StatusRecord>,
    /// HTML report, when written.
    pub report_path: Option<PathBuf>,
    /// Cache file, when written.
    pub cache_path: Option<PathBuf>,
}

/// Runs `export-all`.
pub struct ExportRunner<'a> {
    source: &'a dyn ExportSource,
    options: ExportOptions,
}

impl<'a> ExportRunner<'a> {
    /// Creates a runner.
    #[must_use]
    pub const fn new(source: &'a dyn ExportSource, options: ExportOptions) -> Self {
        Self { source, options }
    }

    /// Exports every module and writes the status, report and cache files.
    ///
    /// # Errors
    ///
    /// Returns an error only if an artifact cannot be written.
    pub async fn run(&self) -> Result<ExportSummary> {
        let out_dir = &self.options.out_dir;
        tokio::fs::create_dir_all(out_dir).await?;

        let mut status = Vec::new();
        let mut modules = Vec::new();
        let mut entities: BTreeMap<&'static str, Vec<Payload>> = BTreeMap::new();

        for module in self.options.modules() {
            let started = Instant::now();
            let fetched = match module {
                ExportModule::GroupMembers => {
                    let groups = entities.get(ExportModule::Groups.name()).map_or(&[][..], Vec::as_slice);
                    self.group_members(groups).await
                }
                _ => self
                    .source
                    .list_items(module.method())
                    .await
                    .map(|items| items.iter().map(|item| module.row(item)).collect()),
            };
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (rows, record) = match fetched {
                Ok(rows) => {
                    let record = StatusRecord {
                        module: module.name().to_string(),
                        method: module.method().to_string(),
                        result: ModuleResult::Ok,
                        http_status: None,
                        error: String::new(),
                        count: rows.len(),
                        elapsed_ms,
                    };
                    (rows, record)
                }
                Err(err) => {
                    warn!("Export of {module} failed: {err}");
                    let record = StatusRecord {
                        module: module.name().to_string(),
                        method: module.method().to_string(),
                        result: ModuleResult::classify(&err),
                        http_status: err.http_status(),
                        error: err.to_string(),
                        count: 0,
                        elapsed_ms: 0,
                    };
                    (Vec::new(), record)
                }
            };

            let file_paths = write_module(out_dir, module, &rows).await?;
            info!("{module} -> {} -> {} rows", record.result, record.count);
            modules.push(ModuleReport {
                module: module.name().to_string(),
                result: record.result,
                count: record.count,
                file_paths,
            });
            status.push(record);
            entities.insert(module.name(), rows);
        }

        save_json(&out_dir.join(STATUS_JSON), &status).await?;
        let status_rows = status
            .iter()
            .map(|r| match serde_json::to_value(r) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Ok(Payload::new()),
                Err(err) => Err(err.into()),
            })
            .collect::<Result<Vec<_>>>()?;
        write_csv(&out_dir.join(STATUS_CSV), &status_rows, &StatusRecord::COLUMNS)?;

        let report = ExportReport::new(modules);
        let report_path = if self.options.write_report {
            save_json(&out_dir.join(REPORT_JSON), &report).await?;
            let path = out_dir.join("report").join("index.html");
            tokio::fs::create_dir_all(out_dir.join("report")).await?;
            tokio::fs::write(&path, render_html(&status)).await?;
            Some(path)
        } else {
            None
        };

        let cache_path = if self.options.write_cache {
            let path = out_dir.join(CACHE_FILE);
            let cache = json!({
                "meta": {
                    "generated_at_utc": Utc::now().to_rfc3339(),
                    "schema_version": CACHE_SCHEMA_VERSION,
                },
                "entities": entities,
            });
            save_json(&path, &cache).await?;
            Some(path)
        } else {
            None
        };

        info!(
            "Exported {} modules, {} rows, into {}",
            report.total_modules,
            report.total_items,
            out_dir.display()
        );
        Ok(ExportSummary {
            out_dir: out_dir.clone(),
            report,
            status,
            report_path,
            cache_path,
        })
    }

    async fn group_members(&self, groups: &[Payload]) -> Result<Vec<Payload>> {
        let mut rows = Vec::new();
        for group in groups {
            let Some(group_id) = payload_string(group, "group_id") else {
                continue;
            };
            let members = self.source.list_items(&group_members_path(&group_id)).await?;
            rows.extend(members.iter().map(|member| {
                let mut row = ExportModule::GroupMembers.row(member);
                row.insert(String::from("group_id"), Value::String(group_id.clone()));
                row
            }));
        }
        Ok(rows)
    }
}

async fn write_module(out_dir: &Path, module: ExportModule, rows: &[Payload]) -> Result<Vec<String>> {
    let json_path = out_dir.join(format!("{}.json", module.name()));
    let csv_path = out_dir.join(format!("{}.csv", module.name()));
    save_json(&json_path, &rows).await?;
    write_csv(&csv_path, rows, module.columns())?;
    Ok(vec![
        json_path.display().to_string(),
        csv_path.display().to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WebexError;
    use crate::export::source::MockExportSource;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    fn options(temp: &TempDir) -> ExportOptions {
        ExportOptions {
            out_dir: temp.path().to_path_buf(),
            group_members: true,
            write_report: true,
            write_cache: true,
        }
    }

    fn mock_source() -> MockExportSource {
        let mut source = MockExportSource::new();
        source
            .expect_list_items()
            .with(eq("organizations"))
            .returning(|_| Ok(vec![json!({"id": "O1", "displayName": "Acme"})]));
        source
            .expect_list_items()
            .with(eq("locations"))
            .returning(|_| Ok(vec![json!({"id": "L1", "name": "Madrid"})]));
        source
            .expect_list_items()
            .with(eq("groups"))
            .returning(|_| Ok(vec![json!({"id": "G1", "displayName": "Sales"})]));
        source
            .expect_list_items()
            .with(eq("groups/G1/members"))
            .returning(|_| Ok(vec![json!({"id": "P1", "displayName": "Ana"})]));
        source
    }

    #[tokio::test]
    async fn test_forbidden_module_exports_empty_and_continues() {
        let temp = TempDir::new().expect("tempdir");
        let mut source = mock_source();
        source
            .expect_list_items()
            .with(eq("people"))
            .returning(|_| Err(WebexError::from_status(403, "forbidden", None).into()));

        let summary = ExportRunner::new(&source, options(&temp)).run().await.expect("export");
        let results: Vec<_> = summary.status.iter().map(|s| s.result).collect();
        assert_eq!(
            results,
            vec![
                ModuleResult::Ok,
                ModuleResult::Ok,
                ModuleResult::Forbidden,
                ModuleResult::Ok,
                ModuleResult::Ok
            ]
        );
        assert_eq!(summary.status[2].http_status, Some(403));

        let people = std::fs::read_to_string(temp.path().join("people.csv")).expect("csv");
        assert_eq!(people.trim(), "person_id,email,display_name,status,roles,licenses,location_id");
        assert_eq!(summary.report.total_items, 4);
        assert!(temp.path().join("status.json").exists());
        assert!(temp.path().join("status.csv").exists());
        assert!(temp.path().join("report.json").exists());
        assert!(temp.path().join("report").join("index.html").exists());
    }

    #[tokio::test]
    async fn test_group_members_carry_group_id_and_cache() {
        let temp = TempDir::new().expect("tempdir");
        let mut source = mock_source();
        source
            .expect_list_items()
            .with(eq("people"))
            .returning(|_| Ok(Vec::new()));

        let summary = ExportRunner::new(&source, options(&temp)).run().await.expect("export");
        assert!(summary.cache_path.is_some());
        assert_eq!(summary.report.total_modules, 5);
        for name in ["organizations", "locations", "people", "groups", "group_members"] {
            assert!(temp.path().join(format!("{name}.json")).exists(), "{name}.json");
        }

        let cache: Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join(CACHE_FILE)).expect("cache"),
        )
        .expect("json");
        assert_eq!(cache["meta"]["schema_version"], json!("v1"));
        assert_eq!(cache["entities"]["group_members"][0]["group_id"], json!("G1"));
        assert_eq!(cache["entities"]["group_members"][0]["member_id"], json!("P1"));
    }

    #[tokio::test]
    async fn test_skip_group_members_and_no_report() {
        let temp = TempDir::new().expect("tempdir");
        let mut source = MockExportSource::new();
        source.expect_list_items().returning(|_| Ok(Vec::new()));
        let options = ExportOptions {
            group_members: false,
            write_report: false,
            write_cache: false,
            ..options(&temp)
        };

        let summary = ExportRunner::new(&source, options).run().await.expect("export");
        assert_eq!(summary.status.len(), 4);
        assert!(summary.report_path.is_none());
        assert!(!temp.path().join("report.json").exists());
        assert!(!temp.path().join(CACHE_FILE).exists());
        assert!(!temp.path().join("group_members.json").exists());
    }
}
