//! Template bootstrap for missing input files.
//!
//! Missing templates are written with headers only; callers then stop with
//! [`InputError::TemplatesCreated`] so the operator fills them in.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{InputError, Result};

/// v2.1 locations template.
pub const LOCATIONS_FILE: &str = "input_locations.csv";
/// v2.1 users template.
pub const USERS_FILE: &str = "input_users.csv";
/// v2.1 workspaces template.
pub const WORKSPACES_FILE: &str = "input_workspaces.csv";
/// Policy file, shared name for v2 and v2.1.
pub const POLICY_FILE: &str = "static_policy.json";
/// v2 softphones template.
pub const SOFTPHONES_FILE: &str = "input_softphones.csv";
/// v2 decision sample.
pub const DECISIONS_SAMPLE_FILE: &str = "decisions.sample.json";

const LOCATION_COLUMNS: &[&str] = &[
    "location_name",
    "location_id",
    "org_id",
    "time_zone",
    "language_code",
    "country_code",
    "address_line1",
    "address_line2",
    "city",
    "state",
    "postal_code",
    "route_group_name",
    "route_group_id",
    "location_numbers",
    "main_number",
    "internal_dialing_enabled",
    "unknown_extension_route_id",
    "unknown_extension_route_type",
    "unknown_extension_route_name",
    "default_outgoing_profile",
];

const USER_COLUMNS: &[&str] = &[
    "user_email",
    "user_id",
    "extension",
    "legacy_secondary_number",
    "legacy_forward_target",
    "legacy_forward_prefix",
    "outgoing_profile",
];

const WORKSPACE_COLUMNS: &[&str] = &[
    "workspace_name",
    "workspace_id",
    "extension",
    "legacy_secondary_number",
    "legacy_forward_target",
    "legacy_forward_prefix",
    "outgoing_profile",
];

const SOFTPHONE_COLUMNS: &[&str] = &[
    "user_email",
    "calling_license_id",
    "location_id",
    "extension",
    "phone_number",
    "alternate_numbers",
    "cf_always_enabled",
    "cf_always_destination",
    "voicemail_enabled",
    "intercept_enabled",
    "incoming_permissions_mode",
    "outgoing_permissions_mode",
    "call_queue_names",
];

fn default_policy() -> serde_json::Value {
    serde_json::json!({
        "default_outgoing_profile": "profile_2",
        "outgoing_profiles": {
            "profile_1": {"useCustomEnabled": false},
            "profile_2": {
                "useCustomEnabled": true,
                "callingPermissions": [
                    {"callType": "INTERNAL_CALL", "action": "ALLOW", "transferEnabled": true},
                    {"callType": "NATIONAL", "action": "ALLOW", "transferEnabled": true},
                    {"callType": "INTERNATIONAL", "action": "BLOCK", "transferEnabled": false},
                    {"callType": "PREMIUM_SERVICES_I", "action": "BLOCK", "transferEnabled": false}
                ]
            }
        }
    })
}

fn softphone_policy() -> serde_json::Value {
    let mut policy = default_policy();
    policy["incoming_permissions"] = serde_json::json!({
        "custom": {"useCustomEnabled": true, "externalTransfer": "ALLOW_ALL_EXTERNAL", "internalCallsEnabled": true, "collectCallsEnabled": false}
    });
    policy["voicemail_defaults"] = serde_json::json!({"enabled": true, "sendBusyCalls": {"enabled": true}, "sendUnansweredCalls": {"enabled": true, "numberOfRings": 3}});
    policy
}

fn decisions_sample() -> serde_json::Value {
    serde_json::json!({
        "ASSIGN_CALLING_LICENSE": "yes",
        "APPLY_NUMBERS_UPDATE": "no",
        "APPLY_FORWARDING": "yesbut overrides_forwarding.csv",
        "APPLY_VOICEMAIL": "yes",
        "APPLY_CALL_INTERCEPT": "no",
        "APPLY_PERMISSIONS": "yes",
        "APPLY_CALL_QUEUE_MEMBERSHIPS": "no"
    })
}

fn write_if_missing(path: &Path, contents: &str, created: &mut Vec<PathBuf>) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!("Created template: {}", path.display());
    created.push(path.to_path_buf());
    Ok(())
}

fn csv_header(columns: &[&str]) -> String {
    format!("{}\n", columns.join(","))
}

fn pretty(value: &serde_json::Value) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

/// Writes any missing v2.1 templates and returns the created paths.
///
/// # Errors
///
/// Returns an error if a template cannot be written.
pub fn bootstrap_v21_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    write_if_missing(&dir.join(LOCATIONS_FILE), &csv_header(LOCATION_COLUMNS), &mut created)?;
    write_if_missing(&dir.join(USERS_FILE), &csv_header(USER_COLUMNS), &mut created)?;
    write_if_missing(&dir.join(WORKSPACES_FILE), &csv_header(WORKSPACE_COLUMNS), &mut created)?;
    write_if_missing(&dir.join(POLICY_FILE), &pretty(&default_policy())?, &mut created)?;
    Ok(created)
}

/// Writes any missing v2 templates and returns the created paths.
///
/// # Errors
///
/// Returns an error if a template cannot be written.
pub fn bootstrap_v2_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    write_if_missing(&dir.join(SOFTPHONES_FILE), &csv_header(SOFTPHONE_COLUMNS), &mut created)?;
    write_if_missing(&dir.join(POLICY_FILE), &pretty(&softphone_policy())?, &mut created)?;
    write_if_missing(
        &dir.join(DECISIONS_SAMPLE_FILE),
        &pretty(&decisions_sample())?,
        &mut created,
    )?;
    Ok(created)
}

/// Fails with the created paths when bootstrap had to write anything.
///
/// # Errors
///
/// Returns [`InputError::TemplatesCreated`] when `created` is not empty.
pub fn require_existing(created: Vec<PathBuf>) -> Result<()> {
    if created.is_empty() {
        Ok(())
    } else {
        Err(InputError::TemplatesCreated { created }.into())
    }
}
