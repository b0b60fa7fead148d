//! Input templates for provisioning.
//!
//! This module handles:
//! - Typed records for locations, users, workspaces and softphones
//! - CSV and JSON loading with per-row validation
//! - The static outgoing-permission policy
//! - Bootstrapping of missing templates

mod bootstrap;
mod loader;
mod policy;
mod records;

pub use bootstrap::{
    DECISIONS_SAMPLE_FILE, LOCATIONS_FILE, POLICY_FILE, SOFTPHONES_FILE, USERS_FILE,
    WORKSPACES_FILE, bootstrap_v2_inputs, bootstrap_v21_inputs, require_existing,
};
pub use loader::{
    json_rows, load_locations, load_locations_from_json, load_softphones, load_users,
    load_workspaces, read_csv_file, read_csv_rows, records_from_rows, rows_from_file_bytes,
};
pub use policy::{FALLBACK_OUTGOING_PROFILE, StaticPolicy};
pub use records::{
    InputRecord, LocationRow, Payload, SoftphoneRow, UserRow, WorkspaceRow, normalize_row,
    payload_flag, payload_present, payload_str, payload_string, split_pipe,
};
