//! Provisioning plan types and construction.
//!
//! Planning is pure: the same records and policy always yield the same
//! ordered action list. Locations come first, then users, then workspaces,
//! each in input order with a fixed per-entity stage order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::inputs::{LocationRow, Payload, StaticPolicy, UserRow, WorkspaceRow};

use super::stage::{EntityType, Stage};

/// Execution mode of a planned action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// The action mutates remote state when executed.
    #[default]
    Apply,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// Entity type.
    pub entity_type: EntityType,
    /// Entity ID, or its natural key when the ID is unknown.
    pub entity_key: String,
    /// Stage to run.
    pub stage: Stage,
    /// Mode.
    pub mode: ActionMode,
    /// Human description.
    pub details: String,
    /// Entity payload shared by every stage of the entity.
    pub payload: Payload,
}

/// A planned action with its index in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    /// Index in the plan.
    pub action_id: usize,
    /// The action.
    #[serde(flatten)]
    pub action: PlannedAction,
}

impl PlannedAction {
    fn new(
        entity_type: EntityType,
        entity_key: &str,
        stage: Stage,
        details: impl Into<String>,
        payload: &Payload,
    ) -> Self {
        Self {
            entity_type,
            entity_key: entity_key.to_string(),
            stage,
            mode: ActionMode::Apply,
            details: details.into(),
            payload: payload.clone(),
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.entity_type, self.entity_key, self.stage)
    }
}

fn location_details(stage: Stage, profile: &str) -> String {
    match stage {
        Stage::LocationCreateAndActivate => {
            String::from("Create/activate location and prepare Webex Calling")
        }
        Stage::LocationRouteGroupResolve => String::from("Resolve routeGroupId required for PSTN"),
        Stage::LocationPstnConfigure => String::from("Configure location PSTN"),
        Stage::LocationNumbersAddDisabled => String::from("Add DDI numbers in inactive state"),
        Stage::LocationMainDdiAssign => String::from("Assign main DDI to the location"),
        Stage::LocationInternalCallingConfig => String::from("Configure internal calling"),
        _ => format!("Apply default outgoing profile: {profile}"),
    }
}

/// Builds the ordered action list.
#[must_use]
pub fn build_plan(
    locations: &[LocationRow],
    users: &[UserRow],
    workspaces: &[WorkspaceRow],
    policy: &StaticPolicy,
) -> Vec<PlannedAction> {
    let mut actions = Vec::new();

    for location in locations {
        let profile =
            policy.location_default_profile(location.default_outgoing_profile.as_deref());
        let mut payload = location.payload.clone();
        payload.insert(
            String::from("default_outgoing_profile"),
            Value::String(profile.clone()),
        );
        for stage in Stage::LOCATION {
            actions.push(PlannedAction::new(
                EntityType::Location,
                location.key(),
                stage,
                location_details(stage, &profile),
                &payload,
            ));
        }
    }

    for user in users {
        let key = user.key();
        actions.push(PlannedAction::new(
            EntityType::User,
            key,
            Stage::UserLegacyIntercomSecondary,
            "Add legacy intercom as secondary number",
            &user.payload,
        ));
        actions.push(PlannedAction::new(
            EntityType::User,
            key,
            Stage::UserLegacyForwardPrefix53,
            "Forward to legacy platform with prefix 53",
            &user.payload,
        ));
        if let Some(profile) = &user.outgoing_profile {
            actions.push(PlannedAction::new(
                EntityType::User,
                key,
                Stage::UserOutgoingPermissionOverride,
                format!("Apply non-default outgoing profile: {profile}"),
                &user.payload,
            ));
        }
    }

    for workspace in workspaces {
        let key = workspace.key();
        actions.push(PlannedAction::new(
            EntityType::Workspace,
            key,
            Stage::WorkspaceLegacyIntercomSecondary,
            "Add legacy intercom as secondary number",
            &workspace.payload,
        ));
        actions.push(PlannedAction::new(
            EntityType::Workspace,
            key,
            Stage::WorkspaceLegacyForwardPrefix53,
            "Forward to legacy platform with prefix 53",
            &workspace.payload,
        ));
        if let Some(profile) = &workspace.outgoing_profile {
            actions.push(PlannedAction::new(
                EntityType::Workspace,
                key,
                Stage::WorkspaceOutgoingPermissionOverride,
                format!("Apply non-default outgoing profile: {profile}"),
                &workspace.payload,
            ));
        }
    }

    debug!("Built plan with {} actions", actions.len());
    actions
}

/// Numbers the actions.
#[must_use]
pub fn plan_rows(actions: Vec<PlannedAction>) -> Vec<PlanRow> {
    actions
        .into_iter()
        .enumerate()
        .map(|(action_id, action)| PlanRow { action_id, action })
        .collect()
}

/// SHA-256 of the serialized plan, hex encoded.
///
/// # Errors
///
/// Returns an error if the plan cannot be serialized.
pub fn plan_fingerprint(rows: &[PlanRow]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(rows)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Writes `plan.csv`; the payload column holds compact JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_plan_csv(path: &Path, rows: &[PlanRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "action_id",
        "entity_type",
        "entity_key",
        "stage",
        "mode",
        "details",
        "payload",
    ])?;
    for row in rows {
        let action = &row.action;
        let action_id = row.action_id.to_string();
        let payload = serde_json::to_string(&action.payload)?;
        writer.write_record([
            action_id.as_str(),
            action.entity_type.as_str(),
            action.entity_key.as_str(),
            action.stage.as_str(),
            "apply",
            action.details.as_str(),
            payload.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
