//! Provisioning stages and operator decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlanError;

/// Kind of entity an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    /// A location.
    Location,
    /// A user.
    User,
    /// A workspace.
    Workspace,
}

impl EntityType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "LOCATION",
            Self::User => "USER",
            Self::Workspace => "WORKSPACE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A v2.1 provisioning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Create the location if absent and enable it for calling.
    LocationCreateAndActivate,
    /// Resolve the route group used for PSTN.
    LocationRouteGroupResolve,
    /// Point the location PSTN at the route group.
    LocationPstnConfigure,
    /// Add location numbers in inactive state.
    LocationNumbersAddDisabled,
    /// Set the location main number.
    LocationMainDdiAssign,
    /// Configure internal dialing.
    LocationInternalCallingConfig,
    /// Apply the default outgoing permission profile.
    LocationOutgoingPermissionDefault,
    /// Add the legacy intercom number to a user.
    UserLegacyIntercomSecondary,
    /// Forward a user to the legacy platform.
    #[serde(rename = "USER_LEGACY_FORWARD_PREFIX_53")]
    UserLegacyForwardPrefix53,
    /// Apply a non-default outgoing profile to a user.
    UserOutgoingPermissionOverride,
    /// Add the legacy intercom number to a workspace.
    WorkspaceLegacyIntercomSecondary,
    /// Forward a workspace to the legacy platform.
    #[serde(rename = "WORKSPACE_LEGACY_FORWARD_PREFIX_53")]
    WorkspaceLegacyForwardPrefix53,
    /// Apply a non-default outgoing profile to a workspace.
    WorkspaceOutgoingPermissionOverride,
}

impl Stage {
    /// Location stages in execution order.
    pub const LOCATION: [Self; 7] = [
        Self::LocationCreateAndActivate,
        Self::LocationRouteGroupResolve,
        Self::LocationPstnConfigure,
        Self::LocationNumbersAddDisabled,
        Self::LocationMainDdiAssign,
        Self::LocationInternalCallingConfig,
        Self::LocationOutgoingPermissionDefault,
    ];

    /// Every stage, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::LocationCreateAndActivate,
        Self::LocationRouteGroupResolve,
        Self::LocationPstnConfigure,
        Self::LocationNumbersAddDisabled,
        Self::LocationMainDdiAssign,
        Self::LocationInternalCallingConfig,
        Self::LocationOutgoingPermissionDefault,
        Self::UserLegacyIntercomSecondary,
        Self::UserLegacyForwardPrefix53,
        Self::UserOutgoingPermissionOverride,
        Self::WorkspaceLegacyIntercomSecondary,
        Self::WorkspaceLegacyForwardPrefix53,
        Self::WorkspaceOutgoingPermissionOverride,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocationCreateAndActivate => "LOCATION_CREATE_AND_ACTIVATE",
            Self::LocationRouteGroupResolve => "LOCATION_ROUTE_GROUP_RESOLVE",
            Self::LocationPstnConfigure => "LOCATION_PSTN_CONFIGURE",
            Self::LocationNumbersAddDisabled => "LOCATION_NUMBERS_ADD_DISABLED",
            Self::LocationMainDdiAssign => "LOCATION_MAIN_DDI_ASSIGN",
            Self::LocationInternalCallingConfig => "LOCATION_INTERNAL_CALLING_CONFIG",
            Self::LocationOutgoingPermissionDefault => "LOCATION_OUTGOING_PERMISSION_DEFAULT",
            Self::UserLegacyIntercomSecondary => "USER_LEGACY_INTERCOM_SECONDARY",
            Self::UserLegacyForwardPrefix53 => "USER_LEGACY_FORWARD_PREFIX_53",
            Self::UserOutgoingPermissionOverride => "USER_OUTGOING_PERMISSION_OVERRIDE",
            Self::WorkspaceLegacyIntercomSecondary => "WORKSPACE_LEGACY_INTERCOM_SECONDARY",
            Self::WorkspaceLegacyForwardPrefix53 => "WORKSPACE_LEGACY_FORWARD_PREFIX_53",
            Self::WorkspaceOutgoingPermissionOverride => "WORKSPACE_OUTGOING_PERMISSION_OVERRIDE",
        }
    }

    /// Entity type this stage applies to.
    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::LocationCreateAndActivate
            | Self::LocationRouteGroupResolve
            | Self::LocationPstnConfigure
            | Self::LocationNumbersAddDisabled
            | Self::LocationMainDdiAssign
            | Self::LocationInternalCallingConfig
            | Self::LocationOutgoingPermissionDefault => EntityType::Location,
            Self::UserLegacyIntercomSecondary
            | Self::UserLegacyForwardPrefix53
            | Self::UserOutgoingPermissionOverride => EntityType::User,
            Self::WorkspaceLegacyIntercomSecondary
            | Self::WorkspaceLegacyForwardPrefix53
            | Self::WorkspaceOutgoingPermissionOverride => EntityType::Workspace,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A v2 softphone stage, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoftphoneStage {
    /// Assign the calling license.
    AssignCallingLicense,
    /// Update alternate numbers.
    ApplyNumbersUpdate,
    /// Configure always-forward.
    ApplyForwarding,
    /// Configure voicemail.
    ApplyVoicemail,
    /// Configure call intercept.
    ApplyCallIntercept,
    /// Configure incoming/outgoing permissions.
    ApplyPermissions,
    /// Join call queues.
    ApplyCallQueueMemberships,
}

impl SoftphoneStage {
    /// All stages in execution order.
    pub const ALL: [Self; 7] = [
        Self::AssignCallingLicense,
        Self::ApplyNumbersUpdate,
        Self::ApplyForwarding,
        Self::ApplyVoicemail,
        Self::ApplyCallIntercept,
        Self::ApplyPermissions,
        Self::ApplyCallQueueMemberships,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssignCallingLicense => "ASSIGN_CALLING_LICENSE",
            Self::ApplyNumbersUpdate => "APPLY_NUMBERS_UPDATE",
            Self::ApplyForwarding => "APPLY_FORWARDING",
            Self::ApplyVoicemail => "APPLY_VOICEMAIL",
            Self::ApplyCallIntercept => "APPLY_CALL_INTERCEPT",
            Self::ApplyPermissions => "APPLY_PERMISSIONS",
            Self::ApplyCallQueueMemberships => "APPLY_CALL_QUEUE_MEMBERSHIPS",
        }
    }
}

impl fmt::Display for SoftphoneStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator decision for a softphone stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageDecision {
    /// Apply the stage.
    Yes,
    /// Skip the stage.
    No,
    /// Apply with per-record overrides from a CSV file.
    Yesbut,
}

/// Parses `yes`, `no` or `yesbut <overrides.csv>`, case-insensitively.
///
/// # Errors
///
/// Returns [`PlanError::InvalidDecision`] for anything else, including a
/// `yesbut` without a path.
pub fn parse_stage_decision(
    input: &str,
) -> std::result::Result<(StageDecision, Option<String>), PlanError> {
    let trimmed = input.trim();
    let invalid = || PlanError::InvalidDecision {
        input: input.to_string(),
    };

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or_default().to_ascii_lowercase();
    let rest = parts.next().map(str::trim).filter(|r| !r.is_empty());

    match (keyword.as_str(), rest) {
        ("yes", None) => Ok((StageDecision::Yes, None)),
        ("no", None) => Ok((StageDecision::No, None)),
        ("yesbut", Some(path)) => Ok((StageDecision::Yesbut, Some(path.to_string()))),
        _ => Err(invalid()),
    }
}

impl FromStr for Stage {
    type Err = PlanError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PlanError::missing(format!("stage {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_decision_yes_no_yesbut() {
        assert_eq!(parse_stage_decision("yes").expect("yes"), (StageDecision::Yes, None));
        assert_eq!(parse_stage_decision("no").expect("no"), (StageDecision::No, None));
        assert_eq!(
            parse_stage_decision("yesbut overrides.csv").expect("yesbut"),
            (StageDecision::Yesbut, Some(String::from("overrides.csv")))
        );
    }

    #[test]
    fn test_parse_stage_decision_is_lenient_on_case_and_space() {
        assert_eq!(parse_stage_decision("  YES ").expect("yes"), (StageDecision::Yes, None));
        assert_eq!(
            parse_stage_decision("YesBut   dir/over rides.csv ").expect("yesbut"),
            (StageDecision::Yesbut, Some(String::from("dir/over rides.csv")))
        );
    }

    #[test]
    fn test_parse_stage_decision_rejects_invalid() {
        assert!(parse_stage_decision("yesbut").is_err());
        assert!(parse_stage_decision("maybe").is_err());
        assert!(parse_stage_decision("yes please").is_err());
        assert!(parse_stage_decision("").is_err());
    }

    #[test]
    fn test_stage_wire_names() {
        for stage in Stage::ALL {
            let json = serde_json::to_value(stage).expect("serialize");
            assert_eq!(json, serde_json::json!(stage.as_str()));
            assert_eq!(stage.as_str().parse::<Stage>().expect("parse"), stage);
        }
        for stage in SoftphoneStage::ALL {
            let json = serde_json::to_value(stage).expect("serialize");
            assert_eq!(json, serde_json::json!(stage.as_str()));
        }
    }
}
