//! Stage dispatch table.
//!
//! [`Stage::ops`] maps every stage to a [`StageOps`] implementation holding
//! its state reader and its side effect.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{PlanError, Result};
use crate::inputs::{Payload, StaticPolicy, payload_flag, payload_str, payload_string, split_pipe};
use crate::webex::{
    AddNumbers, LocationAddress, NewLocation, NumberState, NumberType, PremiseRouteType,
    PstnConnection, Setting, SettingTarget, WebexApi,
};

use super::resolver::{ResolvedRefs, org_id};
use super::stage::Stage;

/// Everything a stage needs besides its payload.
pub struct StageContext<'a> {
    /// Webex API.
    pub api: &'a dyn WebexApi,
    /// Static policy.
    pub policy: &'a StaticPolicy,
    /// IDs resolved so far in this run.
    pub refs: &'a mut ResolvedRefs,
}

/// Reader and side effect of one stage.
#[async_trait]
pub trait StageOps: Send + Sync {
    /// Captures the remote state this stage touches.
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value>;

    /// Applies the stage.
    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()>;
}

impl Stage {
    /// Returns the operations for this stage.
    #[must_use]
    pub fn ops(self) -> &'static dyn StageOps {
        match self {
            Self::LocationCreateAndActivate => &CreateAndActivate,
            Self::LocationRouteGroupResolve => &RouteGroupResolve,
            Self::LocationPstnConfigure => &PstnConfigure,
            Self::LocationNumbersAddDisabled => &NumbersAddDisabled,
            Self::LocationMainDdiAssign => &MainDdiAssign,
            Self::LocationInternalCallingConfig => &InternalCallingConfig,
            Self::LocationOutgoingPermissionDefault => &LocationOutgoingDefault,
            Self::UserLegacyIntercomSecondary => &USER_INTERCOM,
            Self::UserLegacyForwardPrefix53 => &USER_FORWARD,
            Self::UserOutgoingPermissionOverride => &USER_OUTGOING,
            Self::WorkspaceLegacyIntercomSecondary => &WORKSPACE_INTERCOM,
            Self::WorkspaceLegacyForwardPrefix53 => &WORKSPACE_FORWARD,
            Self::WorkspaceOutgoingPermissionOverride => &WORKSPACE_OUTGOING,
        }
    }
}

/// Destination for the legacy always-forward.
///
/// `legacy_forward_target` wins. Otherwise the extension is prefixed with
/// `legacy_forward_prefix` (default `53`), dropping a leading `8`.
#[must_use]
pub fn legacy_target(payload: &Payload) -> Option<String> {
    if let Some(target) = payload_string(payload, "legacy_forward_target") {
        return Some(target);
    }
    let extension = payload_str(payload, "extension")?;
    let prefix = payload_str(payload, "legacy_forward_prefix").unwrap_or("53");
    let extension = extension.strip_prefix('8').unwrap_or(extension);
    Some(format!("+{prefix}{extension}"))
}

/// Turns a 404 into `null`; other errors propagate.
fn or_null(result: Result<Value>) -> Result<Value> {
    match result {
        Err(err) if err.http_status() == Some(404) => Ok(Value::Null),
        other => other,
    }
}

/// Location create body from a row, with the lab defaults for missing fields.
pub(crate) fn new_location(payload: &Payload, name: &str) -> NewLocation {
    let text = |key: &str, default: &str| payload_str(payload, key).unwrap_or(default).to_string();
    let language = text("language_code", "es_ES");
    NewLocation {
        name: name.to_string(),
        time_zone: text("time_zone", "Europe/Madrid"),
        preferred_language: language.clone(),
        announcement_language: language,
        address: LocationAddress {
            address1: text("address_line1", "N/A"),
            address2: payload_string(payload, "address_line2"),
            city: text("city", "N/A"),
            state: text("state", "N/A"),
            postal_code: text("postal_code", "00000"),
            country: text("country_code", "ES"),
        },
    }
}

struct CreateAndActivate;

#[async_trait]
impl StageOps for CreateAndActivate {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let Some(location_id) = ctx.refs.location_id(ctx.api, payload).await? else {
            return Ok(json!({"location": null, "calling": null}));
        };
        let org = org_id(payload);
        let location = or_null(ctx.api.location_details(&location_id, org.as_deref()).await)?;
        let calling = or_null(
            ctx.api
                .read_setting(
                    &SettingTarget::Location(location_id),
                    Setting::Telephony,
                    org.as_deref(),
                )
                .await,
        )?;
        Ok(json!({"location": location, "calling": calling}))
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        if ctx.refs.location_id(ctx.api, payload).await?.is_some() {
            debug!("Location already exists, nothing to create");
            return Ok(());
        }
        let name = payload_string(payload, "location_name")
            .ok_or_else(|| PlanError::missing("location_name"))?;
        let org = org_id(payload);
        let location = new_location(payload, &name);

        let location_id = ctx.api.create_location(&location, org.as_deref()).await?;
        ctx.api
            .enable_location_calling(&location_id, &location, org.as_deref())
            .await?;
        info!("Created location '{name}' ({location_id}) and enabled calling");
        ctx.refs.remember_location(payload, &location_id);
        Ok(())
    }
}

struct RouteGroupResolve;

#[async_trait]
impl StageOps for RouteGroupResolve {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let route_group_id = ctx.refs.route_group_id(ctx.api, payload).await?;
        Ok(json!({"route_group_id": route_group_id}))
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        ctx.refs.route_group_id(ctx.api, payload).await?;
        Ok(())
    }
}

struct PstnConfigure;

#[async_trait]
impl StageOps for PstnConfigure {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let options = ctx
            .api
            .read_setting(
                &SettingTarget::Location(location_id),
                Setting::PstnOptions,
                org_id(payload).as_deref(),
            )
            .await?;
        Ok(json!({"pstn_options": options}))
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let route_group_id = ctx.refs.require_route_group_id(ctx.api, payload).await?;
        let body = serde_json::to_value(PstnConnection::premise(
            PremiseRouteType::RouteGroup,
            route_group_id,
        ))?;
        ctx.api
            .write_setting(
                &SettingTarget::Location(location_id),
                Setting::PstnConnection,
                &body,
                org_id(payload).as_deref(),
            )
            .await
    }
}

struct NumbersAddDisabled;

#[async_trait]
impl StageOps for NumbersAddDisabled {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let numbers = ctx
            .api
            .read_setting(
                &SettingTarget::Location(location_id),
                Setting::Numbers,
                org_id(payload).as_deref(),
            )
            .await?;
        let numbers = numbers
            .get("phoneNumbers")
            .cloned()
            .unwrap_or_else(|| json!([]));
        Ok(json!({"numbers": numbers}))
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let numbers = split_pipe(payload_str(payload, "location_numbers"));
        if numbers.is_empty() {
            debug!("No location numbers to add");
            return Ok(());
        }
        let request = AddNumbers {
            phone_numbers: numbers,
            number_type: NumberType::Did,
            state: NumberState::Inactive,
        };
        ctx.api
            .add_location_numbers(&location_id, &request, org_id(payload).as_deref())
            .await?;
        Ok(())
    }
}

struct MainDdiAssign;

#[async_trait]
impl StageOps for MainDdiAssign {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        ctx.api
            .read_setting(
                &SettingTarget::Location(location_id),
                Setting::Telephony,
                org_id(payload).as_deref(),
            )
            .await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let Some(main_number) = payload_string(payload, "main_number") else {
            return Ok(());
        };
        let target = SettingTarget::Location(location_id);
        let org = org_id(payload);
        let current = ctx
            .api
            .read_setting(&target, Setting::Telephony, org.as_deref())
            .await?;
        let name = current
            .pointer("/callingLineId/name")
            .and_then(Value::as_str)
            .or_else(|| current.get("name").and_then(Value::as_str))
            .unwrap_or_default();
        let body = json!({"callingLineId": {"name": name, "phoneNumber": main_number}});
        ctx.api
            .write_setting(&target, Setting::Telephony, &body, org.as_deref())
            .await
    }
}

struct InternalCallingConfig;

#[async_trait]
impl StageOps for InternalCallingConfig {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        ctx.api
            .read_setting(
                &SettingTarget::Location(location_id),
                Setting::InternalDialing,
                org_id(payload).as_deref(),
            )
            .await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let Some(enabled) = payload_flag(payload, "internal_dialing_enabled") else {
            return Ok(());
        };

        let body = if enabled {
            let route_id = match payload_string(payload, "unknown_extension_route_id") {
                Some(id) => id,
                None => ctx.refs.require_route_group_id(ctx.api, payload).await?,
            };
            let route_type =
                payload_str(payload, "unknown_extension_route_type").unwrap_or("ROUTE_GROUP");
            let mut identity = json!({"id": route_id, "type": route_type});
            if let Some(name) = payload_str(payload, "unknown_extension_route_name") {
                identity["name"] = json!(name);
            }
            json!({
                "enableUnknownExtensionRoutePolicy": true,
                "unknownExtensionRouteIdentity": identity,
            })
        } else {
            json!({"enableUnknownExtensionRoutePolicy": false})
        };

        ctx.api
            .write_setting(
                &SettingTarget::Location(location_id),
                Setting::InternalDialing,
                &body,
                org_id(payload).as_deref(),
            )
            .await
    }
}

struct LocationOutgoingDefault;

#[async_trait]
impl StageOps for LocationOutgoingDefault {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        ctx.api
            .read_setting(
                &SettingTarget::Location(location_id),
                Setting::OutgoingPermission,
                org_id(payload).as_deref(),
            )
            .await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let location_id = ctx.refs.require_location_id(ctx.api, payload).await?;
        let settings = ctx.policy.profile_settings(payload)?;
        ctx.api
            .write_setting(
                &SettingTarget::Location(location_id),
                Setting::OutgoingPermission,
                &settings,
                org_id(payload).as_deref(),
            )
            .await
    }
}

/// Users and workspaces share their stage logic.
#[derive(Debug, Clone, Copy)]
enum Member {
    User,
    Workspace,
}

impl Member {
    async fn resolve(
        self,
        ctx: &mut StageContext<'_>,
        payload: &mut Payload,
    ) -> Result<Option<SettingTarget>> {
        Ok(match self {
            Self::User => ctx
                .refs
                .person_id(ctx.api, payload)
                .await?
                .map(SettingTarget::Person),
            Self::Workspace => ctx
                .refs
                .workspace_id(ctx.api, payload)
                .await?
                .map(SettingTarget::Workspace),
        })
    }

    fn absent(self) -> Value {
        match self {
            Self::User => json!({"person": null}),
            Self::Workspace => json!({"workspace": null}),
        }
    }

    async fn read(
        self,
        ctx: &mut StageContext<'_>,
        payload: &mut Payload,
        setting: Setting,
    ) -> Result<Value> {
        match self.resolve(ctx, payload).await? {
            Some(target) => {
                ctx.api
                    .read_setting(&target, setting, org_id(payload).as_deref())
                    .await
            }
            None => Ok(self.absent()),
        }
    }
}

struct LegacyIntercom(Member);
struct LegacyForward(Member);
struct OutgoingOverride(Member);

static USER_INTERCOM: LegacyIntercom = LegacyIntercom(Member::User);
static USER_FORWARD: LegacyForward = LegacyForward(Member::User);
static USER_OUTGOING: OutgoingOverride = OutgoingOverride(Member::User);
static WORKSPACE_INTERCOM: LegacyIntercom = LegacyIntercom(Member::Workspace);
static WORKSPACE_FORWARD: LegacyForward = LegacyForward(Member::Workspace);
static WORKSPACE_OUTGOING: OutgoingOverride = OutgoingOverride(Member::Workspace);

#[async_trait]
impl StageOps for LegacyIntercom {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        self.0.read(ctx, payload, Setting::Numbers).await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let Some(target) = self.0.resolve(ctx, payload).await? else {
            return Ok(());
        };
        let Some(number) = payload_string(payload, "legacy_secondary_number") else {
            return Ok(());
        };
        let body = json!({"phoneNumbers": [{"action": "ADD", "directNumber": number}]});
        ctx.api
            .write_setting(&target, Setting::Numbers, &body, org_id(payload).as_deref())
            .await
    }
}

#[async_trait]
impl StageOps for LegacyForward {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        self.0.read(ctx, payload, Setting::Forwarding).await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let Some(target) = self.0.resolve(ctx, payload).await? else {
            return Ok(());
        };
        let Some(destination) = legacy_target(payload) else {
            return Ok(());
        };
        let org = org_id(payload);
        let mut forwarding = ctx
            .api
            .read_setting(&target, Setting::Forwarding, org.as_deref())
            .await?;
        set_always_forward(&mut forwarding, &destination);
        ctx.api
            .write_setting(&target, Setting::Forwarding, &forwarding, org.as_deref())
            .await
    }
}

/// Sets `callForwarding.always` on a forwarding document, keeping the rest.
pub(crate) fn set_always_forward(forwarding: &mut Value, destination: &str) {
    if !forwarding.is_object() {
        *forwarding = json!({});
    }
    if !forwarding["callForwarding"].is_object() {
        forwarding["callForwarding"] = json!({});
    }
    forwarding["callForwarding"]["always"] = json!({
        "enabled": true,
        "destination": destination,
        "destinationVoicemailEnabled": false,
        "ringReminderEnabled": false,
    });
}

#[async_trait]
impl StageOps for OutgoingOverride {
    async fn read_state(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<Value> {
        self.0.read(ctx, payload, Setting::OutgoingPermission).await
    }

    async fn apply(&self, ctx: &mut StageContext<'_>, payload: &mut Payload) -> Result<()> {
        let Some(target) = self.0.resolve(ctx, payload).await? else {
            return Ok(());
        };
        let settings = ctx.policy.profile_settings(payload)?;
        ctx.api
            .write_setting(
                &target,
                Setting::OutgoingPermission,
                &settings,
                org_id(payload).as_deref(),
            )
            .await
    }
}
