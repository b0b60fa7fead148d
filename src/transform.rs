//! Direct transformations.
//!
//! Each transformation reads the current document, issues one call and reads
//! the document again. The result carries `before`, `after` and the request
//! that was sent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{ConfigError, PlanError, Result};
use crate::planner::set_always_forward;
use crate::webex::{
    AddNumbers, NumberState, NumberType, PremiseRouteType, PstnConnection, Setting, SettingTarget,
    WebexApi, invoke_with_retry_after,
};

/// Before/after snapshot of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// Document before the call.
    pub before: Value,
    /// Document after the call.
    pub after: Value,
    /// What was sent.
    pub request: Value,
}

/// Result of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformResult {
    /// Always `success`; failures are errors.
    pub status: &'static str,
    /// Snapshots.
    pub api_response: ApiResponse,
}

impl TransformResult {
    const fn success(before: Value, after: Value, request: Value) -> Self {
        Self {
            status: "success",
            api_response: ApiResponse {
                before,
                after,
                request,
            },
        }
    }
}

/// Premise PSTN routing for a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurePstnRequest {
    /// Location ID.
    pub location_id: String,
    /// `ROUTE_GROUP` (default) or `TRUNK`.
    pub premise_route_type: Option<String>,
    /// Route group or trunk ID.
    pub premise_route_id: String,
    /// Organization.
    pub org_id: Option<String>,
}

/// Numbers to add to a location, inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddNumbersRequest {
    /// Location ID.
    pub location_id: String,
    /// Numbers, as a list or newline separated text.
    pub phone_numbers: NumberList,
    /// `DID` (default), `TOLLFREE` or `MOBILE`.
    pub number_type: Option<String>,
    /// Organization.
    pub org_id: Option<String>,
}

/// New main number and calling line name of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMainNumberRequest {
    /// Location ID.
    pub location_id: String,
    /// Main number.
    pub phone_number: String,
    /// Calling line name.
    pub calling_line_name: Option<String>,
    /// Organization.
    pub org_id: Option<String>,
}

/// Always-forward of a user to the legacy platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserForwardLegacyRequest {
    /// Person ID.
    pub person_id: String,
    /// Extension used for the default destination.
    pub extension: String,
    /// Explicit destination; defaults to `53<extension>`.
    pub destination: Option<String>,
    /// Organization.
    pub org_id: Option<String>,
}

/// Phone numbers given either as a JSON list or as text, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NumberInput")]
pub struct NumberList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberInput {
    List(Vec<String>),
    Text(String),
}

impl From<NumberInput> for NumberList {
    fn from(input: NumberInput) -> Self {
        match input {
            NumberInput::List(items) => items.iter().map(String::as_str).collect(),
            NumberInput::Text(text) => text.lines().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for NumberList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PlanError::missing(field).into());
    }
    Ok(value)
}

/// Parses an upper-case wire enum such as `ROUTE_GROUP` or `TOLLFREE`.
fn wire_enum<T: DeserializeOwned + Default>(field: &'static str, raw: Option<&str>) -> Result<T> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_value(Value::String(raw.to_ascii_uppercase()))
        .map_err(|_| ConfigError::invalid(field, format!("unsupported value '{raw}'")).into())
}

/// Connects a location to a premise route group or trunk.
///
/// # Errors
///
/// Returns [`PlanError::MissingField`] for a missing location or route ID,
/// or the API error.
pub async fn configure_pstn(
    api: &dyn WebexApi,
    request: &ConfigurePstnRequest,
) -> Result<TransformResult> {
    let location_id = required("locationId", &request.location_id)?;
    let route_id = required("premiseRouteId", &request.premise_route_id)?;
    let route_type: PremiseRouteType =
        wire_enum("premiseRouteType", request.premise_route_type.as_deref())?;
    let org = request.org_id.as_deref();
    let target = SettingTarget::Location(location_id.to_string());

    let before = invoke_with_retry_after(|| api.read_setting(&target, Setting::PstnOptions, org)).await?;
    let body = serde_json::to_value(PstnConnection::premise(route_type, route_id))?;
    invoke_with_retry_after(|| api.write_setting(&target, Setting::PstnConnection, &body, org))
        .await?;
    let after = invoke_with_retry_after(|| api.read_setting(&target, Setting::PstnOptions, org)).await?;
    info!("Configured PSTN of location {location_id}");

    Ok(TransformResult::success(
        before,
        after,
        json!({"locationId": location_id, "orgId": org, "connection": body}),
    ))
}

/// Adds numbers to a location in the inactive state.
///
/// # Errors
///
/// Returns [`PlanError::MissingField`] for a missing location or empty
/// number list, or the API error.
pub async fn add_numbers(api: &dyn WebexApi, request: &AddNumbersRequest) -> Result<TransformResult> {
    let location_id = required("locationId", &request.location_id)?;
    if request.phone_numbers.0.is_empty() {
        return Err(PlanError::missing("phoneNumbers").into());
    }
    let number_type: NumberType = wire_enum("numberType", request.number_type.as_deref())?;
    let org = request.org_id.as_deref();
    let target = SettingTarget::Location(location_id.to_string());
    let body = AddNumbers {
        phone_numbers: request.phone_numbers.0.clone(),
        number_type,
        state: NumberState::Inactive,
    };

    let before = invoke_with_retry_after(|| api.read_setting(&target, Setting::Numbers, org)).await?;
    invoke_with_retry_after(|| api.add_location_numbers(location_id, &body, org)).await?;
    let after = invoke_with_retry_after(|| api.read_setting(&target, Setting::Numbers, org)).await?;
    info!(
        "Added {} numbers to location {location_id}",
        body.phone_numbers.len()
    );

    Ok(TransformResult::success(
        before,
        after,
        json!({"locationId": location_id, "orgId": org, "numbers": body}),
    ))
}

/// Updates the main number (calling line ID) of a location.
///
/// # Errors
///
/// Returns [`PlanError::MissingField`] for a missing location or number, or
/// the API error.
pub async fn update_main_number(
    api: &dyn WebexApi,
    request: &UpdateMainNumberRequest,
) -> Result<TransformResult> {
    let location_id = required("locationId", &request.location_id)?;
    let phone_number = required("phoneNumber", &request.phone_number)?;
    let org = request.org_id.as_deref();
    let target = SettingTarget::Location(location_id.to_string());

    let mut calling_line = json!({ "phoneNumber": phone_number });
    if let Some(name) = request
        .calling_line_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        calling_line["name"] = json!(name);
    }
    let body = json!({ "callingLineId": calling_line });

    let before = invoke_with_retry_after(|| api.read_setting(&target, Setting::Telephony, org)).await?;
    invoke_with_retry_after(|| api.write_setting(&target, Setting::Telephony, &body, org)).await?;
    let after = invoke_with_retry_after(|| api.read_setting(&target, Setting::Telephony, org)).await?;
    info!("Updated main number of location {location_id}");

    Ok(TransformResult::success(
        before,
        after,
        json!({"locationId": location_id, "orgId": org, "telephony": body}),
    ))
}

/// Forwards every call of a user to the legacy platform.
///
/// # Errors
///
/// Returns [`PlanError::MissingField`] for a missing person or extension, or
/// the API error.
pub async fn user_forward_legacy(
    api: &dyn WebexApi,
    request: &UserForwardLegacyRequest,
) -> Result<TransformResult> {
    let person_id = required("personId", &request.person_id)?;
    let extension = required("extension", &request.extension)?;
    let destination = request
        .destination
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(|| format!("53{extension}"), ToString::to_string);
    let org = request.org_id.as_deref();
    let target = SettingTarget::Person(person_id.to_string());

    let mut body = json!({});
    set_always_forward(&mut body, &destination);

    let before = invoke_with_retry_after(|| api.read_setting(&target, Setting::Forwarding, org)).await?;
    invoke_with_retry_after(|| api.write_setting(&target, Setting::Forwarding, &body, org)).await?;
    let after = invoke_with_retry_after(|| api.read_setting(&target, Setting::Forwarding, org)).await?;
    info!("Forwarded person {person_id} to {destination}");

    Ok(TransformResult::success(
        before,
        after,
        json!({"personId": person_id, "orgId": org, "forwarding": body}),
    ))
}
