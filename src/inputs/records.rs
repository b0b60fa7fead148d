//! Typed input records and payload helpers.
//!
//! Each record keeps its natural key, an optional platform ID, and the full row
//! in `payload`, which later carries resolved IDs as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// CSV fields plus runtime-resolved IDs.
pub type Payload = serde_json::Map<String, Value>;

/// A record type built from one input row.
pub trait InputRecord: Validate + Sized {
    /// Human name of the record kind, used in error messages.
    const KIND: &'static str;

    /// Builds the record from a normalized row.
    fn from_payload(payload: Payload) -> Self;
}

/// A location row from `input_locations.csv` or an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationRow {
    /// Location name.
    #[validate(length(min = 1, message = "location_name is required"))]
    pub location_name: String,
    /// Existing location ID.
    pub location_id: Option<String>,
    /// Default outgoing permission profile for the location.
    pub default_outgoing_profile: Option<String>,
    /// Full row.
    pub payload: Payload,
}

impl InputRecord for LocationRow {
    const KIND: &'static str = "location";

    fn from_payload(payload: Payload) -> Self {
        Self {
            location_name: payload_string(&payload, "location_name").unwrap_or_default(),
            location_id: payload_string(&payload, "location_id"),
            default_outgoing_profile: payload_string(&payload, "default_outgoing_profile"),
            payload,
        }
    }
}

impl LocationRow {
    /// Plan key: the ID when known, else the name.
    #[must_use]
    pub fn key(&self) -> &str {
        self.location_id.as_deref().unwrap_or(&self.location_name)
    }
}

/// A user row from `input_users.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserRow {
    /// User email.
    #[validate(email(message = "user_email must be a valid email"))]
    pub user_email: String,
    /// Existing person ID.
    pub user_id: Option<String>,
    /// Outgoing profile override, or `inline` for an embedded settings object.
    pub outgoing_profile: Option<String>,
    /// Full row.
    pub payload: Payload,
}

impl InputRecord for UserRow {
    const KIND: &'static str = "user";

    fn from_payload(payload: Payload) -> Self {
        Self {
            user_email: payload_string(&payload, "user_email").unwrap_or_default(),
            user_id: payload_string(&payload, "user_id"),
            outgoing_profile: profile_label(&payload),
            payload,
        }
    }
}

impl UserRow {
    /// Plan key: the ID when known, else the email.
    #[must_use]
    pub fn key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.user_email)
    }
}

/// A workspace row from `input_workspaces.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WorkspaceRow {
    /// Workspace display name.
    #[validate(length(min = 1, message = "workspace_name is required"))]
    pub workspace_name: String,
    /// Existing workspace ID.
    pub workspace_id: Option<String>,
    /// Outgoing profile override, or `inline` for an embedded settings object.
    pub outgoing_profile: Option<String>,
    /// Full row.
    pub payload: Payload,
}

impl InputRecord for WorkspaceRow {
    const KIND: &'static str = "workspace";

    fn from_payload(payload: Payload) -> Self {
        Self {
            workspace_name: payload_string(&payload, "workspace_name").unwrap_or_default(),
            workspace_id: payload_string(&payload, "workspace_id"),
            outgoing_profile: profile_label(&payload),
            payload,
        }
    }
}

impl WorkspaceRow {
    /// Plan key: the ID when known, else the name.
    #[must_use]
    pub fn key(&self) -> &str {
        self.workspace_id.as_deref().unwrap_or(&self.workspace_name)
    }
}

/// A softphone row from `v2/input_softphones.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SoftphoneRow {
    /// 1-based CSV row number (header = 1).
    pub row_number: usize,
    /// User email.
    #[validate(email(message = "user_email must be a valid email"))]
    pub user_email: String,
    /// Calling license to assign.
    #[validate(length(min = 1, message = "calling_license_id is required"))]
    pub calling_license_id: String,
    /// Location of the calling user.
    #[validate(length(min = 1, message = "location_id is required"))]
    pub location_id: String,
    /// Extension.
    pub extension: Option<String>,
    /// Primary number.
    pub phone_number: Option<String>,
    /// Full row, including the optional trigger columns.
    pub payload: Payload,
}

impl InputRecord for SoftphoneRow {
    const KIND: &'static str = "softphone";

    fn from_payload(payload: Payload) -> Self {
        Self {
            row_number: 0,
            user_email: payload_string(&payload, "user_email").unwrap_or_default(),
            calling_license_id: payload_string(&payload, "calling_license_id").unwrap_or_default(),
            location_id: payload_string(&payload, "location_id").unwrap_or_default(),
            extension: payload_string(&payload, "extension"),
            phone_number: payload_string(&payload, "phone_number"),
            payload,
        }
    }
}

/// Returns a non-empty string field.
#[must_use]
pub fn payload_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Returns a non-empty string field as an owned value.
#[must_use]
pub fn payload_string(payload: &Payload, key: &str) -> Option<String> {
    payload_str(payload, key).map(ToString::to_string)
}

/// Interprets a yes/no style field. Empty or unknown values are `None`.
#[must_use]
pub fn payload_flag(payload: &Payload, key: &str) -> Option<bool> {
    match payload.get(key)? {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "si" | "sí" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// True when the field holds a non-empty value of any kind.
#[must_use]
pub fn payload_present(payload: &Payload, key: &str) -> bool {
    match payload.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(_)) => true,
    }
}

/// Splits a `|` separated field into trimmed, non-empty items.
#[must_use]
pub fn split_pipe(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split('|')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Normalizes a raw JSON or CSV row: keys and strings trimmed, numbers
/// stringified, nulls dropped.
#[must_use]
pub fn normalize_row(row: serde_json::Map<String, Value>) -> Payload {
    row.into_iter()
        .filter_map(|(key, value)| {
            let key = key.trim().trim_start_matches('\u{feff}').to_string();
            if key.is_empty() {
                return None;
            }
            let value = match value {
                Value::Null => return None,
                Value::String(s) => Value::String(s.trim().to_string()),
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            };
            Some((key, value))
        })
        .collect()
}

fn profile_label(payload: &Payload) -> Option<String> {
    match payload.get("outgoing_profile") {
        Some(Value::Object(map)) if !map.is_empty() => Some(String::from("inline")),
        _ => payload_string(payload, "outgoing_profile"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => normalize_row(map),
            _ => Payload::new(),
        }
    }

    #[test]
    fn test_location_key_prefers_id() {
        let with_id = LocationRow::from_payload(payload(json!({"location_name": "Madrid", "location_id": "L1"})));
        let without_id = LocationRow::from_payload(payload(json!({"location_name": "Madrid", "location_id": ""})));
        assert_eq!(with_id.key(), "L1");
        assert_eq!(without_id.key(), "Madrid");
        assert_eq!(without_id.location_id, None);
    }

    #[test]
    fn test_user_validation() {
        let ok = UserRow::from_payload(payload(json!({"user_email": "ana@example.com"})));
        let bad = UserRow::from_payload(payload(json!({"user_email": "not-an-email"})));
        assert!(ok.validate().is_ok());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_inline_profile_label() {
        let user = UserRow::from_payload(payload(json!({
            "user_email": "ana@example.com",
            "outgoing_profile": {"useCustomEnabled": true}
        })));
        assert_eq!(user.outgoing_profile.as_deref(), Some("inline"));
    }

    #[test]
    fn test_normalize_row() {
        let row = payload(json!({" location_name ": " Madrid ", "postal_code": 28001, "city": null}));
        assert_eq!(row.get("location_name"), Some(&json!("Madrid")));
        assert_eq!(row.get("postal_code"), Some(&json!("28001")));
        assert!(!row.contains_key("city"));
    }

    #[test]
    fn test_flags_and_presence() {
        let row = payload(json!({
            "a": "Sí", "b": "false", "c": true, "d": "", "e": "{}", "f": []
        }));
        assert_eq!(payload_flag(&row, "a"), Some(true));
        assert_eq!(payload_flag(&row, "b"), Some(false));
        assert_eq!(payload_flag(&row, "c"), Some(true));
        assert_eq!(payload_flag(&row, "d"), None);
        assert!(payload_present(&row, "e"));
        assert!(!payload_present(&row, "f"));
        assert!(!payload_present(&row, "missing"));
    }

    #[test]
    fn test_split_pipe() {
        assert_eq!(split_pipe(Some(" +341 | |+342 ")), vec!["+341", "+342"]);
        assert!(split_pipe(None).is_empty());
    }
}
