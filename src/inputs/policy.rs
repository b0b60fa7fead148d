//! Static policy: named outgoing-permission profiles and their default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{InputError, PlanError, Result};

use super::records::{Payload, payload_str};

/// Profile used when neither the record nor the policy names one.
pub const FALLBACK_OUTGOING_PROFILE: &str = "profile_2";

/// Contents of `static_policy.json`. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticPolicy {
    /// Default outgoing profile name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_outgoing_profile: Option<String>,
    /// Profile name to outgoing permission settings.
    #[serde(default)]
    pub outgoing_profiles: serde_json::Map<String, Value>,
    /// Any other keys.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StaticPolicy {
    /// Loads the policy from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a policy object.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading policy from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses a policy document.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidPolicy`] if the JSON does not match.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            InputError::InvalidPolicy {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Default profile for a location: record value, else policy default,
    /// else [`FALLBACK_OUTGOING_PROFILE`].
    #[must_use]
    pub fn location_default_profile(&self, record_value: Option<&str>) -> String {
        record_value
            .or(self.default_outgoing_profile.as_deref())
            .unwrap_or(FALLBACK_OUTGOING_PROFILE)
            .to_string()
    }

    /// Resolves the outgoing permission settings to apply for a payload.
    ///
    /// The payload's `outgoing_profile` wins, then its
    /// `default_outgoing_profile`, then the policy default. A name is looked
    /// up in `outgoing_profiles`; an inline object is used as is.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::OutgoingProfileNotFound`] when nothing matches.
    pub fn profile_settings(&self, payload: &Payload) -> std::result::Result<Value, PlanError> {
        if let Some(Value::Object(inline)) = payload.get("outgoing_profile") {
            if !inline.is_empty() {
                return Ok(Value::Object(inline.clone()));
            }
        }

        let profile = payload_str(payload, "outgoing_profile")
            .or_else(|| payload_str(payload, "default_outgoing_profile"))
            .or(self.default_outgoing_profile.as_deref());

        profile
            .and_then(|name| self.outgoing_profiles.get(name))
            .cloned()
            .ok_or_else(|| PlanError::OutgoingProfileNotFound {
                profile: profile.unwrap_or("None").to_string(),
            })
    }
}
