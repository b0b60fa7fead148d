//! Stable configuration contract for exports and cache behavior.
//!
//! Consumers rely on the serialized shape of [`SpaceOdtConfig`]; keys are
//! append-only and existing names are never renamed or removed.

use serde::{Deserialize, Serialize};

/// Contract version for this config shape. Bump only when keys or types change.
pub const CONFIG_CONTRACT_VERSION: u32 = 1;

/// Modules enabled by the contract. Append-only.
pub const ENABLED_MODULES: [&str; 4] = ["spaces", "messages", "memberships", "attachments"];

/// Runtime toggles for optional behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    /// Export group membership rows.
    pub group_members: bool,
    /// Write `report.json` and the HTML report.
    pub report_enabled: bool,
    /// Write `cache.json`.
    pub cache_enabled: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            group_members: true,
            report_enabled: true,
            cache_enabled: true,
        }
    }
}

/// Schema versions exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersions {
    /// Version of the per-module export files.
    pub export: u32,
    /// Version of `cache.json`.
    pub cache: u32,
}

impl Default for SchemaVersions {
    fn default() -> Self {
        Self { export: 1, cache: 1 }
    }
}

/// Top-level immutable config contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceOdtConfig {
    /// Contract version.
    pub contract_version: u32,
    /// Enabled module names.
    pub enabled_modules: Vec<String>,
    /// Feature toggles.
    pub toggles: FeatureToggles,
    /// Schema versions.
    pub schema_versions: SchemaVersions,
}

impl Default for SpaceOdtConfig {
    fn default() -> Self {
        Self {
            contract_version: CONFIG_CONTRACT_VERSION,
            enabled_modules: ENABLED_MODULES.iter().map(ToString::to_string).collect(),
            toggles: FeatureToggles::default(),
            schema_versions: SchemaVersions::default(),
        }
    }
}

impl SpaceOdtConfig {
    /// Returns the stable mapping used by downstream consumers.
    #[must_use]
    pub fn as_value(&self) -> serde_json::Value {
        serde_json::json!({
            "contract_version": self.contract_version,
            "enabled_modules": self.enabled_modules,
            "toggles": self.toggles.as_value(),
            "schema_versions": self.schema_versions.as_value(),
        })
    }
}

impl FeatureToggles {
    /// Returns the stable mapping used by serializers.
    #[must_use]
    pub fn as_value(&self) -> serde_json::Value {
        serde_json::json!({
            "group_members": self.group_members,
            "report_enabled": self.report_enabled,
            "cache_enabled": self.cache_enabled,
        })
    }
}

impl SchemaVersions {
    /// Returns the stable mapping used by serializers.
    #[must_use]
    pub fn as_value(&self) -> serde_json::Value {
        serde_json::json!({
            "export": self.export,
            "cache": self.cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enabled_modules_contract_is_fixed() {
        assert_eq!(ENABLED_MODULES, ["spaces", "messages", "memberships", "attachments"]);
    }

    #[test]
    fn test_default_config_contract_shape() {
        assert_eq!(
            SpaceOdtConfig::default().as_value(),
            json!({
                "contract_version": 1,
                "enabled_modules": ["spaces", "messages", "memberships", "attachments"],
                "toggles": {
                    "group_members": true,
                    "report_enabled": true,
                    "cache_enabled": true,
                },
                "schema_versions": {
                    "export": 1,
                    "cache": 1,
                },
            })
        );
    }

    #[test]
    fn test_toggle_and_schema_serialization_helpers() {
        let toggles = FeatureToggles {
            group_members: false,
            report_enabled: true,
            cache_enabled: false,
        };
        let versions = SchemaVersions { export: 2, cache: 3 };

        assert_eq!(
            toggles.as_value(),
            json!({"group_members": false, "report_enabled": true, "cache_enabled": false})
        );
        assert_eq!(versions.as_value(), json!({"export": 2, "cache": 3}));
    }

    #[test]
    fn test_serde_shape_matches_stable_mapping() {
        let config = SpaceOdtConfig::default();
        let via_serde = serde_json::to_value(&config).expect("serialize");
        assert_eq!(via_serde, config.as_value());
    }
}
