//! Export modules: list endpoint, columns and row mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::inputs::Payload;

/// A collection exported by `export-all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportModule {
    /// Organizations visible to the token.
    Organizations,
    /// Locations.
    Locations,
    /// People.
    People,
    /// Groups.
    Groups,
    /// Members of every exported group.
    GroupMembers,
}

impl ExportModule {
    /// Modules in export order.
    pub const ALL: [Self; 5] = [
        Self::Organizations,
        Self::Locations,
        Self::People,
        Self::Groups,
        Self::GroupMembers,
    ];

    /// Module name used for file names and status records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Locations => "locations",
            Self::People => "people",
            Self::Groups => "groups",
            Self::GroupMembers => "group_members",
        }
    }

    /// List endpoint recorded as the status `method`.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Locations => "locations",
            Self::People => "people",
            Self::Groups => "groups",
            Self::GroupMembers => "groups/{groupId}/members",
        }
    }

    /// CSV columns.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Organizations => &["org_id", "display_name"],
            Self::Locations => &["location_id", "name", "org_id", "timezone"],
            Self::People => &[
                "person_id",
                "email",
                "display_name",
                "status",
                "roles",
                "licenses",
                "location_id",
            ],
            Self::Groups => &["group_id", "name"],
            Self::GroupMembers => &["group_id", "member_id", "display_name", "email"],
        }
    }

    /// Flattens one API item into an export row.
    #[must_use]
    pub fn row(self, item: &Value) -> Payload {
        let value = match self {
            Self::Organizations => json!({
                "org_id": item["id"],
                "display_name": item["displayName"],
            }),
            Self::Locations => json!({
                "location_id": item["id"],
                "name": item["name"],
                "org_id": item["orgId"],
                "timezone": item["timeZone"],
            }),
            Self::People => json!({
                "person_id": item["id"],
                "email": first_email(item),
                "display_name": item["displayName"],
                "status": item["status"],
                "roles": joined(&item["roles"]),
                "licenses": joined(&item["licenses"]),
                "location_id": item["locationId"],
            }),
            Self::Groups => json!({
                "group_id": item["id"],
                "name": item["displayName"],
            }),
            Self::GroupMembers => json!({
                "member_id": item["id"],
                "display_name": item["displayName"],
                "email": first_email(item),
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }
}

impl fmt::Display for ExportModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Path listing the members of a group.
#[must_use]
pub fn group_members_path(group_id: &str) -> String {
    format!("groups/{group_id}/members")
}

fn first_email(item: &Value) -> Value {
    item["emails"]
        .get(0)
        .or_else(|| item.get("email"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn joined(list: &Value) -> Value {
    list.as_array().map_or(Value::Null, |items| {
        Value::String(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("|"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_people_row() {
        let item = json!({
            "id": "P1",
            "emails": ["ana@example.com", "alt@example.com"],
            "displayName": "Ana",
            "status": "active",
            "roles": ["r1", "r2"],
            "licenses": ["l1"],
            "locationId": "L1",
        });
        let row = ExportModule::People.row(&item);
        assert_eq!(row["email"], json!("ana@example.com"));
        assert_eq!(row["roles"], json!("r1|r2"));
        assert_eq!(row["location_id"], json!("L1"));
    }

    #[test]
    fn test_missing_fields_are_null() {
        let row = ExportModule::Locations.row(&json!({"id": "L1"}));
        assert_eq!(row["name"], Value::Null);
        assert_eq!(row.len(), ExportModule::Locations.columns().len());
    }
}
