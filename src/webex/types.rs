//! Webex API types and data structures.
//!
//! Only the fields the tool reads are modeled; snapshots of settings stay as
//! raw JSON so before/after comparisons see exactly what the API returned.

use serde::{Deserialize, Serialize};

/// A location as returned by `GET /locations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    /// Location ID.
    pub id: String,
    /// Location name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub org_id: Option<String>,
    /// Time zone.
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Postal address of a new location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAddress {
    /// Address line 1.
    pub address1: String,
    /// Address line 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO country code.
    pub country: String,
}

/// Body of `POST /locations` and of calling enablement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    /// Location name.
    pub name: String,
    /// Time zone.
    pub time_zone: String,
    /// Preferred language.
    pub preferred_language: String,
    /// Announcement language.
    pub announcement_language: String,
    /// Address.
    pub address: LocationAddress,
}

/// A call queue reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQueueSummary {
    /// Queue ID.
    pub id: String,
    /// Queue name.
    pub name: String,
    /// Location owning the queue.
    pub location_id: String,
}

/// Number type accepted by `POST .../numbers`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NumberType {
    /// Direct inward dial.
    #[default]
    Did,
    /// Toll free.
    Tollfree,
    /// Mobile.
    Mobile,
}

/// Activation state of added numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NumberState {
    /// Added but not routable.
    #[default]
    Inactive,
    /// Routable.
    Active,
}

/// Body of `POST /telephony/config/locations/{id}/numbers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNumbers {
    /// E.164 numbers.
    pub phone_numbers: Vec<String>,
    /// Number type.
    pub number_type: NumberType,
    /// State after adding.
    pub state: NumberState,
}

/// Premise route type for a PSTN connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiseRouteType {
    /// Route group.
    #[default]
    RouteGroup,
    /// Trunk.
    Trunk,
}

/// Body of `PUT /telephony/pstn/locations/{id}/connection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PstnConnection {
    /// Always `LOCAL_GATEWAY` for premise routing.
    pub id: String,
    /// Route type.
    pub premise_route_type: PremiseRouteType,
    /// Route group or trunk ID.
    pub premise_route_id: String,
}

impl PstnConnection {
    /// Premise-based connection to a route group or trunk.
    #[must_use]
    pub fn premise(route_type: PremiseRouteType, route_id: impl Into<String>) -> Self {
        Self {
            id: String::from("LOCAL_GATEWAY"),
            premise_route_type: route_type,
            premise_route_id: route_id.into(),
        }
    }
}

/// Calling license assignment for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseAssignment {
    /// User email.
    pub email: String,
    /// Calling license ID.
    pub license_id: String,
    /// Location for the calling user.
    pub location_id: String,
    /// Extension, if any.
    pub extension: Option<String>,
    /// Primary number, if any.
    pub phone_number: Option<String>,
}

impl LicenseAssignment {
    /// Builds the `PATCH /licenses/users` body.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        let mut properties = serde_json::json!({ "locationId": self.location_id });
        if let Some(extension) = &self.extension {
            properties["extension"] = serde_json::json!(extension);
        }
        if let Some(phone_number) = &self.phone_number {
            properties["phoneNumber"] = serde_json::json!(phone_number);
        }
        serde_json::json!({
            "email": self.email,
            "licenses": [{
                "id": self.license_id,
                "operation": "add",
                "properties": properties,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_numbers_wire_shape() {
        let body = AddNumbers {
            phone_numbers: vec![String::from("+34910000001")],
            number_type: NumberType::Did,
            state: NumberState::Inactive,
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({"phoneNumbers": ["+34910000001"], "numberType": "DID", "state": "INACTIVE"})
        );
    }

    #[test]
    fn test_pstn_connection_wire_shape() {
        let body = PstnConnection::premise(PremiseRouteType::RouteGroup, "rg-1");
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({"id": "LOCAL_GATEWAY", "premiseRouteType": "ROUTE_GROUP", "premiseRouteId": "rg-1"})
        );
    }

    #[test]
    fn test_license_body_skips_missing_properties() {
        let assignment = LicenseAssignment {
            email: String::from("a@example.com"),
            license_id: String::from("lic"),
            location_id: String::from("loc"),
            extension: Some(String::from("1001")),
            phone_number: None,
        };
        let body = assignment.to_body();
        assert_eq!(body["licenses"][0]["properties"], json!({"locationId": "loc", "extension": "1001"}));
    }
}
