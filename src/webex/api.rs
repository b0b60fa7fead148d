//! The Webex API seam used by the planner, jobs and transformations.
//!
//! Everything that talks to Webex goes through [`WebexApi`], so executors take
//! a `&dyn WebexApi` and tests substitute an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::{Result, WebexError};

use super::types::{AddNumbers, CallQueueSummary, LicenseAssignment, LocationSummary, NewLocation};

/// The entity a setting belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingTarget {
    /// A location.
    Location(String),
    /// A person.
    Person(String),
    /// A workspace.
    Workspace(String),
    /// A call queue within a location.
    CallQueue {
        /// Owning location.
        location_id: String,
        /// Queue ID.
        queue_id: String,
    },
}

impl SettingTarget {
    fn kind(&self) -> &'static str {
        match self {
            Self::Location(_) => "location",
            Self::Person(_) => "person",
            Self::Workspace(_) => "workspace",
            Self::CallQueue { .. } => "call queue",
        }
    }
}

impl fmt::Display for SettingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location(id) | Self::Person(id) | Self::Workspace(id) => {
                write!(f, "{} {id}", self.kind())
            }
            Self::CallQueue {
                location_id,
                queue_id,
            } => write!(f, "call queue {queue_id} at {location_id}"),
        }
    }
}

/// A readable (and usually writable) settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Telephony details of a location, including the calling line ID.
    Telephony,
    /// Internal dialing of a location.
    InternalDialing,
    /// Outgoing calling permissions.
    OutgoingPermission,
    /// Incoming calling permissions.
    IncomingPermission,
    /// Phone numbers.
    Numbers,
    /// PSTN connection options of a location (read only).
    PstnOptions,
    /// PSTN connection of a location (write only).
    PstnConnection,
    /// Call forwarding.
    Forwarding,
    /// Voicemail.
    Voicemail,
    /// Call intercept.
    Intercept,
    /// Call queue details, including agents.
    Queue,
}

impl Setting {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Telephony => "telephony",
            Self::InternalDialing => "internal_dialing",
            Self::OutgoingPermission => "outgoing_permission",
            Self::IncomingPermission => "incoming_permission",
            Self::Numbers => "numbers",
            Self::PstnOptions => "pstn_options",
            Self::PstnConnection => "pstn_connection",
            Self::Forwarding => "forwarding",
            Self::Voicemail => "voicemail",
            Self::Intercept => "intercept",
            Self::Queue => "queue",
        }
    }

    /// Path used to read this setting.
    ///
    /// # Errors
    ///
    /// Returns [`WebexError::UnsupportedSetting`] when the target has no such setting.
    pub fn read_path(self, target: &SettingTarget) -> std::result::Result<String, WebexError> {
        use SettingTarget::{CallQueue, Location, Person, Workspace};

        let path = match (target, self) {
            (Location(id), Self::Telephony) => format!("telephony/config/locations/{id}"),
            (Location(id), Self::InternalDialing) => {
                format!("telephony/config/locations/{id}/internalDialing")
            }
            (Location(id), Self::OutgoingPermission) => {
                format!("telephony/config/locations/{id}/outgoingPermission")
            }
            (Location(id), Self::Numbers) => format!("telephony/config/numbers?locationId={id}"),
            (Location(id), Self::PstnOptions) => {
                format!("telephony/pstn/locations/{id}/connectionOptions")
            }
            (Person(id), Self::Numbers) => format!("telephony/config/people/{id}/numbers"),
            (Person(id), Self::Forwarding) => format!("people/{id}/features/callForwarding"),
            (Person(id), Self::OutgoingPermission) => {
                format!("people/{id}/features/outgoingPermission")
            }
            (Person(id), Self::IncomingPermission) => {
                format!("people/{id}/features/incomingPermission")
            }
            (Person(id), Self::Voicemail) => format!("people/{id}/features/voicemail"),
            (Person(id), Self::Intercept) => format!("people/{id}/features/intercept"),
            (Workspace(id), Self::Numbers) => format!("workspaces/{id}/features/numbers"),
            (Workspace(id), Self::Forwarding) => format!("workspaces/{id}/features/callForwarding"),
            (Workspace(id), Self::OutgoingPermission) => {
                format!("workspaces/{id}/features/outgoingPermission")
            }
            (
                CallQueue {
                    location_id,
                    queue_id,
                },
                Self::Queue,
            ) => format!("telephony/config/locations/{location_id}/queues/{queue_id}"),
            _ => return Err(self.unsupported(target)),
        };
        Ok(path)
    }

    /// Path used to update this setting with `PUT`.
    ///
    /// # Errors
    ///
    /// Returns [`WebexError::UnsupportedSetting`] when the setting cannot be written.
    pub fn write_path(self, target: &SettingTarget) -> std::result::Result<String, WebexError> {
        use SettingTarget::{Location, Workspace};

        match (target, self) {
            (Location(_), Self::Numbers | Self::PstnOptions) => Err(self.unsupported(target)),
            (Location(id), Self::PstnConnection) => {
                Ok(format!("telephony/pstn/locations/{id}/connection"))
            }
            (Workspace(id), Self::Numbers) => Ok(format!("telephony/config/workspaces/{id}/numbers")),
            _ => self.read_path(target),
        }
    }

    fn unsupported(self, target: &SettingTarget) -> WebexError {
        WebexError::UnsupportedSetting {
            setting: self.name().to_string(),
            target: target.kind().to_string(),
        }
    }
}

/// Operations the provisioning flows need from Webex.
///
/// Lookups return `Ok(None)` when nothing matches; transport and HTTP failures
/// are errors.
#[async_trait]
pub trait WebexApi: Send + Sync {
    /// Finds a location by exact name.
    async fn find_location(&self, name: &str, org_id: Option<&str>)
    -> Result<Option<LocationSummary>>;

    /// Lists every location visible to the token.
    async fn list_locations(&self, org_id: Option<&str>) -> Result<Vec<LocationSummary>>;

    /// Reads the location resource.
    async fn location_details(&self, location_id: &str, org_id: Option<&str>) -> Result<Value>;

    /// Creates a location and returns its ID.
    async fn create_location(&self, location: &NewLocation, org_id: Option<&str>) -> Result<String>;

    /// Enables an existing location for Webex Calling.
    async fn enable_location_calling(
        &self,
        location_id: &str,
        location: &NewLocation,
        org_id: Option<&str>,
    ) -> Result<()>;

    /// Finds a premise PSTN route group by exact name.
    async fn find_route_group(&self, name: &str, org_id: Option<&str>) -> Result<Option<String>>;

    /// Finds a person by email.
    async fn find_person(&self, email: &str, org_id: Option<&str>) -> Result<Option<String>>;

    /// Finds a workspace by exact display name.
    async fn find_workspace(&self, display_name: &str, org_id: Option<&str>)
    -> Result<Option<String>>;

    /// Finds a call queue by exact name.
    async fn find_call_queue(&self, name: &str, org_id: Option<&str>)
    -> Result<Option<CallQueueSummary>>;

    /// Reads a settings document.
    async fn read_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        org_id: Option<&str>,
    ) -> Result<Value>;

    /// Replaces a settings document.
    async fn write_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        body: &Value,
        org_id: Option<&str>,
    ) -> Result<()>;

    /// Adds numbers to a location.
    async fn add_location_numbers(
        &self,
        location_id: &str,
        request: &AddNumbers,
        org_id: Option<&str>,
    ) -> Result<Value>;

    /// Assigns a calling license to a user.
    async fn assign_license(
        &self,
        assignment: &LicenseAssignment,
        org_id: Option<&str>,
    ) -> Result<Value>;
}
