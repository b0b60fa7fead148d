//! Per-run resolution of external IDs.
//!
//! A direct ID in the payload always wins. Otherwise the natural key is looked
//! up once per run and the result is written back into the payload and the
//! run's [`ResolvedRefs`].

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::inputs::{Payload, payload_str, payload_string};
use crate::webex::WebexApi;

/// Organization and natural key of a cached reference.
type RefKey = (Option<String>, String);

/// IDs resolved during one run, keyed by organization and natural key.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRefs {
    locations: HashMap<RefKey, String>,
    route_groups: HashMap<RefKey, String>,
    people: HashMap<RefKey, String>,
    workspaces: HashMap<RefKey, String>,
}

#[derive(Debug, Clone, Copy)]
enum RefKind {
    Location,
    RouteGroup,
    Person,
    Workspace,
}

impl RefKind {
    const fn id_field(self) -> &'static str {
        match self {
            Self::Location => "location_id",
            Self::RouteGroup => "route_group_id",
            Self::Person => "user_id",
            Self::Workspace => "workspace_id",
        }
    }

    const fn key_field(self) -> &'static str {
        match self {
            Self::Location => "location_name",
            Self::RouteGroup => "route_group_name",
            Self::Person => "user_email",
            Self::Workspace => "workspace_name",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::RouteGroup => "route group",
            Self::Person => "person",
            Self::Workspace => "workspace",
        }
    }
}

/// The payload's `org_id`, if set.
#[must_use]
pub fn org_id(payload: &Payload) -> Option<String> {
    payload_string(payload, "org_id")
}

impl ResolvedRefs {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a known location ID, e.g. right after creating it.
    pub fn remember_location(&mut self, payload: &mut Payload, location_id: &str) {
        if let Some(name) = payload_string(payload, RefKind::Location.key_field()) {
            self.locations
                .insert((org_id(payload), name), location_id.to_string());
        }
        payload.insert(
            RefKind::Location.id_field().to_string(),
            Value::String(location_id.to_string()),
        );
    }

    fn cache(&mut self, kind: RefKind) -> &mut HashMap<RefKey, String> {
        match kind {
            RefKind::Location => &mut self.locations,
            RefKind::RouteGroup => &mut self.route_groups,
            RefKind::Person => &mut self.people,
            RefKind::Workspace => &mut self.workspaces,
        }
    }

    async fn resolve(
        &mut self,
        kind: RefKind,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<Option<String>> {
        if let Some(id) = payload_string(payload, kind.id_field()) {
            return Ok(Some(id));
        }
        let Some(key) = payload_string(payload, kind.key_field()) else {
            return Ok(None);
        };

        let cache_key = (org_id(payload), key);
        let cached = self.cache(kind).get(&cache_key).cloned();
        let resolved = match cached {
            Some(id) => Some(id),
            None => {
                let (org, key) = &cache_key;
                let org = org.as_deref();
                let found = match kind {
                    RefKind::Location => api.find_location(key, org).await?.map(|l| l.id),
                    RefKind::RouteGroup => api.find_route_group(key, org).await?,
                    RefKind::Person => api.find_person(key, org).await?,
                    RefKind::Workspace => api.find_workspace(key, org).await?,
                };
                debug!("Resolved {} '{key}' in {org:?} -> {found:?}", kind.label());
                if let Some(id) = &found {
                    self.cache(kind).insert(cache_key.clone(), id.clone());
                }
                found
            }
        };

        if let Some(id) = &resolved {
            payload.insert(kind.id_field().to_string(), Value::String(id.clone()));
        }
        Ok(resolved)
    }

    async fn require(
        &mut self,
        kind: RefKind,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<String> {
        match self.resolve(kind, api, payload).await? {
            Some(id) => Ok(id),
            None => Err(PlanError::Unresolved {
                kind: kind.label(),
                reference: payload_str(payload, kind.key_field())
                    .unwrap_or("<empty>")
                    .to_string(),
            }
            .into()),
        }
    }

    /// Resolves the location ID, if the location exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup call fails.
    pub async fn location_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<Option<String>> {
        self.resolve(RefKind::Location, api, payload).await
    }

    /// Resolves the location ID or fails.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Unresolved`] when the location does not exist.
    pub async fn require_location_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<String> {
        self.require(RefKind::Location, api, payload).await
    }

    /// Resolves the route group ID by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup call fails.
    pub async fn route_group_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<Option<String>> {
        self.resolve(RefKind::RouteGroup, api, payload).await
    }

    /// Resolves the route group ID or fails.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Unresolved`] when the route group does not exist.
    pub async fn require_route_group_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<String> {
        self.require(RefKind::RouteGroup, api, payload).await
    }

    /// Resolves the person ID by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup call fails.
    pub async fn person_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<Option<String>> {
        self.resolve(RefKind::Person, api, payload).await
    }

    /// Resolves the workspace ID by exact display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup call fails.
    pub async fn workspace_id(
        &mut self,
        api: &dyn WebexApi,
        payload: &mut Payload,
    ) -> Result<Option<String>> {
        self.resolve(RefKind::Workspace, api, payload).await
    }
}
