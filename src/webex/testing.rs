//! In-memory [`WebexApi`] for unit tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, WebexError};

use super::api::{Setting, SettingTarget, WebexApi};
use super::types::{AddNumbers, CallQueueSummary, LicenseAssignment, LocationSummary, NewLocation};

#[derive(Debug, Clone, Copy)]
struct Failure {
    status: u16,
    retry_after: Option<Duration>,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct FakeState {
    locations: Vec<LocationSummary>,
    route_groups: HashMap<String, String>,
    people: HashMap<String, String>,
    workspaces: HashMap<String, String>,
    queues: Vec<CallQueueSummary>,
    settings: HashMap<(SettingTarget, Setting), Value>,
    writes: Vec<(SettingTarget, Setting, Value)>,
    added_numbers: Vec<(String, AddNumbers)>,
    licenses: Vec<LicenseAssignment>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, Failure>,
    next_id: usize,
}

/// Fake Webex tenant.
#[derive(Debug, Default)]
pub struct FakeWebex {
    state: Mutex<FakeState>,
}

impl FakeWebex {
    fn with(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.lock());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    pub fn with_location(self, id: &str, name: &str) -> Self {
        self.with(|s| {
            s.locations.push(LocationSummary {
                id: id.to_string(),
                name: name.to_string(),
                org_id: None,
                time_zone: Some(String::from("Europe/Madrid")),
            });
            s.settings.insert(
                (SettingTarget::Location(id.to_string()), Setting::Telephony),
                json!({"id": id, "name": name, "callingLineId": {"name": name}}),
            );
        })
    }

    pub fn with_route_group(self, id: &str, name: &str) -> Self {
        self.with(|s| {
            s.route_groups.insert(name.to_string(), id.to_string());
        })
    }

    pub fn with_person(self, id: &str, email: &str) -> Self {
        self.with(|s| {
            s.people.insert(email.to_string(), id.to_string());
        })
    }

    pub fn with_workspace(self, id: &str, name: &str) -> Self {
        self.with(|s| {
            s.workspaces.insert(name.to_string(), id.to_string());
        })
    }

    pub fn with_queue(self, id: &str, name: &str, location_id: &str) -> Self {
        self.with(|s| {
            s.queues.push(CallQueueSummary {
                id: id.to_string(),
                name: name.to_string(),
                location_id: location_id.to_string(),
            });
        })
    }

    pub fn with_setting(self, target: SettingTarget, setting: Setting, value: Value) -> Self {
        self.with(|s| {
            s.settings.insert((target, setting), value);
        })
    }

    /// Every call to `method` fails with `status`.
    pub fn failing(self, method: &str, status: u16) -> Self {
        self.with(|s| {
            s.failures.insert(
                method.to_string(),
                Failure {
                    status,
                    retry_after: None,
                    remaining: None,
                },
            );
        })
    }

    /// The next `times` calls to `method` fail with `status`.
    pub fn failing_times(
        self,
        method: &str,
        status: u16,
        retry_after: Option<Duration>,
        times: usize,
    ) -> Self {
        self.with(|s| {
            s.failures.insert(
                method.to_string(),
                Failure {
                    status,
                    retry_after,
                    remaining: Some(times),
                },
            );
        })
    }

    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<(SettingTarget, Setting, Value)> {
        self.lock().writes.clone()
    }

    pub fn setting(&self, target: &SettingTarget, setting: Setting) -> Option<Value> {
        self.lock().settings.get(&(target.clone(), setting)).cloned()
    }

    pub fn locations(&self) -> Vec<LocationSummary> {
        self.lock().locations.clone()
    }

    pub fn added_numbers(&self) -> Vec<(String, AddNumbers)> {
        self.lock().added_numbers.clone()
    }

    pub fn licenses(&self) -> Vec<LicenseAssignment> {
        self.lock().licenses.clone()
    }

    fn enter(&self, method: &str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        *state.calls.entry(method.to_string()).or_default() += 1;

        let failure = match state.failures.get_mut(method) {
            Some(f) => match f.remaining {
                None => Some(*f),
                Some(0) => None,
                Some(n) => {
                    f.remaining = Some(n - 1);
                    Some(*f)
                }
            },
            None => None,
        };
        match failure {
            Some(f) => Err(WebexError::from_status(f.status, "injected failure", f.retry_after).into()),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl WebexApi for FakeWebex {
    async fn find_location(&self, name: &str, _org: Option<&str>) -> Result<Option<LocationSummary>> {
        let state = self.enter("find_location")?;
        Ok(state.locations.iter().find(|l| l.name == name).cloned())
    }

    async fn list_locations(&self, _org: Option<&str>) -> Result<Vec<LocationSummary>> {
        let state = self.enter("list_locations")?;
        Ok(state.locations.clone())
    }

    async fn location_details(&self, location_id: &str, _org: Option<&str>) -> Result<Value> {
        let state = self.enter("location_details")?;
        state
            .locations
            .iter()
            .find(|l| l.id == location_id)
            .map(|l| json!({"id": l.id, "name": l.name}))
            .ok_or_else(|| WebexError::from_status(404, "location not found", None).into())
    }

    async fn create_location(&self, location: &NewLocation, _org: Option<&str>) -> Result<String> {
        let mut state = self.enter("create_location")?;
        state.next_id += 1;
        let id = format!("LOC-{}", state.next_id);
        state.locations.push(LocationSummary {
            id: id.clone(),
            name: location.name.clone(),
            org_id: None,
            time_zone: Some(location.time_zone.clone()),
        });
        Ok(id)
    }

    async fn enable_location_calling(
        &self,
        location_id: &str,
        location: &NewLocation,
        _org: Option<&str>,
    ) -> Result<()> {
        let mut state = self.enter("enable_location_calling")?;
        state.settings.insert(
            (SettingTarget::Location(location_id.to_string()), Setting::Telephony),
            json!({"id": location_id, "name": location.name, "callingLineId": {"name": location.name}}),
        );
        Ok(())
    }

    async fn find_route_group(&self, name: &str, _org: Option<&str>) -> Result<Option<String>> {
        let state = self.enter("find_route_group")?;
        Ok(state.route_groups.get(name).cloned())
    }

    async fn find_person(&self, email: &str, _org: Option<&str>) -> Result<Option<String>> {
        let state = self.enter("find_person")?;
        Ok(state.people.get(email).cloned())
    }

    async fn find_workspace(&self, display_name: &str, _org: Option<&str>) -> Result<Option<String>> {
        let state = self.enter("find_workspace")?;
        Ok(state.workspaces.get(display_name).cloned())
    }

    async fn find_call_queue(&self, name: &str, _org: Option<&str>) -> Result<Option<CallQueueSummary>> {
        let state = self.enter("find_call_queue")?;
        Ok(state.queues.iter().find(|q| q.name == name).cloned())
    }

    async fn read_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        _org: Option<&str>,
    ) -> Result<Value> {
        let state = self.enter("read_setting")?;
        match state.settings.get(&(target.clone(), setting)) {
            Some(value) => Ok(value.clone()),
            None if setting == Setting::Telephony => {
                Err(WebexError::from_status(404, "not calling enabled", None).into())
            }
            None => Ok(json!({})),
        }
    }

    async fn write_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        body: &Value,
        _org: Option<&str>,
    ) -> Result<()> {
        let mut state = self.enter("write_setting")?;
        let read_back = if setting == Setting::PstnConnection {
            Setting::PstnOptions
        } else {
            setting
        };
        state.settings.insert((target.clone(), read_back), body.clone());
        state.writes.push((target.clone(), setting, body.clone()));
        Ok(())
    }

    async fn add_location_numbers(
        &self,
        location_id: &str,
        request: &AddNumbers,
        _org: Option<&str>,
    ) -> Result<Value> {
        let mut state = self.enter("add_location_numbers")?;
        let key = (SettingTarget::Location(location_id.to_string()), Setting::Numbers);
        let mut numbers = state
            .settings
            .get(&key)
            .and_then(|v| v.get("phoneNumbers"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        numbers.extend(
            request
                .phone_numbers
                .iter()
                .map(|n| json!({"phoneNumber": n, "state": "INACTIVE"})),
        );
        state.settings.insert(key, json!({"phoneNumbers": numbers}));
        state
            .added_numbers
            .push((location_id.to_string(), request.clone()));
        Ok(json!({}))
    }

    async fn assign_license(
        &self,
        assignment: &LicenseAssignment,
        _org: Option<&str>,
    ) -> Result<Value> {
        let mut state = self.enter("assign_license")?;
        state.licenses.push(assignment.clone());
        Ok(json!({"email": assignment.email}))
    }
}
