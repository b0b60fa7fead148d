//! Webex REST client implementation.
//!
//! This module provides the authenticated HTTP client for the Webex REST API:
//! bearer auth, `orgId` scoping, `Link` header pagination and error
//! classification from the HTTP status.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::DEFAULT_BASE_URL;
use crate::error::{Result, WebexError};

use super::api::{Setting, SettingTarget, WebexApi};
use super::retry::parse_retry_after;
use super::types::{
    AddNumbers, CallQueueSummary, LicenseAssignment, LocationSummary, NewLocation,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size requested from list endpoints.
const PAGE_SIZE: &str = "100";

/// Webex API client.
#[derive(Debug, Clone)]
pub struct WebexClient {
    /// HTTP client.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Bearer token.
    token: String,
}

impl WebexClient {
    /// Creates a client for the public Webex API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client for a custom base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WebexError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str, org_id: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/json");
        match org_id.filter(|org| !org.is_empty()) {
            Some(org) => builder.query(&[("orgId", org)]),
            None => builder,
        }
    }

    /// Sends a request and classifies non-success statuses.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| WebexError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        trace!("Webex responded {status} for {}", response.url());
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        Err(WebexError::from_status(status.as_u16(), error_message(&body), retry_after).into())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            WebexError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            }
            .into()
        })
    }

    /// `GET` a single JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        org_id: Option<&str>,
    ) -> Result<Value> {
        debug!("GET {path}");
        let builder = self.request(Method::GET, &self.url(path), org_id).query(query);
        let response = self.send(builder).await?;
        Self::read_json(response).await
    }

    /// `GET` every item of a list endpoint, following `Link: rel="next"`.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    pub async fn list_items<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        org_id: Option<&str>,
    ) -> Result<Vec<T>> {
        let key = page_key(path);
        debug!("LIST {path} ({key})");
        let builder = self
            .request(Method::GET, &self.url(path), org_id)
            .query(query)
            .query(&[("max", PAGE_SIZE)]);
        let mut response = self.send(builder).await?;
        let mut items = Vec::new();

        loop {
            let next = next_link(response.headers());
            let page: Value = Self::read_json(response).await?;
            items.extend(page_items::<T>(page, key)?);

            let Some(next) = next else { break };
            trace!("Following next page: {next}");
            response = self.send(self.request(Method::GET, &next, None)).await?;
        }

        Ok(items)
    }

    /// Sends a JSON body and returns the response body, or `null` when empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        org_id: Option<&str>,
    ) -> Result<Value> {
        debug!("{method} {path}");
        let builder = self.request(method, &self.url(path), org_id).json(body);
        let response = self.send(builder).await?;
        let text = response
            .text()
            .await
            .map_err(|e| WebexError::network(format!("Failed to read response: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            WebexError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            }
            .into()
        })
    }

    async fn find_first<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        org_id: Option<&str>,
        matches: impl Fn(&T) -> bool + Send,
    ) -> Result<Option<T>> {
        let items: Vec<T> = self.list_items(path, query, org_id).await?;
        Ok(items.into_iter().find(|item| matches(item)))
    }
}

#[async_trait]
impl WebexApi for WebexClient {
    async fn find_location(
        &self,
        name: &str,
        org_id: Option<&str>,
    ) -> Result<Option<LocationSummary>> {
        self.find_first("locations", &[("name", name)], org_id, |l: &LocationSummary| {
            l.name == name
        })
        .await
    }

    async fn list_locations(&self, org_id: Option<&str>) -> Result<Vec<LocationSummary>> {
        self.list_items("locations", &[], org_id).await
    }

    async fn location_details(&self, location_id: &str, org_id: Option<&str>) -> Result<Value> {
        self.get_json(&format!("locations/{location_id}"), &[], org_id)
            .await
    }

    async fn create_location(&self, location: &NewLocation, org_id: Option<&str>) -> Result<String> {
        let body = serde_json::to_value(location)?;
        let created = self.send_json(Method::POST, "locations", &body, org_id).await?;
        created
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                WebexError::InvalidResponse {
                    message: String::from("location create response has no id"),
                }
                .into()
            })
    }

    async fn enable_location_calling(
        &self,
        location_id: &str,
        location: &NewLocation,
        org_id: Option<&str>,
    ) -> Result<()> {
        let mut body = serde_json::to_value(location)?;
        body["id"] = Value::String(location_id.to_string());
        self.send_json(Method::POST, "telephony/config/locations", &body, org_id)
            .await?;
        Ok(())
    }

    async fn find_route_group(&self, name: &str, org_id: Option<&str>) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        struct RouteGroup {
            id: String,
            name: String,
        }

        let found = self
            .find_first(
                "telephony/config/premisePstn/routeGroups",
                &[("name", name)],
                org_id,
                |rg: &RouteGroup| rg.name == name,
            )
            .await?;
        Ok(found.map(|rg| rg.id))
    }

    async fn find_person(&self, email: &str, org_id: Option<&str>) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        struct Person {
            id: String,
        }

        let found = self
            .find_first("people", &[("email", email)], org_id, |_: &Person| true)
            .await?;
        Ok(found.map(|p| p.id))
    }

    async fn find_workspace(
        &self,
        display_name: &str,
        org_id: Option<&str>,
    ) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Workspace {
            id: String,
            display_name: String,
        }

        let found = self
            .find_first(
                "workspaces",
                &[("displayName", display_name)],
                org_id,
                |ws: &Workspace| ws.display_name == display_name,
            )
            .await?;
        Ok(found.map(|ws| ws.id))
    }

    async fn find_call_queue(
        &self,
        name: &str,
        org_id: Option<&str>,
    ) -> Result<Option<CallQueueSummary>> {
        self.find_first(
            "telephony/config/queues",
            &[("name", name)],
            org_id,
            |q: &CallQueueSummary| q.name == name,
        )
        .await
    }

    async fn read_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        org_id: Option<&str>,
    ) -> Result<Value> {
        let path = setting.read_path(target)?;
        self.get_json(&path, &[], org_id).await
    }

    async fn write_setting(
        &self,
        target: &SettingTarget,
        setting: Setting,
        body: &Value,
        org_id: Option<&str>,
    ) -> Result<()> {
        let path = setting.write_path(target)?;
        self.send_json(Method::PUT, &path, body, org_id).await?;
        Ok(())
    }

    async fn add_location_numbers(
        &self,
        location_id: &str,
        request: &AddNumbers,
        org_id: Option<&str>,
    ) -> Result<Value> {
        let body = serde_json::to_value(request)?;
        self.send_json(
            Method::POST,
            &format!("telephony/config/locations/{location_id}/numbers"),
            &body,
            org_id,
        )
        .await
    }

    async fn assign_license(
        &self,
        assignment: &LicenseAssignment,
        org_id: Option<&str>,
    ) -> Result<Value> {
        let mut body = assignment.to_body();
        if let Some(org) = org_id {
            body["orgId"] = Value::String(org.to_string());
        }
        self.send_json(Method::PATCH, "licenses/users", &body, None)
            .await
    }
}

/// Key holding the items of a list response.
fn page_key(path: &str) -> &'static str {
    let path = path.trim_matches('/');
    if path.ends_with("premisePstn/routeGroups") {
        "routeGroups"
    } else if path.ends_with("telephony/config/queues") {
        "queues"
    } else if path == "groups" {
        "groups"
    } else if path.starts_with("groups/") && path.ends_with("/members") {
        "members"
    } else {
        "items"
    }
}

/// Takes the `key` array out of a list response.
fn page_items<T: DeserializeOwned>(mut page: Value, key: &str) -> Result<Vec<T>> {
    let items = page
        .get_mut(key)
        .map(Value::take)
        .filter(Value::is_array)
        .ok_or_else(|| WebexError::InvalidResponse {
            message: format!("list response has no `{key}` array"),
        })?;
    serde_json::from_value(items).map_err(|e| {
        WebexError::InvalidResponse {
            message: format!("Failed to parse `{key}` items: {e}"),
        }
        .into()
    })
}

/// Extracts the `rel="next"` target of a `Link` header.
fn next_link(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get_all(header::LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            (start < end).then(|| part[start..end].trim().to_string())
        })
}

/// Pulls the human message out of a Webex error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpaceOdtError;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WebexClient {
        WebexClient::with_base_url("test-token", &server.uri(), 5).expect("client")
    }

    #[test]
    fn test_next_link_parsing() {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::LINK,
            header::HeaderValue::from_static(
                "<https://webexapis.com/v1/people?cursor=a>; rel=\"prev\", <https://webexapis.com/v1/people?cursor=b>; rel=\"next\"",
            ),
        );
        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://webexapis.com/v1/people?cursor=b")
        );
        assert_eq!(next_link(&header::HeaderMap::new()), None);
    }

    #[test]
    fn test_page_keys() {
        assert_eq!(page_key("telephony/config/premisePstn/routeGroups"), "routeGroups");
        assert_eq!(page_key("telephony/config/queues"), "queues");
        assert_eq!(page_key("groups"), "groups");
        assert_eq!(page_key("groups/G1/members"), "members");
        assert_eq!(page_key("people"), "items");
    }

    #[tokio::test]
    async fn test_find_route_group_reads_route_groups_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/telephony/config/premisePstn/routeGroups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"routeGroups": [
                {"id": "RG0", "name": "RG-BCN"},
                {"id": "RG1", "name": "RG-MAD"}
            ]})))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_route_group("RG-MAD", None)
            .await
            .expect("lookup");
        assert_eq!(found.as_deref(), Some("RG1"));
    }

    #[tokio::test]
    async fn test_find_call_queue_reads_queues_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/telephony/config/queues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queues": [
                {"id": "Q1", "name": "Soporte", "locationId": "L1"}
            ]})))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_call_queue("Soporte", None)
            .await
            .expect("lookup");
        assert_eq!(found.map(|q| (q.id, q.location_id)), Some((String::from("Q1"), String::from("L1"))));
    }

    #[tokio::test]
    async fn test_unknown_list_envelope_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/telephony/config/queues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"callQueues": []})))
            .mount(&server)
            .await;

        let err = client(&server)
            .find_call_queue("Soporte", None)
            .await
            .expect_err("unknown envelope");
        assert!(matches!(err, SpaceOdtError::Webex(WebexError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_list_items_follows_pagination() {
        let server = MockServer::start().await;
        let next = format!("{}/locations?cursor=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/locations"))
            .and(query_param("cursor", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [{"id": "L2", "name": "Sevilla"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/locations"))
            .and(query_param("orgId", "ORG"))
            .and(header_eq("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!("<{next}>; rel=\"next\"").as_str())
                    .set_body_json(json!({"items": [{"id": "L1", "name": "Madrid"}]})),
            )
            .mount(&server)
            .await;

        let locations = client(&server)
            .list_locations(Some("ORG"))
            .await
            .expect("list");
        let names: Vec<_> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Madrid", "Sevilla"]);
    }

    #[tokio::test]
    async fn test_rate_limit_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
            .mount(&server)
            .await;

        let err = client(&server)
            .find_person("a@example.com", None)
            .await
            .expect_err("rate limited");
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_huge_retry_after_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1e300"))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_locations(None)
            .await
            .expect_err("rate limited");
        assert!(matches!(err, SpaceOdtError::Webex(WebexError::RateLimited { retry_after: None })));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_forbidden_uses_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations/L1"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "missing scope"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .location_details("L1", None)
            .await
            .expect_err("forbidden");
        assert!(matches!(err, SpaceOdtError::Webex(WebexError::Forbidden { ref message }) if message == "missing scope"));
    }

    #[tokio::test]
    async fn test_find_workspace_requires_exact_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
                {"id": "W1", "displayName": "Sala 1 bis"},
                {"id": "W2", "displayName": "Sala 1"}
            ]})))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_workspace("Sala 1", None)
            .await
            .expect("lookup");
        assert_eq!(found.as_deref(), Some("W2"));
    }

    #[tokio::test]
    async fn test_write_setting_puts_body() {
        let server = MockServer::start().await;
        let body = json!({"id": "LOCAL_GATEWAY", "premiseRouteType": "ROUTE_GROUP", "premiseRouteId": "RG"});
        Mock::given(method("PUT"))
            .and(path("/telephony/pstn/locations/L1/connection"))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .write_setting(
                &SettingTarget::Location(String::from("L1")),
                Setting::PstnConnection,
                &body,
                None,
            )
            .await
            .expect("put");
    }

    #[tokio::test]
    async fn test_create_location_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "NEW"})))
            .mount(&server)
            .await;

        let location = NewLocation {
            name: String::from("Madrid"),
            time_zone: String::from("Europe/Madrid"),
            preferred_language: String::from("es_ES"),
            announcement_language: String::from("es_ES"),
            address: crate::webex::types::LocationAddress {
                address1: String::from("N/A"),
                address2: None,
                city: String::from("N/A"),
                state: String::from("N/A"),
                postal_code: String::from("00000"),
                country: String::from("ES"),
            },
        };
        let id = client(&server)
            .create_location(&location, None)
            .await
            .expect("create");
        assert_eq!(id, "NEW");
    }
}
