//! Create/read/update/delete protocol shared by every resource kind.
//!
//! A resource moves between three states: absent (no remote id), present and
//! synced, present and drifted. Drift is detected by comparing the vendor's
//! `lastUpdated` with the value recorded on the last successful call.
//!
//! Each call issues exactly one request. State fields are only written after
//! the response has been fully decoded, so a failed call leaves the state as
//! it was.

use crate::config::render_url;
use crate::error::ProviderError;
use crate::resources::common::null_default;
use crate::transport::{ApiResponse, Transport};
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument, warn};

/// Skew allowance in milliseconds. SignalFx moves `lastUpdated` a little
/// during its own post-processing after a write.
pub const OFFSET: f64 = 10000.0;

/// Computed and bookkeeping fields of a declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Vendor assigned id; `None` until created.
    #[serde(default)]
    pub id: Option<String>,

    /// Declared name, used in error messages.
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,

    /// `false` once a remote modification was observed.
    #[serde(default = "default_synced", deserialize_with = "null_as_synced")]
    pub synced: bool,

    /// Remote modification time last observed, epoch milliseconds.
    #[serde(default, deserialize_with = "null_default")]
    pub last_updated: f64,

    /// UI url of the object.
    #[serde(default)]
    pub url: Option<String>,

    /// UI url template containing `<id>`.
    #[serde(default)]
    pub resource_url: Option<String>,
}

fn default_synced() -> bool {
    true
}

// Hosts send computed attributes as null before the first apply.
fn null_as_synced<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_synced))
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            synced: true,
            last_updated: 0.0,
            url: None,
            resource_url: None,
        }
    }
}

impl ResourceState {
    /// Fresh state for a resource about to be created.
    pub fn new(name: impl Into<String>, resource_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            resource_url,
            ..Default::default()
        }
    }

    /// Extract the state fields from a full resource object.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ProviderError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::Validation(format!("invalid resource state: {}", e)))
    }

    /// Write the computed fields back into a full resource object.
    pub fn apply_to(&self, value: &mut serde_json::Value) {
        if let Some(object) = value.as_object_mut() {
            object.insert("id".into(), serde_json::json!(self.remote_id()));
            object.insert("synced".into(), serde_json::json!(self.synced));
            object.insert("last_updated".into(), serde_json::json!(self.last_updated));
            object.insert("url".into(), serde_json::json!(self.url));
            if let Some(template) = &self.resource_url {
                object.insert("resource_url".into(), serde_json::json!(template));
            }
        }
    }

    /// Remote id, treating an empty string as unset.
    pub fn remote_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether the object exists remotely as far as this state knows.
    pub fn is_created(&self) -> bool {
        self.remote_id().is_some()
    }

    fn rendered_url(&self, id: &str) -> Option<String> {
        self.resource_url
            .as_deref()
            .map(|template| render_url(template, id))
    }
}

#[derive(Debug, Deserialize)]
struct RemoteObject {
    id: String,
    #[serde(rename = "lastUpdated")]
    last_updated: f64,
}

/// What a read observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Remote timestamp within tolerance.
    Unchanged,
    /// Remote object modified outside of this provider.
    Drifted,
    /// Remote object deleted outside of this provider; the id was cleared.
    Gone,
}

/// Drives the protocol for one configured provider.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    transport: Transport,
    token: String,
    not_found_marker: String,
}

impl Lifecycle {
    /// Lifecycle using `token` on every request.
    pub fn new(transport: Transport, token: impl Into<String>, not_found_marker: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            not_found_marker: not_found_marker.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ProviderError> {
        self.transport.send(method, url, &self.token, payload).await
    }

    /// POST `payload` to the collection `url`.
    #[instrument(skip(self, payload, state), fields(resource = %state.name))]
    pub async fn create(
        &self,
        url: &str,
        payload: Vec<u8>,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let response = self.send(Method::POST, url, Some(payload)).await?;
        if response.status != 200 {
            return Err(ProviderError::api(&state.name, response.status, &response.body));
        }
        let remote: RemoteObject = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::decode(&state.name, "create", e))?;

        state.url = state.rendered_url(&remote.id);
        state.last_updated = remote.last_updated;
        state.synced = true;
        info!(id = %remote.id, last_updated = remote.last_updated, "created");
        state.id = Some(remote.id);
        Ok(())
    }

    /// GET the object `url` and record drift or out-of-band deletion.
    #[instrument(skip(self, state), fields(resource = %state.name))]
    pub async fn read(&self, url: &str, state: &mut ResourceState) -> Result<ReadOutcome, ProviderError> {
        let response = self.send(Method::GET, url, None).await?;
        if response.status == 404 && response.text().contains(&self.not_found_marker) {
            warn!("object deleted outside of the provider; clearing id");
            state.id = None;
            return Ok(ReadOutcome::Gone);
        }
        if response.status != 200 {
            return Err(ProviderError::api(&state.name, response.status, &response.body));
        }
        let remote: RemoteObject = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::decode(&state.name, "read", e))?;

        let outcome = if remote.last_updated > state.last_updated + OFFSET {
            warn!(
                local = state.last_updated,
                remote = remote.last_updated,
                "object modified outside of the provider"
            );
            state.synced = false;
            state.last_updated = remote.last_updated;
            ReadOutcome::Drifted
        } else {
            ReadOutcome::Unchanged
        };
        state.url = state.rendered_url(&remote.id);
        Ok(outcome)
    }

    /// PUT `payload` to the object `url`; a successful update resolves drift.
    #[instrument(skip(self, payload, state), fields(resource = %state.name))]
    pub async fn update(
        &self,
        url: &str,
        payload: Vec<u8>,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let response = self.send(Method::PUT, url, Some(payload)).await?;
        if response.status != 200 {
            return Err(ProviderError::api(&state.name, response.status, &response.body));
        }
        let remote: RemoteObject = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::decode(&state.name, "update", e))?;

        state.url = state.rendered_url(&remote.id);
        state.last_updated = remote.last_updated;
        state.synced = true;
        info!(last_updated = remote.last_updated, "updated");
        Ok(())
    }

    /// DELETE the object `url`. A 404 counts as already deleted.
    #[instrument(skip(self, state), fields(resource = %state.name))]
    pub async fn delete(&self, url: &str, state: &mut ResourceState) -> Result<(), ProviderError> {
        let response = self.send(Method::DELETE, url, None).await?;
        if response.status < 400 || response.status == 404 {
            info!(status = response.status, "deleted");
            state.id = None;
            Ok(())
        } else {
            Err(ProviderError::api(&state.name, response.status, &response.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NOT_FOUND_MARKER;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEMPLATE: &str = "https://app.signalfx.com/#/chart/<id>";

    fn lifecycle() -> Lifecycle {
        Lifecycle::new(Transport::new(), "token", NOT_FOUND_MARKER)
    }

    fn created(last_updated: f64) -> ResourceState {
        ResourceState {
            id: Some("abc".to_string()),
            name: "x".to_string(),
            synced: true,
            last_updated,
            url: Some("https://app.signalfx.com/#/chart/abc".to_string()),
            resource_url: Some(TEMPLATE.to_string()),
        }
    }

    async fn respond(server: &MockServer, verb: &str, status: u16, body: serde_json::Value) {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_create_sets_id_and_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/chart"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "abc", "lastUpdated": 1000.0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut state = ResourceState::new("x", Some(TEMPLATE.to_string()));
        lifecycle()
            .create(&format!("{}/v2/chart", server.uri()), br#"{"name":"x"}"#.to_vec(), &mut state)
            .await
            .unwrap();

        assert_eq!(state.remote_id(), Some("abc"));
        assert_eq!(state.last_updated, 1000.0);
        assert!(state.synced);
        assert_eq!(state.url.as_deref(), Some("https://app.signalfx.com/#/chart/abc"));
    }

    #[tokio::test]
    async fn test_create_non_200_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("programText is invalid"))
            .mount(&server)
            .await;

        let mut state = ResourceState::new("x", None);
        let err = lifecycle()
            .create(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(format!("{}", err).contains("x"));
        assert!(format!("{}", err).contains("programText is invalid"));
        assert!(!state.is_created());
    }

    #[tokio::test]
    async fn test_create_201_is_not_success() {
        let server = MockServer::start().await;
        respond(&server, "POST", 201, json!({"id": "abc", "lastUpdated": 1.0})).await;

        let mut state = ResourceState::new("x", None);
        let err = lifecycle()
            .create(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(201));
    }

    #[tokio::test]
    async fn test_create_decode_error_leaves_state_untouched() {
        let server = MockServer::start().await;
        respond(&server, "POST", 200, json!({"id": "abc", "lastUpdated": "yesterday"})).await;

        let mut state = ResourceState::new("x", Some(TEMPLATE.to_string()));
        let before = state.clone();
        let err = lifecycle()
            .create(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode { phase: "create", .. }));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_create_missing_id_is_decode_error() {
        let server = MockServer::start().await;
        respond(&server, "POST", 200, json!({"lastUpdated": 1.0})).await;

        let mut state = ResourceState::new("x", None);
        let err = lifecycle()
            .create(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_read_within_tolerance_is_unchanged() {
        let server = MockServer::start().await;
        respond(&server, "GET", 200, json!({"id": "abc", "lastUpdated": 11000.0})).await;

        let mut state = created(1000.0);
        let outcome = lifecycle().read(&server.uri(), &mut state).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Unchanged);
        assert!(state.synced);
        assert_eq!(state.last_updated, 1000.0);
    }

    #[tokio::test]
    async fn test_read_beyond_tolerance_is_drift() {
        let server = MockServer::start().await;
        respond(&server, "GET", 200, json!({"id": "abc", "lastUpdated": 11000.5})).await;

        let mut state = created(1000.0);
        let outcome = lifecycle().read(&server.uri(), &mut state).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Drifted);
        assert!(!state.synced);
        assert_eq!(state.last_updated, 11000.5);
    }

    #[tokio::test]
    async fn test_read_keeps_unsynced_flag() {
        let server = MockServer::start().await;
        respond(&server, "GET", 200, json!({"id": "abc", "lastUpdated": 5000.0})).await;

        let mut state = created(5000.0);
        state.synced = false;
        lifecycle().read(&server.uri(), &mut state).await.unwrap();
        assert!(!state.synced);
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Chart abc not found"))
            .mount(&server)
            .await;

        let mut state = created(1000.0);
        let outcome = lifecycle().read(&server.uri(), &mut state).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Gone);
        assert!(!state.is_created());
    }

    #[tokio::test]
    async fn test_read_404_without_marker_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no route"))
            .mount(&server)
            .await;

        let mut state = created(1000.0);
        let err = lifecycle().read(&server.uri(), &mut state).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(state.is_created());
    }

    #[tokio::test]
    async fn test_read_custom_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"code":"DELETED"}"#))
            .mount(&server)
            .await;

        let lifecycle = Lifecycle::new(Transport::new(), "token", "DELETED");
        let mut state = created(1000.0);
        assert_eq!(
            lifecycle.read(&server.uri(), &mut state).await.unwrap(),
            ReadOutcome::Gone
        );
    }

    #[tokio::test]
    async fn test_read_server_error() {
        let server = MockServer::start().await;
        respond(&server, "GET", 503, json!({"message": "unavailable"})).await;

        let mut state = created(1000.0);
        let err = lifecycle().read(&server.uri(), &mut state).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_update_resolves_drift() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 200, json!({"id": "abc", "lastUpdated": 30000.0})).await;

        let mut state = created(20000.0);
        state.synced = false;
        lifecycle()
            .update(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap();
        assert!(state.synced);
        assert_eq!(state.last_updated, 30000.0);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_state() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 400, json!({"message": "bad"})).await;

        let mut state = created(20000.0);
        state.synced = false;
        let before = state.clone();
        let err = lifecycle()
            .update(&server.uri(), b"{}".to_vec(), &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_delete_success_statuses_clear_id() {
        for status in [200u16, 204, 302, 399, 404] {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let mut state = created(1000.0);
            lifecycle().delete(&server.uri(), &mut state).await.unwrap();
            assert!(!state.is_created(), "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_id() {
        for status in [400u16, 403, 409, 500] {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let mut state = created(1000.0);
            let err = lifecycle().delete(&server.uri(), &mut state).await.unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert_eq!(state.remote_id(), Some("abc"));
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mut state = created(1000.0);
        let err = lifecycle()
            .delete("http://127.0.0.1:1/v2/chart/abc", &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport { .. }));
        assert!(state.is_created());
    }

    #[test]
    fn test_state_round_trips_through_value() {
        let mut value = json!({
            "name": "x",
            "program_text": "data('a').publish()",
            "id": "",
            "synced": null,
            "last_updated": null
        });
        let mut state = ResourceState::from_value(&value).unwrap();
        assert!(state.synced);
        assert!(!state.is_created());

        state.id = Some("abc".to_string());
        state.last_updated = 5.0;
        state.apply_to(&mut value);
        assert_eq!(value["id"], json!("abc"));
        assert_eq!(value["last_updated"], json!(5.0));
        assert_eq!(value["program_text"], json!("data('a').publish()"));

        state.id = None;
        state.apply_to(&mut value);
        assert!(value["id"].is_null());
    }
}
