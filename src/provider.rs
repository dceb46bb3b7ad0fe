//! [`ProviderService`] implementation for SignalFx.

use crate::config::{Endpoints, ProviderConfig};
use crate::credentials::CredentialSources;
use crate::error::ProviderError;
use crate::lifecycle::{Lifecycle, ReadOutcome, ResourceState};
use crate::resources::ResourceKind;
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::transport::Transport;
use crate::validation::validate;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::{debug, info, instrument};

type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Debug)]
struct Configured {
    endpoints: Endpoints,
    lifecycle: Lifecycle,
}

/// SignalFx provider. Configure once, then drive resources through it.
#[derive(Debug)]
pub struct SignalformProvider {
    sources: CredentialSources,
    transport: Transport,
    env: EnvLookup,
    configured: OnceLock<Configured>,
}

impl SignalformProvider {
    /// Provider reading credentials from `sources`.
    pub fn new(sources: CredentialSources) -> Self {
        Self {
            sources,
            transport: Transport::new(),
            env: process_env,
            configured: OnceLock::new(),
        }
    }

    /// Provider using the standard credential locations of this process.
    pub fn from_environment() -> Result<Self, ProviderError> {
        Ok(Self::new(CredentialSources::from_environment()?))
    }

    /// Use a caller built transport.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the environment lookup used for `SFX_AUTH_TOKEN`.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Whether [`configure`](ProviderService::configure) succeeded.
    pub fn is_configured(&self) -> bool {
        self.configured.get().is_some()
    }

    /// Endpoints in use; the defaults until configured.
    pub fn endpoints(&self) -> Endpoints {
        self.configured
            .get()
            .map(|c| c.endpoints.clone())
            .unwrap_or_default()
    }

    /// Schema of the `provider` block.
    pub fn provider_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "auth_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("SignalFx auth token. Falls back to SFX_AUTH_TOKEN, netrc and the signalfx.conf files"),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string()
                    .with_default(json!(crate::config::DEFAULT_API_URL))
                    .with_description("SignalFx API base url"),
            )
            .with_attribute(
                "app_url",
                Attribute::optional_string()
                    .with_default(json!(crate::config::DEFAULT_APP_URL))
                    .with_description("SignalFx web application base url, used for computed urls"),
            )
    }

    fn configured(&self) -> Result<&Configured, ProviderError> {
        self.configured.get().ok_or_else(|| {
            ProviderError::Configuration("provider used before configure".to_string())
        })
    }
}

fn created_state(value: &Value, kind: ResourceKind) -> Result<ResourceState, ProviderError> {
    let state = ResourceState::from_value(value)?;
    if !state.is_created() {
        return Err(ProviderError::NotCreated(format!("{} {}", kind, state.name)));
    }
    Ok(state)
}

fn remote_id(state: &ResourceState) -> Result<&str, ProviderError> {
    state
        .remote_id()
        .ok_or_else(|| ProviderError::NotCreated(state.name.clone()))
}

#[async_trait::async_trait]
impl ProviderService for SignalformProvider {
    fn schema(&self) -> ProviderSchema {
        let endpoints = self.endpoints();
        ResourceKind::ALL.into_iter().fold(
            ProviderSchema::new().with_provider_config(Self::provider_schema()),
            |schema, kind| schema.with_resource(kind.type_name(), kind.schema(&endpoints)),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::provider_schema(), &config))
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        if self.is_configured() {
            return Err(ProviderError::Configuration(
                "provider is already configured".to_string(),
            ));
        }
        let diagnostics = validate(&Self::provider_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(&config)?.with_env_lookup(self.env);
        let token = self.sources.resolve(config.explicit_token())?;
        let endpoints = config.endpoints();
        let lifecycle = Lifecycle::new(
            self.transport.clone(),
            token,
            endpoints.not_found_marker.clone(),
        );

        info!(api_url = endpoints.api_url(), "provider configured");
        self.configured
            .set(Configured {
                endpoints,
                lifecycle,
            })
            .map_err(|_| {
                ProviderError::Configuration("provider is already configured".to_string())
            })?;
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        Ok(validate(&kind.schema(&self.endpoints()), &config))
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let configured = self.configured()?;
        let payload = kind.payload(&planned_state)?;

        let mut state = ResourceState::from_value(&planned_state)?;
        if state.resource_url.is_none() {
            state.resource_url = configured.endpoints.ui_template(kind.collection());
        }
        let url = configured.endpoints.collection(kind.collection());
        configured.lifecycle.create(&url, payload, &mut state).await?;

        let mut out = planned_state;
        state.apply_to(&mut out);
        kind.annotate(&mut out)?;
        Ok(out)
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let configured = self.configured()?;
        let mut state = created_state(&current_state, kind)?;

        let url = configured.endpoints.item(kind.collection(), remote_id(&state)?);
        let outcome = configured.lifecycle.read(&url, &mut state).await?;
        debug!(?outcome, "read finished");
        if outcome == ReadOutcome::Gone {
            state.url = None;
        }

        let mut out = current_state;
        state.apply_to(&mut out);
        kind.annotate(&mut out)?;
        Ok(out)
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let configured = self.configured()?;
        let payload = kind.payload(&planned_state)?;

        let planned = ResourceState::from_value(&planned_state)?;
        let mut state = created_state(&prior_state, kind)?;
        state.name = planned.name;
        if planned.resource_url.is_some() {
            state.resource_url = planned.resource_url;
        }

        let url = configured.endpoints.item(kind.collection(), remote_id(&state)?);
        configured.lifecycle.update(&url, payload, &mut state).await?;

        let mut out = planned_state;
        state.apply_to(&mut out);
        kind.annotate(&mut out)?;
        Ok(out)
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let configured = self.configured()?;
        let mut state = created_state(&current_state, kind)?;

        let url = configured.endpoints.item(kind.collection(), remote_id(&state)?);
        configured.lifecycle.delete(&url, &mut state).await
    }
}
