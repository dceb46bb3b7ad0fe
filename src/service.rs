//! The surface a host drives.
//!
//! States travel as plain JSON objects holding both the declared attributes
//! and the computed ones (`id`, `synced`, `last_updated`, `url`). Every
//! operation returns the full object so the host can store it verbatim.

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};

/// Operations a provider exposes to its host.
///
/// # Example
///
/// ```ignore
/// use signalform_provider::{ProviderService, SignalformProvider};
///
/// let provider = SignalformProvider::from_environment()?;
/// provider.configure(serde_json::json!({"auth_token": "abc"})).await?;
/// let state = provider
///     .create("signalform_text_chart", serde_json::json!({"name": "notes"}))
///     .await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas of the provider block and of every resource kind.
    fn schema(&self) -> ProviderSchema;

    /// Check the provider block before configuring.
    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Resolve credentials and endpoints. Error diagnostics mean the
    /// provider stays unconfigured.
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Check a declared resource against its schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Create the remote object and return the state with its computed fields.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Refresh a state. A state whose `id` comes back `null` was deleted
    /// outside of the provider and has to be recreated.
    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Push the planned state over the existing remote object.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<(), ProviderError>;
}
