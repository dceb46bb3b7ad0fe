//! Test harness for [`ProviderService`] implementations.
//!
//! Drives whole resource lifecycles in-process, without a host.
//!
//! # Example
//!
//! ```ignore
//! use signalform_provider::testing::{assert_synced, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_text_chart() {
//!     let tester = ProviderTester::new(provider_against_mock_server().await);
//!     tester.configure(json!({"auth_token": "test"})).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("signalform_text_chart", json!({"name": "notes"}))
//!         .await
//!         .unwrap();
//!     assert_synced(&state);
//! }
//! ```

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use serde_json::Value;
use thiserror::Error;

/// Wraps a provider with shortcuts for tests.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Tester around `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schema().resources.into_keys().collect();
        types.sort();
        types
    }

    /// Validate the provider block; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a declared resource; error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Pass-through to [`ProviderService::create`].
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Pass-through to [`ProviderService::read`].
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Pass-through to [`ProviderService::update`].
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Pass-through to [`ProviderService::delete`].
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// validate → create → read. Returns the state after read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let created = self.create(resource_type, config).await?;
        Ok(self.read(resource_type, created).await?)
    }

    /// validate → update → read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let updated = self.update(resource_type, prior_state, config).await?;
        Ok(self.read(resource_type, updated).await?)
    }

    /// Full cycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update, before delete.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, TestError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a tester operation.
#[derive(Debug, Error)]
pub enum TestError {
    /// Error diagnostics were returned.
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The provider returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("Operation failed with {} diagnostic(s):\n", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
        out.push('\n');
    }
    out
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "Expected at least one error, but got none"
    );
}

/// Assert that some error's summary or detail contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matches = diagnostics.iter().any(|d| {
        matches!(d.severity, DiagnosticSeverity::Error)
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    });
    assert!(
        matches,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| (&d.summary, &d.detail))
            .collect::<Vec<_>>()
    );
}

/// Assert the state exists remotely and is in sync.
///
/// # Panics
///
/// Panics if `id` is missing or `synced` is not `true`.
pub fn assert_synced(state: &Value) {
    assert!(
        state["id"].as_str().is_some_and(|id| !id.is_empty()),
        "Expected a remote id, got {}",
        state["id"]
    );
    assert_eq!(state["synced"], Value::Bool(true), "Expected synced state: {}", state);
}

/// Assert a read observed an out-of-band modification.
///
/// # Panics
///
/// Panics if `synced` is not `false`.
pub fn assert_drifted(state: &Value) {
    assert_eq!(state["synced"], Value::Bool(false), "Expected drifted state: {}", state);
}

/// Assert a read observed an out-of-band deletion.
///
/// # Panics
///
/// Panics if `id` is still set.
pub fn assert_gone(state: &Value) {
    assert!(state["id"].is_null(), "Expected id to be cleared, got {}", state["id"]);
}
