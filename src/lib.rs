//! SignalForm provider
//!
//! Manages SignalFx monitoring objects (charts, detectors, dashboards and
//! dashboard groups) from declared configuration. A host drives the
//! provider through [`ProviderService`]: it configures it once, validates
//! declared resources, then creates, reads, updates and deletes them.
//!
//! # Overview
//!
//! - **Configuration**: [`ProviderConfig`] plus the credential chain in
//!   [`credentials`] (`/etc/signalfx.conf`, `~/.signalfx.conf`, netrc, then
//!   an explicit `auth_token` or `SFX_AUTH_TOKEN`)
//! - **Resources**: one mapping per kind in [`resources`], from the declared
//!   attributes to the vendor JSON payload
//! - **Lifecycle**: the create/read/update/delete protocol shared by every
//!   kind, including drift detection through `lastUpdated`
//! - **Schemas and validation**: declared attribute shapes and the checks
//!   run before anything reaches the network
//! - **Logging**: integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use signalform_provider::{init_logging, ProviderService, SignalformProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = SignalformProvider::from_environment()?;
//!     provider.configure(json!({"auth_token": "abc123"})).await?;
//!
//!     let state = provider
//!         .create(
//!             "signalform_time_chart",
//!             json!({
//!                 "name": "CPU",
//!                 "program_text": "data('cpu.utilization').publish(label='A')",
//!                 "plot_type": "LineChart",
//!             }),
//!         )
//!         .await?;
//!     println!("created {}", state["url"]);
//!     Ok(())
//! }
//! ```
//!
//! # Drift
//!
//! Each state remembers the vendor's `lastUpdated` timestamp. A read that
//! finds the remote object newer than that (beyond [`lifecycle::OFFSET`])
//! marks the state `synced = false`, which forces the host to plan an
//! update. A read that finds the object gone clears `id`, which forces a
//! recreate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod provider;
#[allow(missing_docs)]
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod transport;
pub mod validation;

// Re-export main types at crate root
pub use config::{Collection, Endpoints, ProviderConfig};
pub use credentials::CredentialSources;
pub use error::ProviderError;
pub use lifecycle::{Lifecycle, ReadOutcome, ResourceState};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::SignalformProvider;
pub use resources::ResourceKind;
pub use schema::{Diagnostic, ProviderSchema, Schema};
pub use service::ProviderService;
pub use transport::Transport;
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
