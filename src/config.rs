//! Provider configuration and vendor endpoints.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};

/// Base URL of the SignalFx REST API.
pub const DEFAULT_API_URL: &str = "https://api.signalfx.com";

/// Base URL of the SignalFx web application.
pub const DEFAULT_APP_URL: &str = "https://app.signalfx.com";

/// Environment variable consulted when `auth_token` is not declared.
pub const AUTH_TOKEN_ENV: &str = "SFX_AUTH_TOKEN";

/// Body fragment SignalFx returns with a 404 for an object that was deleted.
///
/// The vendor does not document an error code for this case; the wording
/// is the only signal available.
pub const NOT_FOUND_MARKER: &str = " not found";

/// Placeholder substituted with the remote id in UI url templates.
pub const ID_PLACEHOLDER: &str = "<id>";

/// The declared `provider` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Explicit token. Wins over every file based source.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// REST API base, without the `/v2` suffix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Web application base used for the computed `url`.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            api_url: default_api_url(),
            app_url: default_app_url(),
        }
    }
}

impl ProviderConfig {
    /// Parse the host supplied configuration object.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::Configuration(format!("invalid provider config: {}", e)))
    }

    /// Fill `auth_token` from [`AUTH_TOKEN_ENV`] when it was not declared.
    pub fn with_env_defaults(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_defaults`](Self::with_env_defaults) with an injectable lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.explicit_token().is_none() {
            self.auth_token = lookup(AUTH_TOKEN_ENV).filter(|t| !t.is_empty());
        }
        self
    }

    /// The declared token, ignoring empty strings.
    pub fn explicit_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Endpoints derived from the configured base URLs.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api_url, &self.app_url)
    }
}

/// SignalFx object collections, one per REST path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// `/v2/chart`, shared by every chart kind.
    Chart,
    /// `/v2/detector`
    Detector,
    /// `/v2/dashboard`
    Dashboard,
    /// `/v2/dashboardgroup`
    DashboardGroup,
}

impl Collection {
    /// Path segment under `/v2`.
    pub fn path(self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Detector => "detector",
            Self::Dashboard => "dashboard",
            Self::DashboardGroup => "dashboardgroup",
        }
    }

    fn ui_fragment(self) -> Option<&'static str> {
        match self {
            Self::Chart => Some("/#/chart/<id>"),
            Self::Detector => Some("/#/detector/v2/<id>/edit"),
            Self::Dashboard => Some("/#/dashboard/<id>"),
            Self::DashboardGroup => None,
        }
    }
}

/// Resolved vendor URLs and the not-found contract used by read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_url: String,
    app_url: String,
    /// Body fragment identifying an out-of-band deletion on a 404.
    pub not_found_marker: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_APP_URL)
    }
}

impl Endpoints {
    /// Build endpoints from API and app base URLs.
    pub fn new(api_url: &str, app_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
            not_found_marker: NOT_FOUND_MARKER.to_string(),
        }
    }

    /// REST API base.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Collection URL used for POST.
    pub fn collection(&self, collection: Collection) -> String {
        format!("{}/v2/{}", self.api_url, collection.path())
    }

    /// Object URL used for GET, PUT and DELETE.
    pub fn item(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.collection(collection), id)
    }

    /// Default UI url template, containing [`ID_PLACEHOLDER`].
    pub fn ui_template(&self, collection: Collection) -> Option<String> {
        collection
            .ui_fragment()
            .map(|fragment| format!("{}{}", self.app_url, fragment))
    }
}

/// Substitute the first `<id>` in `template`.
pub fn render_url(template: &str, id: &str) -> String {
    template.replacen(ID_PLACEHOLDER, id, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.collection(Collection::Chart),
            "https://api.signalfx.com/v2/chart"
        );
        assert_eq!(
            endpoints.item(Collection::DashboardGroup, "G1"),
            "https://api.signalfx.com/v2/dashboardgroup/G1"
        );
        assert_eq!(
            endpoints.ui_template(Collection::Detector).as_deref(),
            Some("https://app.signalfx.com/#/detector/v2/<id>/edit")
        );
        assert_eq!(endpoints.ui_template(Collection::DashboardGroup), None);
        assert_eq!(endpoints.not_found_marker, " not found");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let endpoints = Endpoints::new("http://127.0.0.1:9000/", "http://app/");
        assert_eq!(
            endpoints.collection(Collection::Detector),
            "http://127.0.0.1:9000/v2/detector"
        );
        assert_eq!(
            endpoints.ui_template(Collection::Dashboard).as_deref(),
            Some("http://app/#/dashboard/<id>")
        );
    }

    #[test]
    fn test_render_url_replaces_first_placeholder() {
        assert_eq!(
            render_url("https://app.signalfx.com/#/chart/<id>", "abc"),
            "https://app.signalfx.com/#/chart/abc"
        );
        assert_eq!(render_url("<id>/<id>", "x"), "x/<id>");
    }

    #[test]
    fn test_from_value_defaults() {
        let config = ProviderConfig::from_value(&json!({})).unwrap();
        assert_eq!(config, ProviderConfig::default());

        let config = ProviderConfig::from_value(&serde_json::Value::Null).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);

        let err = ProviderConfig::from_value(&json!({"auth_token": 5})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_env_fallback_only_when_undeclared() {
        let lookup = |key: &str| (key == AUTH_TOKEN_ENV).then(|| "from-env".to_string());

        let config = ProviderConfig::default().with_env_lookup(lookup);
        assert_eq!(config.explicit_token(), Some("from-env"));

        let declared = ProviderConfig {
            auth_token: Some("declared".to_string()),
            ..Default::default()
        }
        .with_env_lookup(lookup);
        assert_eq!(declared.explicit_token(), Some("declared"));

        let empty = ProviderConfig {
            auth_token: Some(String::new()),
            ..Default::default()
        }
        .with_env_lookup(|_| Some(String::new()));
        assert_eq!(empty.explicit_token(), None);
    }
}
