//! `signalform_dashboard_group`: groups owning dashboards.
//!
//! Membership is tracked from the dashboard side, so the group always sends
//! an empty `dashboards` list. Groups have no UI url.

use super::common::{base_schema, null_default};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardGroupConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardGroupPayload {
    pub name: String,
    pub description: String,
    pub dashboards: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

impl Declared for DashboardGroupConfig {
    type Payload = DashboardGroupPayload;

    fn payload(&self) -> Result<DashboardGroupPayload, ProviderError> {
        Ok(DashboardGroupPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            dashboards: Vec::new(),
            teams: (!self.teams.is_empty()).then(|| self.teams.clone()),
        })
    }
}

/// Schema of `signalform_dashboard_group`.
pub fn schema() -> Schema {
    base_schema(None).with_attribute(
        "teams",
        Attribute::optional_string_list().with_description("Team IDs to associate the dashboard group to"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::encode;
    use serde_json::{json, Value};

    #[test]
    fn test_payload_sends_empty_dashboards() {
        let body: Value = serde_json::from_slice(
            &encode::<DashboardGroupConfig>(&json!({"name": "team", "teams": null})).unwrap(),
        )
        .unwrap();
        assert_eq!(body, json!({"name": "team", "description": "", "dashboards": []}));
    }

    #[test]
    fn test_payload_with_teams() {
        let body: Value = serde_json::from_slice(
            &encode::<DashboardGroupConfig>(&json!({"name": "team", "teams": ["A1"]})).unwrap(),
        )
        .unwrap();
        assert_eq!(body["teams"], json!(["A1"]));
    }
}
