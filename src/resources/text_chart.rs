//! `signalform_text_chart`: markdown text notes. No program text.

use super::common::{base_schema, non_empty};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextChartConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChartOptions {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChartPayload {
    pub name: String,
    pub description: String,
    pub options: TextChartOptions,
}

impl Declared for TextChartConfig {
    type Payload = TextChartPayload;

    fn payload(&self) -> Result<TextChartPayload, ProviderError> {
        Ok(TextChartPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            options: TextChartOptions {
                chart_type: "Text",
                markdown: non_empty(&self.markdown),
            },
        })
    }
}

/// Schema of `signalform_text_chart`.
pub fn schema(resource_url: Option<String>) -> Schema {
    base_schema(resource_url).with_attribute(
        "markdown",
        Attribute::optional_string().with_description("Markdown text to display"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::encode;
    use serde_json::{json, Value};

    #[test]
    fn test_payload() {
        let body: Value = serde_json::from_slice(
            &encode::<TextChartConfig>(&json!({
                "name": "notes",
                "description": "runbook",
                "markdown": "**on call**: #ops"
            }))
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({
                "name": "notes",
                "description": "runbook",
                "options": {"type": "Text", "markdown": "**on call**: #ops"}
            })
        );
    }

    #[test]
    fn test_payload_without_markdown() {
        let body: Value =
            serde_json::from_slice(&encode::<TextChartConfig>(&json!({"name": "n", "markdown": null})).unwrap())
                .unwrap();
        assert_eq!(body["options"], json!({"type": "Text"}));
        assert!(body.get("programText").is_none());
    }
}
