//! `signalform_single_value_chart`: single value charts.

use super::common::{
    base_schema, color_scale_block, color_scale_options, max_delay_attribute, non_empty,
    null_default, program_text_attribute, publish_label_options, sanitize_program_text,
    seconds_to_millis, viz_options_block, ColorScale, ColorScaleOptions, ProgramOptions,
    PublishLabelOptions, VizOption,
};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SingleValueChartConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub program_text: String,
    #[serde(default)]
    pub unit_prefix: Option<String>,
    #[serde(default)]
    pub color_by: Option<String>,
    #[serde(default)]
    pub max_delay: Option<i64>,
    #[serde(default)]
    pub refresh_interval: Option<i64>,
    #[serde(default)]
    pub max_precision: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_timestamp_hidden: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub show_spark_line: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub color_scale: Vec<ColorScale>,
    #[serde(default, deserialize_with = "null_default")]
    pub viz_options: Vec<VizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleValueChartOptions {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<Vec<ColorScaleOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_options: Option<ProgramOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_precision: Option<i64>,
    pub timestamp_hidden: bool,
    pub show_spark_line: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_label_options: Option<Vec<PublishLabelOptions>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleValueChartPayload {
    pub name: String,
    pub description: String,
    pub program_text: String,
    pub options: SingleValueChartOptions,
}

impl SingleValueChartConfig {
    /// `colorBy` and `colorScale`. "Scale" without bands sends neither.
    fn coloring(&self) -> (Option<String>, Option<Vec<ColorScaleOptions>>) {
        match non_empty(&self.color_by) {
            Some(by) if by == "Scale" => match color_scale_options(&self.color_scale) {
                Some(scale) => (Some(by), Some(scale)),
                None => (None, None),
            },
            other => (other, None),
        }
    }
}

impl Declared for SingleValueChartConfig {
    type Payload = SingleValueChartPayload;

    fn payload(&self) -> Result<SingleValueChartPayload, ProviderError> {
        let (color_by, color_scale) = self.coloring();
        let program_options = seconds_to_millis(self.max_delay).map(|max_delay| ProgramOptions {
            max_delay: Some(max_delay),
            ..Default::default()
        });

        Ok(SingleValueChartPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            program_text: sanitize_program_text(&self.program_text),
            options: SingleValueChartOptions {
                chart_type: "SingleValue",
                unit_prefix: non_empty(&self.unit_prefix),
                color_by,
                color_scale,
                program_options,
                refresh_interval: seconds_to_millis(self.refresh_interval),
                maximum_precision: self.max_precision,
                timestamp_hidden: self.is_timestamp_hidden,
                show_spark_line: self.show_spark_line,
                publish_label_options: publish_label_options(&self.viz_options),
            },
        })
    }
}

/// Schema of `signalform_single_value_chart`.
pub fn schema(resource_url: Option<String>) -> Schema {
    base_schema(resource_url)
        .with_attribute("program_text", program_text_attribute())
        .with_attribute(
            "unit_prefix",
            Attribute::optional_string()
                .with_description("(Metric by default) Must be \"Metric\" or \"Binary\""),
        )
        .with_attribute(
            "color_by",
            Attribute::optional_string()
                .with_description("(Metric by default) Must be \"Metric\", \"Dimension\", or \"Scale\". \"Scale\" maps to Color by Value in the UI"),
        )
        .with_attribute("max_delay", max_delay_attribute())
        .with_attribute(
            "refresh_interval",
            Attribute::optional_int64().with_description("How often (in seconds) to refresh the value"),
        )
        .with_attribute(
            "max_precision",
            Attribute::optional_int64().with_description("The maximum precision to for values displayed in the list"),
        )
        .with_attribute(
            "is_timestamp_hidden",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Whether to hide the timestamp in the chart"),
        )
        .with_attribute(
            "show_spark_line",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Whether to show a trend line below the current value"),
        )
        .with_block("color_scale", color_scale_block())
        .with_block("viz_options", viz_options_block(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::encode;
    use crate::validation::validate;
    use serde_json::{json, Value};

    fn options(config: Value) -> Value {
        let body: Value =
            serde_json::from_slice(&encode::<SingleValueChartConfig>(&config).unwrap()).unwrap();
        body["options"].clone()
    }

    #[test]
    fn test_scale_coloring() {
        let options = options(json!({
            "name": "errors",
            "program_text": "x",
            "color_by": "Scale",
            "max_delay": 10,
            "refresh_interval": 5,
            "is_timestamp_hidden": true,
            "color_scale": [
                {"gt": 40.0, "color": "red"},
                {"lte": 40.0, "color": "magenta"}
            ]
        }));
        assert_eq!(
            options,
            json!({
                "type": "SingleValue",
                "colorBy": "Scale",
                "colorScale": [
                    {"gt": 40.0, "paletteIndex": 16},
                    {"lte": 40.0, "paletteIndex": 7}
                ],
                "programOptions": {"maxDelay": 10000},
                "refreshInterval": 5000,
                "timestampHidden": true,
                "showSparkLine": false
            })
        );
    }

    #[test]
    fn test_scale_without_bands_sends_no_coloring() {
        let options = options(json!({"name": "e", "program_text": "x", "color_by": "Scale"}));
        assert!(options.get("colorBy").is_none());
        assert!(options.get("colorScale").is_none());
        assert!(options.get("programOptions").is_none());
    }

    #[test]
    fn test_plain_coloring_ignores_scale() {
        let options = options(json!({
            "name": "e",
            "program_text": "x",
            "color_by": "Dimension",
            "color_scale": [{"gt": 1.0, "color": "red"}]
        }));
        assert_eq!(options["colorBy"], "Dimension");
        assert!(options.get("colorScale").is_none());
    }

    #[test]
    fn test_schema_validates_scale_colors() {
        let config = json!({
            "name": "e",
            "program_text": "x",
            "color_scale": [{"gt": 1.0, "color": "azure"}]
        });
        assert_eq!(validate(&schema(None), &config).len(), 1);
    }
}
