//! `signalform_list_chart`: list charts.

use super::common::{
    base_schema, legend_options, max_delay_attribute, non_empty, null_default,
    program_text_attribute, publish_label_options, sanitize_program_text, seconds_to_millis,
    viz_options_block, LegendOptions, ProgramOptions, PublishLabelOptions, VizOption,
};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListChartConfig {
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
    #[serde(default, deserialize_with = "null_default")]
    pub disable_sampling: bool,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub refresh_interval: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub legend_fields_to_hide: Vec<String>,
    #[serde(default)]
    pub max_precision: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub viz_options: Vec<VizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChartOptions {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,
    pub program_options: ProgramOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_options: Option<LegendOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_label_options: Option<Vec<PublishLabelOptions>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChartPayload {
    pub name: String,
    pub description: String,
    pub program_text: String,
    pub options: ListChartOptions,
}

impl Declared for ListChartConfig {
    type Payload = ListChartPayload;

    fn payload(&self) -> Result<ListChartPayload, ProviderError> {
        Ok(ListChartPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            program_text: sanitize_program_text(&self.program_text),
            options: ListChartOptions {
                chart_type: "List",
                unit_prefix: non_empty(&self.unit_prefix),
                color_by: non_empty(&self.color_by),
                program_options: ProgramOptions {
                    minimum_resolution: None,
                    max_delay: seconds_to_millis(self.max_delay),
                    disable_sampling: Some(self.disable_sampling),
                },
                sort_by: non_empty(&self.sort_by),
                refresh_interval: seconds_to_millis(self.refresh_interval),
                maximum_precision: self.max_precision,
                legend_options: legend_options(&self.legend_fields_to_hide),
                publish_label_options: publish_label_options(&self.viz_options),
            },
        })
    }
}

/// Schema of `signalform_list_chart`.
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
                .with_description("(Metric by default) Must be \"Metric\" or \"Dimension\""),
        )
        .with_attribute("max_delay", max_delay_attribute())
        .with_attribute(
            "disable_sampling",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) If false, samples a subset of the output MTS, which improves UI performance"),
        )
        .with_attribute(
            "sort_by",
            Attribute::optional_string()
                .with_validator(Validator::SortBy)
                .with_description("The property to use when sorting the elements. Use 'value' if you want to sort by value. Must be prepended with + for ascending or - for descending (e.g. -foo)"),
        )
        .with_attribute(
            "refresh_interval",
            Attribute::optional_int64().with_description("How often (in seconds) to refresh the values of the list"),
        )
        .with_attribute(
            "legend_fields_to_hide",
            Attribute::optional_string_set()
                .with_description("List of properties that shouldn't be displayed in the chart legend (i.e. dimension names)"),
        )
        .with_attribute(
            "max_precision",
            Attribute::optional_int64().with_description("Maximum number of digits to display when values are shown"),
        )
        .with_block("viz_options", viz_options_block(false))
}
