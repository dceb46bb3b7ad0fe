//! `signalform_heatmap_chart`: heatmap charts.

use super::common::{
    base_schema, color_scale_block, color_scale_options, max_delay_attribute, non_empty,
    null_default, program_text_attribute, sanitize_program_text, seconds_to_millis, ColorScale,
    ColorScaleOptions, ProgramOptions,
};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Declared colour range.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ColorRange {
    #[serde(default, rename(serialize = "min"), skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, rename(serialize = "max"), skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Split `+prop` / `-prop` into the property and its direction.
pub fn split_sort_by(sort_by: &str) -> Option<(String, SortDirection)> {
    if let Some(property) = sort_by.strip_prefix('+') {
        Some((property.to_string(), SortDirection::Ascending))
    } else {
        sort_by
            .strip_prefix('-')
            .map(|property| (property.to_string(), SortDirection::Descending))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeatmapChartConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub program_text: String,
    #[serde(default)]
    pub unit_prefix: Option<String>,
    #[serde(default)]
    pub minimum_resolution: Option<i64>,
    #[serde(default)]
    pub max_delay: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub disable_sampling: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub color_range: Vec<ColorRange>,
    #[serde(default, deserialize_with = "null_default")]
    pub color_scale: Vec<ColorScale>,
    #[serde(default, deserialize_with = "null_default")]
    pub hide_timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapChartOptions {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_prefix: Option<String>,
    pub program_options: ProgramOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_range: Option<ColorRange>,
    #[serde(rename = "colorScale2", skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<Vec<ColorScaleOptions>>,
    pub timestamp_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapChartPayload {
    pub name: String,
    pub description: String,
    pub program_text: String,
    pub options: HeatmapChartOptions,
}

impl Declared for HeatmapChartConfig {
    type Payload = HeatmapChartPayload;

    fn payload(&self) -> Result<HeatmapChartPayload, ProviderError> {
        let sort = non_empty(&self.sort_by).and_then(|s| split_sort_by(&s));
        let (sort_property, sort_direction) = match sort {
            Some((property, direction)) => (Some(property), Some(direction)),
            None => (None, None),
        };

        // A colour range takes precedence over a scale.
        let color_range = self.color_range.first().cloned();
        let color_scale = match color_range {
            Some(_) => None,
            None => color_scale_options(&self.color_scale),
        };
        let color_by = if color_range.is_some() {
            Some("Range")
        } else if color_scale.is_some() {
            Some("Scale")
        } else {
            None
        };

        Ok(HeatmapChartPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            program_text: sanitize_program_text(&self.program_text),
            options: HeatmapChartOptions {
                chart_type: "Heatmap",
                unit_prefix: non_empty(&self.unit_prefix),
                program_options: ProgramOptions {
                    minimum_resolution: seconds_to_millis(self.minimum_resolution),
                    max_delay: seconds_to_millis(self.max_delay),
                    disable_sampling: Some(self.disable_sampling),
                },
                group_by: (!self.group_by.is_empty()).then(|| self.group_by.clone()),
                sort_property,
                sort_direction,
                color_by,
                color_range,
                color_scale,
                timestamp_hidden: self.hide_timestamp,
            },
        })
    }
}

/// Schema of `signalform_heatmap_chart`.
pub fn schema(resource_url: Option<String>) -> Schema {
    let color_range = Block::new()
        .with_attribute(
            "min_value",
            Attribute::optional_float64().with_description("The minimum value within the coloring range"),
        )
        .with_attribute(
            "max_value",
            Attribute::optional_float64().with_description("The maximum value within the coloring range"),
        )
        .with_attribute(
            "color",
            Attribute::required_string()
                .with_validator(Validator::ChartColor)
                .with_description("The color range to use"),
        );

    base_schema(resource_url)
        .with_attribute("program_text", program_text_attribute())
        .with_attribute(
            "unit_prefix",
            Attribute::optional_string()
                .with_description("(Metric by default) Must be \"Metric\" or \"Binary\""),
        )
        .with_attribute(
            "minimum_resolution",
            Attribute::optional_int64()
                .with_description("The minimum resolution (in seconds) to use for computing the underlying program"),
        )
        .with_attribute("max_delay", max_delay_attribute())
        .with_attribute(
            "disable_sampling",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) If false, samples a subset of the output MTS, which improves UI performance"),
        )
        .with_attribute(
            "group_by",
            Attribute::optional_string_list().with_description("Properties to group by in the heatmap (in nesting order)"),
        )
        .with_attribute(
            "sort_by",
            Attribute::optional_string()
                .with_validator(Validator::SortBy)
                .with_description("The property to use when sorting the elements. Must be prepended with + for ascending or - for descending (e.g. -foo)"),
        )
        .with_attribute(
            "hide_timestamp",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Whether to show the timestamp in the chart"),
        )
        .with_block(
            "color_range",
            NestedBlock::set(color_range.with_description("Values and color for the color range"))
                .with_max_items(1),
        )
        .with_block("color_scale", color_scale_block())
}
