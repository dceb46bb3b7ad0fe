//! `signalform_time_chart`: time series charts.

use super::common::{
    base_schema, legend_options, legend_property, max_delay_attribute, non_empty, null_default,
    program_text_attribute, publish_label_options, sanitize_program_text, seconds_to_millis,
    viz_options_block, with_time_attributes, LegendOptions, ProgramOptions, PublishLabelOptions,
    TimeWindow, VizOption,
};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Declared Y axis. Unset bounds and watermarks are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AxisConfig {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub high_watermark: Option<f64>,
    #[serde(default)]
    pub high_watermark_label: Option<String>,
    #[serde(default)]
    pub low_watermark: Option<f64>,
    #[serde(default)]
    pub low_watermark_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub high_watermark: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_watermark_label: Option<String>,
    pub low_watermark: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_watermark_label: Option<String>,
}

impl From<&AxisConfig> for AxisOptions {
    fn from(axis: &AxisConfig) -> Self {
        Self {
            min: axis.min_value,
            max: axis.max_value,
            label: axis.label.clone(),
            high_watermark: axis.high_watermark,
            high_watermark_label: axis.high_watermark_label.clone(),
            low_watermark: axis.low_watermark,
            low_watermark_label: axis.low_watermark_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMarkers {
    pub show_data_markers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChartLegendOptions {
    pub show_legend: bool,
    pub dimension_in_legend: String,
}

/// Declared time chart.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeChartConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub program_text: String,
    #[serde(default)]
    pub unit_prefix: Option<String>,
    #[serde(default)]
    pub color_by: Option<String>,
    #[serde(default)]
    pub minimum_resolution: Option<i64>,
    #[serde(default)]
    pub max_delay: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub disable_sampling: bool,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub axis_left: Vec<AxisConfig>,
    #[serde(default, deserialize_with = "null_default")]
    pub axis_right: Vec<AxisConfig>,
    #[serde(default)]
    pub axes_precision: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub axes_include_zero: bool,
    #[serde(default)]
    pub on_chart_legend_dimension: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub legend_fields_to_hide: Vec<String>,
    #[serde(default)]
    pub show_event_lines: Option<bool>,
    #[serde(default, deserialize_with = "null_default")]
    pub show_data_markers: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub stacked: bool,
    #[serde(default)]
    pub plot_type: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub viz_options: Vec<VizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChartOptions {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_event_lines: Option<bool>,
    pub stacked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_plot_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_zero: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_options: Option<ProgramOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_chart_options: Option<DataMarkers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_chart_options: Option<DataMarkers>,
    /// `[left, right]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<[Option<AxisOptions>; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_options: Option<LegendOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_label_options: Option<Vec<PublishLabelOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chart_legend_options: Option<OnChartLegendOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChartPayload {
    pub name: String,
    pub description: String,
    pub program_text: String,
    pub options: TimeChartOptions,
}

impl TimeChartConfig {
    fn axes(&self) -> Option<[Option<AxisOptions>; 2]> {
        let left = self.axis_left.first().map(AxisOptions::from);
        let right = self.axis_right.first().map(AxisOptions::from);
        (left.is_some() || right.is_some()).then_some([left, right])
    }
}

impl Declared for TimeChartConfig {
    type Payload = TimeChartPayload;

    fn payload(&self) -> Result<TimeChartPayload, ProviderError> {
        let program_options = ProgramOptions {
            minimum_resolution: seconds_to_millis(self.minimum_resolution),
            max_delay: seconds_to_millis(self.max_delay),
            disable_sampling: self.disable_sampling.then_some(true),
        };

        let plot_type = non_empty(&self.plot_type);
        let markers = DataMarkers {
            show_data_markers: self.show_data_markers,
        };
        let (line_chart_options, area_chart_options) = match plot_type.as_deref() {
            None | Some("LineChart") => (Some(markers), None),
            Some("AreaChart") => (None, Some(markers)),
            Some(_) => (None, None),
        };

        let options = TimeChartOptions {
            chart_type: "TimeSeriesChart",
            unit_prefix: non_empty(&self.unit_prefix),
            color_by: non_empty(&self.color_by),
            show_event_lines: self.show_event_lines,
            stacked: self.stacked,
            default_plot_type: plot_type,
            axis_precision: self.axes_precision.filter(|p| *p != 0),
            include_zero: self.axes_include_zero.then_some(true),
            program_options: (!program_options.is_empty()).then_some(program_options),
            time: TimeWindow::from_declared(self.time_range.as_deref(), self.start_time, self.end_time),
            line_chart_options,
            area_chart_options,
            axes: self.axes(),
            legend_options: legend_options(&self.legend_fields_to_hide),
            publish_label_options: publish_label_options(&self.viz_options),
            on_chart_legend_options: non_empty(&self.on_chart_legend_dimension).map(|dimension| {
                OnChartLegendOptions {
                    show_legend: true,
                    dimension_in_legend: legend_property(&dimension),
                }
            }),
        };

        Ok(TimeChartPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            program_text: sanitize_program_text(&self.program_text),
            options,
        })
    }
}

fn axis_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute(
                "min_value",
                Attribute::optional_float64().with_description("The minimum value for the axis"),
            )
            .with_attribute(
                "max_value",
                Attribute::optional_float64().with_description("The maximum value for the axis"),
            )
            .with_attribute("label", Attribute::optional_string().with_description("Label of the axis"))
            .with_attribute(
                "high_watermark",
                Attribute::optional_float64().with_description("A line to draw as a high watermark"),
            )
            .with_attribute(
                "high_watermark_label",
                Attribute::optional_string().with_description("A label to attach to the high watermark line"),
            )
            .with_attribute(
                "low_watermark",
                Attribute::optional_float64().with_description("A line to draw as a low watermark"),
            )
            .with_attribute(
                "low_watermark_label",
                Attribute::optional_string().with_description("A label to attach to the low watermark line"),
            ),
    )
    .with_max_items(1)
}

/// Schema of `signalform_time_chart`.
pub fn schema(resource_url: Option<String>) -> Schema {
    let schema = base_schema(resource_url)
        .with_attribute("program_text", program_text_attribute())
        .with_attribute(
            "unit_prefix",
            Attribute::optional_string()
                .with_description("(Metric by default) Must be \"Metric\" or \"Binary\""),
        )
        .with_attribute(
            "color_by",
            Attribute::optional_string()
                .with_description("(Dimension by default) Must be \"Dimension\" or \"Metric\""),
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
            "axes_precision",
            Attribute::optional_int64()
                .with_description("Force a specific number of significant digits in the y-axis"),
        )
        .with_attribute(
            "axes_include_zero",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Force y-axes to always show zero"),
        )
        .with_attribute(
            "on_chart_legend_dimension",
            Attribute::optional_string()
                .with_description("Dimension to show in the on-chart legend. On-chart legend is off unless a dimension is specified"),
        )
        .with_attribute(
            "legend_fields_to_hide",
            Attribute::optional_string_set()
                .with_description("List of properties that shouldn't be displayed in the chart legend (i.e. dimension names)"),
        )
        .with_attribute(
            "show_event_lines",
            Attribute::optional_bool()
                .with_description("(false by default) Whether vertical highlight lines should be drawn in the visualizations at times when events occurred"),
        )
        .with_attribute(
            "show_data_markers",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Show markers (circles) for each datapoint used to draw line or area charts"),
        )
        .with_attribute(
            "stacked",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Whether area and bar charts in the visualization should be stacked"),
        )
        .with_attribute(
            "plot_type",
            Attribute::optional_string()
                .with_validator(Validator::PlotType)
                .with_description("(LineChart by default) The default plot display style for the visualization"),
        )
        .with_block("axis_left", axis_block())
        .with_block("axis_right", axis_block())
        .with_block("viz_options", viz_options_block(true));
    with_time_attributes(schema)
}
