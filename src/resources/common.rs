//! Pieces shared by several resource mappers.

use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validation::{relative_time_millis, Validator};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::sync::LazyLock;

/// Publish-label palette; the position is the `paletteIndex`.
pub const PALETTE_COLORS: [&str; 16] = [
    "gray",
    "blue",
    "azure",
    "navy",
    "brown",
    "orange",
    "yellow",
    "magenta",
    "purple",
    "pink",
    "violet",
    "lilac",
    "iris",
    "emerald",
    "green",
    "aquamarine",
];

/// Colours for scales and ranges; the position is the `paletteIndex`.
pub const CHART_COLORS: [&str; 21] = [
    "gray",
    "blue",
    "light_blue",
    "navy",
    "dark_orange",
    "orange",
    "dark_yellow",
    "magenta",
    "cerise",
    "pink",
    "violet",
    "purple",
    "gray_blue",
    "dark_green",
    "green",
    "aquamarine",
    "red",
    "yellow",
    "vivid_yellow",
    "light_green",
    "lime_green",
];

/// Palette index of a publish-label colour.
pub fn palette_index(color: &str) -> Option<usize> {
    PALETTE_COLORS.iter().position(|c| *c == color)
}

/// Palette index of a chart colour; unknown names map to 0.
pub fn chart_color_index(color: &str) -> usize {
    CHART_COLORS.iter().position(|c| *c == color).unwrap_or(0)
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `Some` only for a non-empty string.
pub(crate) fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Collapse indentation after newlines and strip leading whitespace.
///
/// SignalFx rejects some programs that only differ by indentation, which
/// heredocs in configuration files produce.
pub fn sanitize_program_text(text: &str) -> String {
    static INDENT: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\n[\t\n\x0B\x0C\r ]+").expect("INDENT is a valid regex pattern")
    });
    static LEADING: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[\t\n\x0B\x0C\r ]+").expect("LEADING is a valid regex pattern")
    });

    let sane = INDENT.replace_all(text, "\n");
    LEADING.replace(&sane, "").into_owned()
}

/// Map the friendly legend names onto SignalFx property names.
pub fn legend_property(name: &str) -> String {
    match name {
        "metric" => "sf_originatingMetric".to_string(),
        "plot_label" | "Plot Label" => "sf_metric".to_string(),
        other => other.to_string(),
    }
}

/// One hidden legend column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendField {
    /// SignalFx property name.
    pub property: String,
    /// Always false: the field is hidden.
    pub enabled: bool,
}

/// `legendOptions` of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendOptions {
    /// Hidden fields.
    pub fields: Vec<LegendField>,
}

/// Legend options hiding `fields`, or `None` when nothing is hidden.
pub fn legend_options(fields: &[String]) -> Option<LegendOptions> {
    if fields.is_empty() {
        return None;
    }
    Some(LegendOptions {
        fields: fields
            .iter()
            .map(|f| LegendField {
                property: legend_property(f),
                enabled: false,
            })
            .collect(),
    })
}

/// `programOptions` of a chart. Durations are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_resolution: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_sampling: Option<bool>,
}

impl ProgramOptions {
    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.minimum_resolution.is_none() && self.max_delay.is_none() && self.disable_sampling.is_none()
    }
}

/// Seconds to milliseconds.
pub fn seconds_to_millis(seconds: Option<i64>) -> Option<i64> {
    seconds.map(|s| s * 1000)
}

/// Visualisation time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeWindow {
    /// Trailing window of `range` milliseconds.
    Relative {
        /// Length in milliseconds.
        range: i64,
    },
    /// Fixed window, epoch milliseconds.
    Absolute {
        /// Start, epoch milliseconds.
        start: i64,
        /// End, epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<i64>,
    },
}

impl TimeWindow {
    /// Window from the declared `time_range` / `start_time` / `end_time` (seconds).
    ///
    /// An absolute start wins over a relative range.
    pub fn from_declared(
        time_range: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Option<Self> {
        if let Some(start) = start_time {
            return Some(Self::Absolute {
                start: start * 1000,
                end: end_time.map(|e| e * 1000),
            });
        }
        time_range
            .and_then(relative_time_millis)
            .map(|range| Self::Relative { range })
    }
}

/// Declared per publish-label options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VizOption {
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub axis: Option<String>,
    #[serde(default)]
    pub plot_type: Option<String>,
    #[serde(default)]
    pub value_unit: Option<String>,
    #[serde(default)]
    pub value_prefix: Option<String>,
    #[serde(default)]
    pub value_suffix: Option<String>,
}

/// `publishLabelOptions` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishLabelOptions {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_prefix: Option<String>,
}

impl From<&VizOption> for PublishLabelOptions {
    fn from(viz: &VizOption) -> Self {
        Self {
            label: viz.label.clone(),
            palette_index: viz.color.as_deref().and_then(palette_index),
            plot_type: non_empty(&viz.plot_type),
            y_axis: non_empty(&viz.axis).map(|axis| u8::from(axis == "right")),
            value_unit: non_empty(&viz.value_unit),
            value_suffix: non_empty(&viz.value_suffix),
            value_prefix: non_empty(&viz.value_prefix),
        }
    }
}

/// `publishLabelOptions` for every declared label.
pub fn publish_label_options(viz: &[VizOption]) -> Option<Vec<PublishLabelOptions>> {
    if viz.is_empty() {
        None
    } else {
        Some(viz.iter().map(PublishLabelOptions::from).collect())
    }
}

/// Declared colour scale band.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorScale {
    #[serde(default)]
    pub gt: Option<f64>,
    #[serde(default)]
    pub gte: Option<f64>,
    #[serde(default)]
    pub lt: Option<f64>,
    #[serde(default)]
    pub lte: Option<f64>,
    pub color: String,
}

/// Colour scale band as sent to SignalFx.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScaleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    pub palette_index: usize,
}

impl From<&ColorScale> for ColorScaleOptions {
    fn from(scale: &ColorScale) -> Self {
        Self {
            gt: scale.gt,
            gte: scale.gte,
            lt: scale.lt,
            lte: scale.lte,
            palette_index: chart_color_index(&scale.color),
        }
    }
}

/// Colour scale bands, or `None` when none are declared.
pub fn color_scale_options(scales: &[ColorScale]) -> Option<Vec<ColorScaleOptions>> {
    if scales.is_empty() {
        None
    } else {
        Some(scales.iter().map(ColorScaleOptions::from).collect())
    }
}

/// Attributes every resource kind carries.
pub fn base_schema(resource_url: Option<String>) -> Schema {
    let schema = Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("SignalFx id of the object"),
        )
        .with_attribute(
            "synced",
            Attribute::optional_bool()
                .with_default(json!(true))
                .with_description(
                    "Whether the resource in SignalForm and SignalFx are identical or not. Used internally for syncing.",
                ),
        )
        .with_attribute(
            "last_updated",
            Attribute::computed_float64().with_description("Latest timestamp the resource was updated"),
        )
        .with_attribute("url", Attribute::computed_string().with_description("UI url of the object"))
        .with_attribute("name", Attribute::required_string().with_description("Name of the object"))
        .with_attribute(
            "description",
            Attribute::optional_string().with_description("Description of the object"),
        );

    match resource_url {
        Some(template) => schema.with_attribute(
            "resource_url",
            Attribute::optional_string()
                .with_default(json!(template))
                .with_description("UI url template, `<id>` is replaced with the object id"),
        ),
        None => schema,
    }
}

/// Required SignalFlow `program_text`.
pub fn program_text_attribute() -> Attribute {
    Attribute::required_string()
        .with_description("SignalFlow program text. More info at \"https://developers.signalfx.com/docs/signalflow-overview\"")
}

/// `max_delay` in seconds, capped at 900.
pub fn max_delay_attribute() -> Attribute {
    Attribute::optional_int64()
        .with_validator(Validator::MaxDelay)
        .with_description("How long (in seconds) to wait for late datapoints. Max value 900s (15m)")
}

/// Add `time_range`, `start_time` and `end_time`.
pub fn with_time_attributes(schema: Schema) -> Schema {
    schema
        .with_attribute(
            "time_range",
            Attribute::optional_string()
                .with_validator(Validator::RelativeTime)
                .conflicts_with(&["start_time", "end_time"])
                .with_description("From when to display data. SignalFx time syntax (e.g. -5m, -1h)"),
        )
        .with_attribute(
            "start_time",
            Attribute::optional_int64()
                .conflicts_with(&["time_range"])
                .with_description("Seconds since epoch to start the visualization"),
        )
        .with_attribute(
            "end_time",
            Attribute::optional_int64()
                .conflicts_with(&["time_range"])
                .with_description("Seconds since epoch to end the visualization"),
        )
}

/// `viz_options` block; time charts also allow `axis` and `plot_type`.
pub fn viz_options_block(with_axis_and_plot_type: bool) -> NestedBlock {
    let mut block = Block::new()
        .with_attribute(
            "label",
            Attribute::required_string()
                .with_description("The label used in the publish statement that displays the plot"),
        )
        .with_attribute(
            "color",
            Attribute::optional_string().with_validator(Validator::PaletteColor),
        )
        .with_attribute(
            "value_unit",
            Attribute::optional_string().with_validator(Validator::ValueUnit),
        )
        .with_attribute("value_prefix", Attribute::optional_string())
        .with_attribute("value_suffix", Attribute::optional_string());
    if with_axis_and_plot_type {
        block = block
            .with_attribute("axis", Attribute::optional_string().with_validator(Validator::Axis))
            .with_attribute(
                "plot_type",
                Attribute::optional_string().with_validator(Validator::PlotType),
            );
    }
    NestedBlock::set(block.with_description("Plot-level customization options, associated with a publish statement"))
}

/// `color_scale` block.
pub fn color_scale_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute("gt", Attribute::optional_float64())
            .with_attribute("gte", Attribute::optional_float64())
            .with_attribute("lt", Attribute::optional_float64())
            .with_attribute("lte", Attribute::optional_float64())
            .with_attribute(
                "color",
                Attribute::required_string().with_validator(Validator::ChartColor),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_program_text_keeps_sane_text() {
        let text = "previous = data('statmonster.inbound_lines').timeshift('2m').sum()\nsignal = data('x    y').sum()\ndetect('low', when(signal < previous * 0.5))";
        assert_eq!(sanitize_program_text(text), text);
    }

    #[test]
    fn test_sanitize_program_text() {
        let text = "\tprevious = data('a').sum()\n\n\tsignal = data('b    c').sum()\n\n\n\tdetect('low', when(signal < previous))";
        let sane = "previous = data('a').sum()\nsignal = data('b    c').sum()\ndetect('low', when(signal < previous))";
        assert_eq!(sanitize_program_text(text), sane);
        assert_eq!(sanitize_program_text("\x0B\x0C x\n \ty"), "x\ny");
    }

    #[test]
    fn test_chart_color_index() {
        assert_eq!(chart_color_index("magenta"), 7);
        assert_eq!(chart_color_index("lime_green"), 20);
        assert_eq!(chart_color_index("unknown"), 0);
        assert_eq!(palette_index("azure"), Some(2));
        assert_eq!(palette_index("aquamarine"), Some(15));
        assert_eq!(palette_index("light_blue"), None);
    }

    #[test]
    fn test_color_scale_skips_unset_bounds() {
        let scale = ColorScale {
            gt: Some(0.0),
            lte: Some(10.0),
            color: "magenta".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(color_scale_options(&[scale]).unwrap()).unwrap();
        assert_eq!(value, json!([{"gt": 0.0, "lte": 10.0, "paletteIndex": 7}]));
        assert!(color_scale_options(&[]).is_none());
    }

    #[test]
    fn test_legend_options() {
        let fields = vec![
            "metric".to_string(),
            "plot_label".to_string(),
            "Plot Label".to_string(),
            "host".to_string(),
        ];
        let value = serde_json::to_value(legend_options(&fields).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"fields": [
                {"property": "sf_originatingMetric", "enabled": false},
                {"property": "sf_metric", "enabled": false},
                {"property": "sf_metric", "enabled": false},
                {"property": "host", "enabled": false}
            ]})
        );
        assert!(legend_options(&[]).is_none());
    }

    #[test]
    fn test_time_window() {
        assert_eq!(
            serde_json::to_value(TimeWindow::from_declared(Some("-15m"), None, None)).unwrap(),
            json!({"type": "relative", "range": 900000})
        );
        assert_eq!(
            serde_json::to_value(TimeWindow::from_declared(None, Some(10), Some(20))).unwrap(),
            json!({"type": "absolute", "start": 10000, "end": 20000})
        );
        assert_eq!(
            serde_json::to_value(TimeWindow::from_declared(None, Some(10), None)).unwrap(),
            json!({"type": "absolute", "start": 10000})
        );
        assert_eq!(TimeWindow::from_declared(Some("-5M"), None, None), None);
        assert_eq!(TimeWindow::from_declared(None, None, Some(20)), None);
    }

    #[test]
    fn test_publish_label_options() {
        let viz = VizOption {
            label: "A".to_string(),
            color: Some("azure".to_string()),
            axis: Some("right".to_string()),
            plot_type: Some(String::new()),
            value_unit: Some("Byte".to_string()),
            ..Default::default()
        };
        let left = VizOption {
            label: "B".to_string(),
            axis: Some("left".to_string()),
            color: Some("not-a-color".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(publish_label_options(&[viz, left]).unwrap()).unwrap();
        assert_eq!(
            value,
            json!([
                {"label": "A", "paletteIndex": 2, "yAxis": 1, "valueUnit": "Byte"},
                {"label": "B", "yAxis": 0}
            ])
        );
    }

    #[test]
    fn test_base_schema_resource_url_default() {
        let schema = base_schema(Some("https://app/#/chart/<id>".to_string()));
        assert_eq!(
            schema.block.attributes["resource_url"].default,
            Some(json!("https://app/#/chart/<id>"))
        );
        assert!(schema.block.attributes["name"].flags.required);
        assert!(!base_schema(None).block.attributes.contains_key("resource_url"));
    }
}
