//! `signalform_dashboard`: dashboards and their chart layouts.
//!
//! Charts can be placed three ways, all flattened into one `charts` list:
//! explicit `chart` blocks, `column` blocks stacking charts downwards, and
//! `grid` blocks filling rows left to right and wrapping on the 12 column
//! boundary.

use super::common::{base_schema, non_empty, null_default};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Columns in a dashboard row.
pub const DASHBOARD_COLUMNS: i64 = 12;

const DEFAULT_WIDTH: i64 = DASHBOARD_COLUMNS;
const DEFAULT_HEIGHT: i64 = 1;

/// Explicitly placed chart.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartConfig {
    /// Id of the chart to place.
    pub chart_id: String,
    /// Row, from 0 at the top.
    #[serde(default)]
    pub row: Option<i64>,
    /// Column, 0 to 11.
    #[serde(default)]
    pub column: Option<i64>,
    /// Width in columns, 12 when unset.
    #[serde(default)]
    pub width: Option<i64>,
    /// Height in rows, 1 when unset.
    #[serde(default)]
    pub height: Option<i64>,
}

/// Charts stacked in one column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColumnLayout {
    /// Charts, top to bottom.
    pub chart_ids: Vec<String>,
    /// Column shared by every chart.
    #[serde(default)]
    pub column: Option<i64>,
    /// Row of the first chart.
    #[serde(default)]
    pub start_row: Option<i64>,
    /// Width of every chart in columns.
    #[serde(default)]
    pub width: Option<i64>,
    /// Height of every chart in rows.
    #[serde(default)]
    pub height: Option<i64>,
}

/// Charts laid out row by row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridLayout {
    /// Charts, left to right then top to bottom.
    pub chart_ids: Vec<String>,
    /// Row of the first chart.
    #[serde(default)]
    pub start_row: Option<i64>,
    /// Column of the first chart.
    #[serde(default)]
    pub start_column: Option<i64>,
    /// Width of every chart in columns.
    #[serde(default)]
    pub width: Option<i64>,
    /// Height of every chart in rows.
    #[serde(default)]
    pub height: Option<i64>,
}

/// Position of one chart on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPlacement {
    /// Placed chart.
    pub chart_id: String,
    /// Row.
    pub row: i64,
    /// Column.
    pub column: i64,
    /// Height in rows.
    pub height: i64,
    /// Width in columns.
    pub width: i64,
}

impl From<&ChartConfig> for ChartPlacement {
    fn from(chart: &ChartConfig) -> Self {
        Self {
            chart_id: chart.chart_id.clone(),
            row: chart.row.unwrap_or_default(),
            column: chart.column.unwrap_or_default(),
            height: chart.height.unwrap_or(DEFAULT_HEIGHT),
            width: chart.width.unwrap_or(DEFAULT_WIDTH),
        }
    }
}

impl ColumnLayout {
    /// One chart per row starting at `start_row`.
    pub fn placements(&self) -> Vec<ChartPlacement> {
        let start_row = self.start_row.unwrap_or_default();
        let column = self.column.unwrap_or_default();
        let width = self.width.unwrap_or(DEFAULT_WIDTH);
        let height = self.height.unwrap_or(DEFAULT_HEIGHT);

        self.chart_ids
            .iter()
            .zip(start_row..)
            .map(|(chart_id, row)| ChartPlacement {
                chart_id: chart_id.clone(),
                row,
                column,
                height,
                width,
            })
            .collect()
    }
}

impl GridLayout {
    /// Fill rows left to right, moving to the next row when a chart would
    /// cross the last column.
    pub fn placements(&self) -> Vec<ChartPlacement> {
        let start_column = self.start_column.unwrap_or_default();
        let width = self.width.unwrap_or(DEFAULT_WIDTH);
        let height = self.height.unwrap_or(DEFAULT_HEIGHT);
        let mut row = self.start_row.unwrap_or_default();
        let mut column = start_column;

        let mut placements = Vec::with_capacity(self.chart_ids.len());
        for chart_id in &self.chart_ids {
            if column + width > DASHBOARD_COLUMNS {
                row += 1;
                column = start_column;
            }
            placements.push(ChartPlacement {
                chart_id: chart_id.clone(),
                row,
                column,
                height,
                width,
            });
            column += width;
        }
        placements
    }
}

/// Dashboard-wide filter on a property.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterConfig {
    pub property: String,
    #[serde(default, deserialize_with = "null_default")]
    pub negated: bool,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSource {
    pub property: String,
    #[serde(rename = "NOT")]
    pub not: bool,
    pub value: Vec<String>,
}

/// Dashboard variable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VariableConfig {
    pub property: String,
    pub alias: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub values: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub value_required: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub values_suggested: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub restricted_suggestions: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub replace_only: bool,
}

/// Variable value: the empty string when no default is declared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Unset(&'static str),
    Values(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub property: String,
    pub description: String,
    pub alias: String,
    pub value: VariableValue,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_suggestions: Option<Vec<String>>,
    pub restricted: bool,
    pub replace_only: bool,
}

impl From<&VariableConfig> for Variable {
    fn from(v: &VariableConfig) -> Self {
        Self {
            property: v.property.clone(),
            description: v.description.clone().unwrap_or_default(),
            alias: v.alias.clone(),
            value: if v.values.is_empty() {
                VariableValue::Unset("")
            } else {
                VariableValue::Values(v.values.clone())
            },
            required: v.value_required,
            preferred_suggestions: (!v.values_suggested.is_empty()).then(|| v.values_suggested.clone()),
            restricted: v.restricted_suggestions,
            replace_only: v.replace_only,
        }
    }
}

/// Either end of the dashboard time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimeBound {
    /// Relative time such as `-1h`, or `Now`.
    Text(String),
    /// Epoch milliseconds.
    Millis(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeBound>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<FilterSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DashboardTime>,
}

/// Declared dashboard.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub dashboard_group: String,
    #[serde(default)]
    pub charts_resolution: Option<String>,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub chart: Vec<ChartConfig>,
    #[serde(default, deserialize_with = "null_default")]
    pub column: Vec<ColumnLayout>,
    #[serde(default, deserialize_with = "null_default")]
    pub grid: Vec<GridLayout>,
    #[serde(default, deserialize_with = "null_default")]
    pub variable: Vec<VariableConfig>,
    #[serde(default, deserialize_with = "null_default")]
    pub filter: Vec<FilterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub name: String,
    pub description: String,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<DashboardFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartPlacement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_density: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl DashboardConfig {
    fn time(&self) -> Option<DashboardTime> {
        let time = match non_empty(&self.time_range) {
            Some(range) => DashboardTime {
                start: Some(TimeBound::Text(range)),
                end: Some(TimeBound::Text("Now".to_string())),
            },
            None => DashboardTime {
                start: self.start_time.map(|s| TimeBound::Millis(s * 1000)),
                end: self.end_time.map(|e| TimeBound::Millis(e * 1000)),
            },
        };
        (time.start.is_some() || time.end.is_some()).then_some(time)
    }

    fn filters(&self) -> Option<DashboardFilters> {
        let sources: Vec<FilterSource> = self
            .filter
            .iter()
            .map(|f| FilterSource {
                property: f.property.clone(),
                not: f.negated,
                value: f.values.clone(),
            })
            .collect();
        let variables: Vec<Variable> = self.variable.iter().map(Variable::from).collect();

        let filters = DashboardFilters {
            sources: (!sources.is_empty()).then_some(sources),
            variables: (!variables.is_empty()).then_some(variables),
            time: self.time(),
        };
        (filters.sources.is_some() || filters.variables.is_some() || filters.time.is_some())
            .then_some(filters)
    }

    /// Explicit charts, then column layouts, then grid layouts.
    pub fn placements(&self) -> Vec<ChartPlacement> {
        let mut placements: Vec<ChartPlacement> = self.chart.iter().map(ChartPlacement::from).collect();
        placements.extend(self.column.iter().flat_map(ColumnLayout::placements));
        placements.extend(self.grid.iter().flat_map(GridLayout::placements));
        placements
    }
}

impl Declared for DashboardConfig {
    type Payload = DashboardPayload;

    fn payload(&self) -> Result<DashboardPayload, ProviderError> {
        let charts = self.placements();
        Ok(DashboardPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            group_id: self.dashboard_group.clone(),
            filters: self.filters(),
            charts: (!charts.is_empty()).then_some(charts),
            chart_density: non_empty(&self.charts_resolution).map(|r| r.to_uppercase()),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
        })
    }
}

fn size_attributes(block: Block, unit: &str) -> Block {
    block
        .with_attribute(
            "width",
            Attribute::optional_int64()
                .with_default(json!(DEFAULT_WIDTH))
                .with_description(format!("Number of columns (out of a total of 12) {} should take up. (between 1 and 12)", unit)),
        )
        .with_attribute(
            "height",
            Attribute::optional_int64()
                .with_default(json!(DEFAULT_HEIGHT))
                .with_description(format!("How many rows {} should take up. (greater than or equal to 1)", unit)),
        )
}

/// Schema of `signalform_dashboard`.
pub fn schema(resource_url: Option<String>) -> Schema {
    let chart = Block::new()
        .with_attribute(
            "chart_id",
            Attribute::required_string().with_description("ID of the chart to display"),
        )
        .with_attribute(
            "row",
            Attribute::optional_int64()
                .with_description("The row to show the chart in (zero-based); if height > 1, this value represents the topmost row of the chart"),
        )
        .with_attribute(
            "column",
            Attribute::optional_int64()
                .with_description("The column to show the chart in (zero-based); this value always represents the leftmost column of the chart. (between 0 and 11)"),
        );

    let grid = Block::new()
        .with_attribute(
            "chart_ids",
            Attribute::required_string_list().with_description("Charts to use for the grid"),
        )
        .with_attribute(
            "start_row",
            Attribute::optional_int64()
                .with_default(json!(0))
                .with_description("Starting row number for the grid"),
        )
        .with_attribute(
            "start_column",
            Attribute::optional_int64()
                .with_default(json!(0))
                .with_description("Starting column number for the grid"),
        );

    let column = Block::new()
        .with_attribute(
            "chart_ids",
            Attribute::required_string_list().with_description("Charts to use for the column"),
        )
        .with_attribute(
            "column",
            Attribute::optional_int64()
                .with_default(json!(0))
                .with_description("Column number for the layout"),
        )
        .with_attribute(
            "start_row",
            Attribute::optional_int64()
                .with_default(json!(0))
                .with_description("Starting row number for the column"),
        );

    let variable = Block::new()
        .with_attribute(
            "property",
            Attribute::required_string().with_description("A metric time series dimension or property name"),
        )
        .with_attribute(
            "alias",
            Attribute::required_string()
                .with_description("An alias for the dashboard variable. This text will appear as the label for the dropdown field on the dashboard"),
        )
        .with_attribute("description", Attribute::optional_string().with_description("Variable description"))
        .with_attribute(
            "values",
            Attribute::optional_string_set()
                .with_description("List of strings (which will be treated as an OR filter on the property)"),
        )
        .with_attribute(
            "value_required",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Determines whether a value is required for this variable. false by default"),
        )
        .with_attribute(
            "values_suggested",
            Attribute::optional_string_set()
                .with_description("A list of strings of suggested values for this variable"),
        )
        .with_attribute(
            "restricted_suggestions",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("If true, this variable may only be set to the values listed in values_suggested. false by default"),
        )
        .with_attribute(
            "replace_only",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("If true, this variable will only apply to charts with a filter on the named property."),
        );

    let filter = Block::new()
        .with_attribute(
            "property",
            Attribute::required_string().with_description("A metric time series dimension or property name"),
        )
        .with_attribute(
            "negated",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) Whether this filter should be a \"not\" filter"),
        )
        .with_attribute(
            "values",
            Attribute::required_string_set()
                .with_description("List of strings (which will be treated as an OR filter on the property)"),
        );

    base_schema(resource_url)
        .with_attribute(
            "dashboard_group",
            Attribute::required_string()
                .with_description("The ID of the dashboard group that contains the dashboard"),
        )
        .with_attribute(
            "charts_resolution",
            Attribute::optional_string()
                .with_validator(Validator::ChartsResolution)
                .with_description("Chart data display resolution. One of \"default\", \"low\", \"high\", or \"highest\""),
        )
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
        .with_attribute(
            "tags",
            Attribute::optional_string_list().with_description("Tags associated with the dashboard"),
        )
        .with_block(
            "chart",
            NestedBlock::set(size_attributes(chart, "the chart")),
        )
        .with_block("grid", NestedBlock::list(size_attributes(grid, "each chart")))
        .with_block("column", NestedBlock::list(size_attributes(column, "each chart")))
        .with_block("variable", NestedBlock::set(variable))
        .with_block("filter", NestedBlock::set(filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::encode;
    use crate::validation::validate;
    use serde_json::{json, Value};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    fn positions(placements: &[ChartPlacement]) -> Vec<(i64, i64)> {
        placements.iter().map(|p| (p.row, p.column)).collect()
    }

    #[test]
    fn test_grid_wraps_on_twelve_columns() {
        let grid = GridLayout {
            chart_ids: ids(5),
            width: Some(4),
            ..Default::default()
        };
        assert_eq!(
            positions(&grid.placements()),
            vec![(0, 0), (0, 4), (0, 8), (1, 0), (1, 4)]
        );
    }

    #[test]
    fn test_grid_wraps_back_to_start_column() {
        let grid = GridLayout {
            chart_ids: ids(3),
            start_row: Some(2),
            start_column: Some(3),
            width: Some(5),
            height: Some(2),
        };
        let placements = grid.placements();
        assert_eq!(positions(&placements), vec![(2, 3), (3, 3), (4, 3)]);
        assert!(placements.iter().all(|p| p.width == 5 && p.height == 2));
    }

    #[test]
    fn test_grid_default_width_is_full_row() {
        let grid = GridLayout {
            chart_ids: ids(2),
            ..Default::default()
        };
        assert_eq!(positions(&grid.placements()), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_column_stacks_rows() {
        let column = ColumnLayout {
            chart_ids: ids(3),
            column: Some(6),
            start_row: Some(1),
            width: Some(6),
            height: None,
        };
        let placements = column.placements();
        assert_eq!(positions(&placements), vec![(1, 6), (2, 6), (3, 6)]);
        assert_eq!(placements[0].height, 1);
    }

    #[test]
    fn test_payload() {
        let config = json!({
            "name": "overview",
            "dashboard_group": "G1",
            "charts_resolution": "high",
            "time_range": "-1h",
            "tags": ["prod"],
            "chart": [{"chart_id": "A", "row": 0, "column": 0, "width": 6, "height": null}],
            "column": [{"chart_ids": ["B", "C"], "column": 6, "start_row": 0, "width": 6}],
            "grid": null,
            "filter": [{"property": "env", "negated": true, "values": ["dev"]}],
            "variable": [{"property": "host", "alias": "Host", "values_suggested": ["a"]}]
        });
        let body: Value = serde_json::from_slice(&encode::<DashboardConfig>(&config).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "overview",
                "description": "",
                "groupId": "G1",
                "filters": {
                    "sources": [{"property": "env", "NOT": true, "value": ["dev"]}],
                    "variables": [{
                        "property": "host",
                        "description": "",
                        "alias": "Host",
                        "value": "",
                        "required": false,
                        "preferredSuggestions": ["a"],
                        "restricted": false,
                        "replaceOnly": false
                    }],
                    "time": {"start": "-1h", "end": "Now"}
                },
                "charts": [
                    {"chartId": "A", "row": 0, "column": 0, "height": 1, "width": 6},
                    {"chartId": "B", "row": 0, "column": 6, "height": 1, "width": 6},
                    {"chartId": "C", "row": 1, "column": 6, "height": 1, "width": 6}
                ],
                "chartDensity": "HIGH",
                "tags": ["prod"]
            })
        );
    }

    #[test]
    fn test_absolute_time_and_variable_values() {
        let config = json!({
            "name": "d",
            "dashboard_group": "G",
            "start_time": 100,
            "variable": [{"property": "p", "alias": "a", "values": ["x", "y"], "value_required": true}]
        });
        let body: Value = serde_json::from_slice(&encode::<DashboardConfig>(&config).unwrap()).unwrap();
        assert_eq!(body["filters"]["time"], json!({"start": 100000}));
        assert_eq!(body["filters"]["variables"][0]["value"], json!(["x", "y"]));
        assert_eq!(body["filters"]["variables"][0]["required"], json!(true));
        assert!(body.get("charts").is_none());
    }

    #[test]
    fn test_minimal_payload_has_no_filters() {
        let config = json!({"name": "d", "dashboard_group": "G"});
        let body: Value = serde_json::from_slice(&encode::<DashboardConfig>(&config).unwrap()).unwrap();
        assert_eq!(body, json!({"name": "d", "description": "", "groupId": "G"}));
    }

    #[test]
    fn test_schema() {
        let schema = schema(None);
        let missing_group = json!({"name": "d"});
        assert_eq!(validate(&schema, &missing_group).len(), 1);

        let bad_resolution = json!({"name": "d", "dashboard_group": "G", "charts_resolution": "ultra"});
        assert_eq!(validate(&schema, &bad_resolution).len(), 1);
    }
}
