//! Field validators and the schema walk that applies them.
//!
//! The field validators are pure: each takes a value and returns the list of
//! problems found, empty when the value is acceptable. [`validate`] checks a
//! declared configuration object against a [`Schema`], running attribute
//! types, required/conflicting attributes and every attached [`Validator`].
//!
//! ```
//! use signalform_provider::schema::{Attribute, Schema};
//! use signalform_provider::validation::{validate, Validator};
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "time_range",
//!         Attribute::optional_string().with_validator(Validator::RelativeTime),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "cpu", "time_range": "-15m"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "cpu", "time_range": "-5M"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("time_range".to_string()));
//! ```

use crate::resources::common::{CHART_COLORS, PALETTE_COLORS};
use crate::resources::detector::Notification;
use crate::schema::{
    Attribute, AttributeType, Block, Diagnostic, DiagnosticSeverity, NestedBlock, Schema,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Rule severities accepted by SignalFx.
pub const SEVERITIES: &[&str] = &["Critical", "Major", "Minor", "Warning", "Info"];

/// Plot styles for time charts and their publish labels.
pub const PLOT_TYPES: &[&str] = &["LineChart", "AreaChart", "ColumnChart", "Histogram"];

/// Y axis sides.
pub const AXES: &[&str] = &["right", "left"];

/// Dashboard chart densities.
pub const CHARTS_RESOLUTIONS: &[&str] = &["default", "low", "high", "highest"];

/// Units a publish label can be scaled in.
pub const VALUE_UNITS: &[&str] = &[
    "Bit",
    "Kilobit",
    "Megabit",
    "Gigabit",
    "Terabit",
    "Petabit",
    "Exabit",
    "Zettabit",
    "Yottabit",
    "Byte",
    "Kibibyte",
    "Mebibyte",
    "Gigibyte",
    "Tebibyte",
    "Pebibyte",
    "Exbibyte",
    "Zebibyte",
    "Yobibyte",
    "Nanosecond",
    "Microsecond",
    "Millisecond",
    "Second",
    "Minute",
    "Hour",
    "Day",
    "Week",
];

/// Largest accepted `max_delay`, in seconds.
pub const MAX_DELAY_SECONDS: i64 = 900;

/// Named field checks that schemas attach to attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// One of [`SEVERITIES`].
    Severity,
    /// One of [`PLOT_TYPES`].
    PlotType,
    /// One of [`AXES`].
    Axis,
    /// One of [`VALUE_UNITS`].
    ValueUnit,
    /// A name in the 16 colour publish-label palette.
    PaletteColor,
    /// A name in the chart colour list used by scales and ranges.
    ChartColor,
    /// One of [`CHARTS_RESOLUTIONS`].
    ChartsResolution,
    /// Seconds between 0 and [`MAX_DELAY_SECONDS`].
    MaxDelay,
    /// SignalFx relative time such as `-15m`.
    RelativeTime,
    /// Property prefixed with `+` or `-`.
    SortBy,
    /// Notification target such as `Email,ops@example.com`.
    Notification,
}

impl Validator {
    /// Check one value. Values of the wrong JSON type are left to the type check.
    pub fn check(self, value: &Value) -> Vec<String> {
        if let Self::MaxDelay = self {
            return value.as_i64().map(validate_max_delay).unwrap_or_default();
        }
        let Some(text) = value.as_str() else {
            return Vec::new();
        };
        match self {
            Self::Severity => validate_one_of(text, SEVERITIES),
            Self::PlotType => validate_plot_type(text),
            Self::Axis => validate_axis(text),
            Self::ValueUnit => validate_one_of(text, VALUE_UNITS),
            Self::PaletteColor => validate_color(text, &PALETTE_COLORS),
            Self::ChartColor => validate_color(text, &CHART_COLORS),
            Self::ChartsResolution => validate_one_of(text, CHARTS_RESOLUTIONS),
            Self::RelativeTime => validate_relative_time(text),
            Self::SortBy => validate_sort_by(text),
            Self::Notification => validate_notification(text),
            Self::MaxDelay => Vec::new(),
        }
    }
}

/// `value` must be one of `allowed`.
pub fn validate_one_of(value: &str, allowed: &[&str]) -> Vec<String> {
    if allowed.contains(&value) {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed; must be one of: {}",
            value,
            allowed.join(", ")
        )]
    }
}

/// Time chart plot type.
pub fn validate_plot_type(value: &str) -> Vec<String> {
    if PLOT_TYPES.contains(&value) {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed; Must be \"LineChart\", \"AreaChart\", \"ColumnChart\", or \"Histogram\"",
            value
        )]
    }
}

/// Publish label axis.
pub fn validate_axis(value: &str) -> Vec<String> {
    if AXES.contains(&value) {
        Vec::new()
    } else {
        vec![format!("{} not allowed; must be either right or left", value)]
    }
}

fn validate_color(value: &str, colors: &[&str]) -> Vec<String> {
    if colors.contains(&value) {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed; must be either {}",
            value,
            colors.join(",")
        )]
    }
}

/// `max_delay` in seconds.
pub fn validate_max_delay(value: i64) -> Vec<String> {
    if (0..=MAX_DELAY_SECONDS).contains(&value) {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed; max_delay must be >= 0 && <= {}",
            value, MAX_DELAY_SECONDS
        )]
    }
}

/// List sort order: `+prop` ascending, `-prop` descending.
pub fn validate_sort_by(value: &str) -> Vec<String> {
    if value.starts_with('+') || value.starts_with('-') {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed; must start either with + or - (ascending or descending)",
            value
        )]
    }
}

/// Relative time such as `-5m`, `-1h`, `-2d`, `-1w`.
pub fn validate_relative_time(value: &str) -> Vec<String> {
    if relative_time_millis(value).is_some() {
        Vec::new()
    } else {
        vec![format!(
            "{} not allowed. Please use milliseconds from epoch or SignalFx time syntax (e.g. -5m, -1h)",
            value
        )]
    }
}

/// Notification target string.
pub fn validate_notification(value: &str) -> Vec<String> {
    match value.parse::<Notification>() {
        Ok(_) => Vec::new(),
        Err(e) => vec![e],
    }
}

static RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-([0-9]+)([mhdw])$").expect("RELATIVE_TIME is a valid regex pattern")
});

/// Convert a relative time to milliseconds; `None` if the syntax is wrong.
///
/// Units: `m` minutes, `h` hours, `d` days, `w` weeks. Anything else,
/// including `M`, is rejected.
pub fn relative_time_millis(value: &str) -> Option<i64> {
    let captures = RELATIVE_TIME.captures(value)?;
    let amount: i64 = captures[1].parse().ok()?;
    let unit: i64 = match &captures[2] {
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        "d" => 24 * 60 * 60 * 1000,
        "w" => 7 * 24 * 60 * 60 * 1000,
        _ => return None,
    };
    amount.checked_mul(unit)
}

/// Validate a declared object against a schema.
///
/// Returns every problem found; an empty list means the object is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped
/// - Attribute types must match, then attached validators run
/// - Attributes listed in `conflicts_with` may not be set together
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// [`validate`] as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether `value` passes [`validate`].
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    let is_set = |name: &str| obj.get(name).is_some_and(|v| !v.is_null());

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);

        if is_set(name) {
            for other in attr.conflicts_with.iter().filter(|o| is_set(o)) {
                diagnostics.push(
                    Diagnostic::error(format!("\"{}\": conflicts with {}", attr_path, other))
                        .with_attribute(attr_path.clone()),
                );
            }
        }
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    let value = match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    let before = diagnostics.len();
    validate_attribute_type(&attr.attr_type, value, path, diagnostics);
    if diagnostics.len() > before {
        return;
    }

    if let Some(validator) = attr.validator {
        match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    push_field_errors(validator, item, &format!("{}.{}", path, i), diagnostics);
                }
            },
            None => push_field_errors(validator, value, path, diagnostics),
        }
    }
}

fn push_field_errors(
    validator: Validator,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for message in validator.check(value) {
        diagnostics.push(
            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                .with_detail(message)
                .with_attribute(path),
        );
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) {
                    "set"
                } else {
                    "list"
                };
                diagnostics.push(type_error(path, expected, value));
            }
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // max_items of 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64().is_some()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}
