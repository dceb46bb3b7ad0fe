//! Resource kinds and their mappers.
//!
//! Every kind pairs a published [`Schema`] with a typed declared
//! configuration implementing [`Declared`]. The configuration is parsed from
//! the host's JSON, then converted into the JSON body SignalFx expects.

pub mod common;
pub mod dashboard;
pub mod dashboard_group;
pub mod detector;
pub mod heatmap_chart;
pub mod list_chart;
pub mod single_value_chart;
pub mod text_chart;
pub mod time_chart;

use crate::config::{Collection, Endpoints};
use crate::error::ProviderError;
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Declared configuration of one resource kind.
pub trait Declared: DeserializeOwned {
    /// Body sent on create and update.
    type Payload: Serialize;

    /// Build the request body.
    fn payload(&self) -> Result<Self::Payload, ProviderError>;
}

/// Parse a declared configuration and encode its request body.
pub fn encode<D: Declared>(config: &Value) -> Result<Vec<u8>, ProviderError> {
    let declared: D = serde_json::from_value(config.clone())
        .map_err(|e| ProviderError::Validation(format!("Invalid configuration: {}", e)))?;
    Ok(serde_json::to_vec(&declared.payload()?)?)
}

/// Resource kinds exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `signalform_time_chart`
    TimeChart,
    /// `signalform_list_chart`
    ListChart,
    /// `signalform_single_value_chart`
    SingleValueChart,
    /// `signalform_heatmap_chart`
    HeatmapChart,
    /// `signalform_text_chart`
    TextChart,
    /// `signalform_detector`
    Detector,
    /// `signalform_dashboard`
    Dashboard,
    /// `signalform_dashboard_group`
    DashboardGroup,
}

impl ResourceKind {
    /// Every kind, in publication order.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::TimeChart,
        ResourceKind::ListChart,
        ResourceKind::SingleValueChart,
        ResourceKind::HeatmapChart,
        ResourceKind::TextChart,
        ResourceKind::Detector,
        ResourceKind::Dashboard,
        ResourceKind::DashboardGroup,
    ];

    /// Type name the host uses.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::TimeChart => "signalform_time_chart",
            Self::ListChart => "signalform_list_chart",
            Self::SingleValueChart => "signalform_single_value_chart",
            Self::HeatmapChart => "signalform_heatmap_chart",
            Self::TextChart => "signalform_text_chart",
            Self::Detector => "signalform_detector",
            Self::Dashboard => "signalform_dashboard",
            Self::DashboardGroup => "signalform_dashboard_group",
        }
    }

    /// API collection the kind lives in.
    pub fn collection(self) -> Collection {
        match self {
            Self::TimeChart
            | Self::ListChart
            | Self::SingleValueChart
            | Self::HeatmapChart
            | Self::TextChart => Collection::Chart,
            Self::Detector => Collection::Detector,
            Self::Dashboard => Collection::Dashboard,
            Self::DashboardGroup => Collection::DashboardGroup,
        }
    }

    /// Published schema; `resource_url` defaults to the UI template of `endpoints`.
    pub fn schema(self, endpoints: &Endpoints) -> Schema {
        let template = endpoints.ui_template(self.collection());
        match self {
            Self::TimeChart => time_chart::schema(template),
            Self::ListChart => list_chart::schema(template),
            Self::SingleValueChart => single_value_chart::schema(template),
            Self::HeatmapChart => heatmap_chart::schema(template),
            Self::TextChart => text_chart::schema(template),
            Self::Detector => detector::schema(template),
            Self::Dashboard => dashboard::schema(template),
            Self::DashboardGroup => dashboard_group::schema(),
        }
    }

    /// Encode the request body for a declared configuration.
    pub fn payload(self, config: &Value) -> Result<Vec<u8>, ProviderError> {
        match self {
            Self::TimeChart => encode::<time_chart::TimeChartConfig>(config),
            Self::ListChart => encode::<list_chart::ListChartConfig>(config),
            Self::SingleValueChart => encode::<single_value_chart::SingleValueChartConfig>(config),
            Self::HeatmapChart => encode::<heatmap_chart::HeatmapChartConfig>(config),
            Self::TextChart => encode::<text_chart::TextChartConfig>(config),
            Self::Detector => encode::<detector::DetectorConfig>(config),
            Self::Dashboard => encode::<dashboard::DashboardConfig>(config),
            Self::DashboardGroup => encode::<dashboard_group::DashboardGroupConfig>(config),
        }
    }

    /// Fill computed attributes that derive from the declared configuration.
    pub fn annotate(self, state: &mut Value) -> Result<(), ProviderError> {
        match self {
            Self::Detector => detector::fingerprint_rules(state),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ResourceKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == s)
            .ok_or_else(|| ProviderError::UnknownResource(s.to_string()))
    }
}
