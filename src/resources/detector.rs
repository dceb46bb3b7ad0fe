//! `signalform_detector`: SignalFlow detectors with alert rules.

use super::common::{
    base_schema, max_delay_attribute, non_empty, null_default, program_text_attribute,
    sanitize_program_text, seconds_to_millis, with_time_attributes, TimeWindow,
};
use super::Declared;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Where an alert is sent.
///
/// Declared as `"Kind,arg[,arg]"`, e.g. `"Email,ops@example.com"` or
/// `"Webhook,secret,https://hooks.example.com"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Notification {
    Email {
        email: String,
    },
    PagerDuty {
        #[serde(rename = "credentialId")]
        credential_id: String,
    },
    Slack {
        #[serde(rename = "credentialId")]
        credential_id: String,
        channel: String,
    },
    Webhook {
        secret: String,
        url: String,
    },
    Team {
        team: String,
    },
    TeamEmail {
        team: String,
    },
}

impl FromStr for Notification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s.split_once(',').unwrap_or((s, ""));
        let one = |kind: &str| {
            if rest.is_empty() {
                Err(format!("{} notification requires a target: {}", kind, s))
            } else {
                Ok(rest.to_string())
            }
        };
        let two = |kind: &str| match rest.split_once(',') {
            Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
            _ => Err(format!("{} notification requires two values: {}", kind, s)),
        };

        match kind {
            "Email" => Ok(Self::Email { email: one(kind)? }),
            "PagerDuty" => Ok(Self::PagerDuty {
                credential_id: one(kind)?,
            }),
            "Slack" => {
                let (credential_id, channel) = two(kind)?;
                Ok(Self::Slack {
                    credential_id,
                    channel,
                })
            }
            "Webhook" => {
                let (secret, url) = two(kind)?;
                Ok(Self::Webhook { secret, url })
            }
            "Team" => Ok(Self::Team { team: one(kind)? }),
            "TeamEmail" => Ok(Self::TeamEmail { team: one(kind)? }),
            other => Err(format!(
                "{} not allowed; notification type must be one of: Email, PagerDuty, Slack, Webhook, Team, TeamEmail",
                other
            )),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email { email } => write!(f, "Email,{}", email),
            Self::PagerDuty { credential_id } => write!(f, "PagerDuty,{}", credential_id),
            Self::Slack {
                credential_id,
                channel,
            } => write!(f, "Slack,{},{}", credential_id, channel),
            Self::Webhook { secret, url } => write!(f, "Webhook,{},{}", secret, url),
            Self::Team { team } => write!(f, "Team,{}", team),
            Self::TeamEmail { team } => write!(f, "TeamEmail,{}", team),
        }
    }
}

/// Declared alert rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Rule {
    /// Free text shown with the alert.
    #[serde(default)]
    pub description: Option<String>,
    /// One of Critical, Major, Minor, Warning, Info.
    pub severity: String,
    /// Label of the `detect` call this rule fires on.
    pub detect_label: String,
    /// When true no events or notifications are generated.
    #[serde(default, deserialize_with = "null_default")]
    pub disabled: bool,
    /// Targets as `"Kind,arg[,arg]"` strings.
    #[serde(default, deserialize_with = "null_default")]
    pub notifications: Vec<String>,
    /// Custom notification body.
    #[serde(default)]
    pub parameterized_body: Option<String>,
    /// Custom notification subject.
    #[serde(default)]
    pub parameterized_subject: Option<String>,
    /// Page to consult when the alert fires.
    #[serde(default)]
    pub runbook_url: Option<String>,
    /// Suggested first course of action.
    #[serde(default)]
    pub tip: Option<String>,
}

impl Rule {
    /// Text the fingerprint digests.
    ///
    /// Every field has a labelled, length-prefixed slot in a fixed order, so
    /// text moved from one field to another changes the digest. Unset
    /// optional fields write an empty slot. Notifications are sorted so
    /// their declaration order does not matter.
    pub fn fingerprint_input(&self) -> String {
        let mut buf = String::new();
        let disabled = self.disabled.to_string();
        let fields = [
            ("description", self.description.as_deref().unwrap_or_default()),
            ("severity", self.severity.as_str()),
            ("detect_label", self.detect_label.as_str()),
            ("disabled", disabled.as_str()),
            ("parameterized_body", self.parameterized_body.as_deref().unwrap_or_default()),
            ("parameterized_subject", self.parameterized_subject.as_deref().unwrap_or_default()),
            ("runbook_url", self.runbook_url.as_deref().unwrap_or_default()),
            ("tip", self.tip.as_deref().unwrap_or_default()),
        ];
        for (label, value) in fields {
            push_slot(&mut buf, label, value);
        }

        let mut notifications: Vec<&str> = self.notifications.iter().map(String::as_str).collect();
        notifications.sort_unstable();
        buf.push_str(&format!("notifications={}\n", notifications.len()));
        for notification in notifications {
            push_slot(&mut buf, "notification", notification);
        }
        buf
    }

    /// Content identity of the rule, used to diff rule sets.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.fingerprint_input().as_bytes())
            .to_hex()
            .to_string()
    }

    fn payload(&self) -> Result<RulePayload, ProviderError> {
        let notifications = self
            .notifications
            .iter()
            .map(|n| n.parse::<Notification>().map_err(ProviderError::Validation))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RulePayload {
            description: self.description.clone().unwrap_or_default(),
            severity: self.severity.clone(),
            detect_label: self.detect_label.clone(),
            disabled: self.disabled,
            parameterized_body: non_empty(&self.parameterized_body),
            parameterized_subject: non_empty(&self.parameterized_subject),
            runbook_url: non_empty(&self.runbook_url),
            tip: non_empty(&self.tip),
            notifications,
        })
    }
}

/// Write the computed `fingerprint` into every rule of a detector state.
pub fn fingerprint_rules(state: &mut Value) -> Result<(), ProviderError> {
    let Some(rules) = state.get_mut("rule").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    for item in rules {
        let rule: Rule = serde_json::from_value(item.clone())
            .map_err(|e| ProviderError::Validation(format!("Invalid rule: {}", e)))?;
        if let Some(object) = item.as_object_mut() {
            object.insert("fingerprint".into(), Value::String(rule.fingerprint()));
        }
    }
    Ok(())
}

fn push_slot(buf: &mut String, label: &str, value: &str) {
    buf.push_str(&format!("{}={}:{}\n", label, value.len(), value));
}

/// Rule as sent to SignalFx.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    pub description: String,
    pub severity: String,
    pub detect_label: String,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameterized_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameterized_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_data_markers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeWindow>,
}

/// Declared detector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetectorConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub program_text: String,
    #[serde(default)]
    pub max_delay: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub show_data_markers: bool,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub teams: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub rule: Vec<Rule>,
}

/// Detector as sent to SignalFx. `maxDelay` is always present, `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorPayload {
    pub name: String,
    pub description: String,
    pub program_text: String,
    pub max_delay: Option<i64>,
    pub rules: Vec<RulePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_options: Option<VisualizationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Declared for DetectorConfig {
    type Payload = DetectorPayload;

    fn payload(&self) -> Result<DetectorPayload, ProviderError> {
        let rules = self
            .rule
            .iter()
            .map(Rule::payload)
            .collect::<Result<Vec<_>, _>>()?;

        let viz = VisualizationOptions {
            show_data_markers: self.show_data_markers.then_some(true),
            time: TimeWindow::from_declared(self.time_range.as_deref(), self.start_time, self.end_time),
        };
        let visualization_options =
            (viz.show_data_markers.is_some() || viz.time.is_some()).then_some(viz);

        Ok(DetectorPayload {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            program_text: sanitize_program_text(&self.program_text),
            max_delay: seconds_to_millis(self.max_delay),
            rules,
            visualization_options,
            teams: (!self.teams.is_empty()).then(|| self.teams.clone()),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
        })
    }
}

/// Schema of `signalform_detector`.
pub fn schema(resource_url: Option<String>) -> Schema {
    let rule = Block::new()
        .with_attribute(
            "description",
            Attribute::optional_string().with_description("Description of the rule"),
        )
        .with_attribute(
            "severity",
            Attribute::required_string()
                .with_validator(Validator::Severity)
                .with_description("The severity of the rule, must be one of: Critical, Major, Minor, Warning, Info"),
        )
        .with_attribute(
            "detect_label",
            Attribute::required_string()
                .with_description("A detect label which matches a detect label within the program text"),
        )
        .with_attribute(
            "disabled",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(default: false) When true, notifications and events will not be generated for the detect label"),
        )
        .with_attribute(
            "notifications",
            Attribute::optional_string_list()
                .with_validator(Validator::Notification)
                .with_description("List of strings specifying where notifications will be sent when an incident occurs"),
        )
        .with_attribute(
            "parameterized_body",
            Attribute::optional_string()
                .with_description("Custom notification message body when an alert is triggered"),
        )
        .with_attribute(
            "parameterized_subject",
            Attribute::optional_string()
                .with_description("Custom notification message subject when an alert is triggered"),
        )
        .with_attribute(
            "runbook_url",
            Attribute::optional_string()
                .with_description("URL of page to consult when an alert is triggered"),
        )
        .with_attribute(
            "tip",
            Attribute::optional_string()
                .with_description("Plain text suggested first course of action, such as a command to execute."),
        )
        .with_attribute(
            "fingerprint",
            Attribute::computed_string()
                .with_description("Content identity of the rule, stable across notification order"),
        );

    let schema = base_schema(resource_url)
        .with_attribute("program_text", program_text_attribute())
        .with_attribute("max_delay", max_delay_attribute())
        .with_attribute(
            "show_data_markers",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("(false by default) When true, markers will be drawn for each datapoint within the visualization."),
        )
        .with_attribute(
            "teams",
            Attribute::optional_string_list().with_description("Team IDs to associate the detector to"),
        )
        .with_attribute(
            "tags",
            Attribute::optional_string_list().with_description("Tags associated with the detector"),
        )
        .with_block("rule", NestedBlock::set(rule).with_min_items(1));
    with_time_attributes(schema)
}
