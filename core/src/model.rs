use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Severity classification for a tagged finding.
///
/// Stored as the exact strings `"High"`, `"Medium"`, `"Low"`. Anything else
/// encountered in stored data is normalized to `Low` at the deserialization
/// boundary instead of leaking an unchecked string into the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    /// Lowercase tier used to key decoration classes (`vt-sev-high` etc.).
    pub const fn tier(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Lenient parse for data already in the store. Unrecognized values fall
    /// back to `Low` with a warning; strict input paths use `FromStr`.
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            warn!("unrecognized severity '{}', treating as Low", raw);
            Severity::Low
        })
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Low
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("invalid severity '{}' (expected High|Medium|Low)", s)),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::normalize(&raw))
    }
}

/// Workflow status of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Open,
    InProgress,
    Fixed,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Fixed => "Fixed",
        }
    }

    /// Lenient parse for stored data; unrecognized values become `Open`.
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            warn!("unrecognized status '{}', treating as Open", raw);
            Status::Open
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Open
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in progress" | "in-progress" | "in_progress" => Ok(Status::InProgress),
            "fixed" => Ok(Status::Fixed),
            _ => Err(format!(
                "invalid status '{}' (expected Open|In Progress|Fixed)",
                s
            )),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Status::normalize(&raw))
    }
}

/// One reported issue, attached to a single page element.
///
/// `id` and `created_at` are fixed at creation; edits replace every other
/// field in place. The wire format matches the extension-era storage layout
/// (`type`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub selector: String,
    #[serde(rename = "type")]
    pub vuln_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: String,
    #[serde(default)]
    pub payload: String,
    pub url: String,
    pub created_at: String,
}

/// Values captured by the record-creation form. Every field is optional;
/// `Finding::from_form` fills the defaults.
#[derive(Debug, Clone, Default)]
pub struct FindingForm {
    pub bug_type: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub payload: Option<String>,
}

impl Finding {
    /// Builds a finding from submitted form values.
    ///
    /// Defaults: type "Bug", severity High, status Open, empty text fields.
    /// An all-whitespace bug type counts as absent.
    pub fn from_form(form: FindingForm, selector: &str, page_key: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: new_finding_id(now),
            selector: selector.to_string(),
            vuln_type: form
                .bug_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Bug".to_string()),
            severity: form.severity.unwrap_or(Severity::High),
            status: form.status.unwrap_or(Status::Open),
            description: form.description.unwrap_or_default(),
            steps: form.steps.unwrap_or_default(),
            payload: form.payload.unwrap_or_default(),
            url: page_key.to_string(),
            created_at: now
                .format(&Rfc3339)
                .expect("RFC 3339 timestamp formatting"),
        }
    }
}

/// Creation-millis token. Ordering is not guaranteed across clock skew but is
/// sufficient for single-client use.
fn new_finding_id(now: OffsetDateTime) -> String {
    (now.unix_timestamp_nanos() / 1_000_000).to_string()
}
