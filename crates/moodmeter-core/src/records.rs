//! Record types held by the document store.
//!
//! Tasks, tags and flow tasks are user-editable; flow completions are
//! append-only. Levels and difficulties are serialized as bare integers and
//! rejected outside `1..=3`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Tag assigned to freshly created tasks.
pub const DEFAULT_TAG: &str = "misc";

/// Attribute level of a task (risk, urgency, importance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl TryFrom<u8> for Level {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Low),
            2 => Ok(Level::Medium),
            3 => Ok(Level::High),
            other => Err(ValidationError::InvalidLevel(other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as u8
    }
}

/// Difficulty of a flow task. Drives the flow grant and its decay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Easy = 1,
    Medium = 2,
    Hard = 3,
}

impl TryFrom<u8> for Difficulty {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Medium),
            3 => Ok(Difficulty::Hard),
            other => Err(ValidationError::InvalidLevel(other)),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty as u8
    }
}

/// A priority task.
///
/// `label` is private: it is stripped from public reads and the field is
/// omitted from the JSON entirely rather than serialized as null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub tag: String,
    pub risk: Level,
    pub urgency: Level,
    pub importance: Level,
}

impl Task {
    /// A new task with the default attributes (risk 1, urgency 1,
    /// importance 2, tag "misc").
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: Some(label.into()),
            tag: DEFAULT_TAG.to_string(),
            risk: Level::Low,
            urgency: Level::Low,
            importance: Level::Medium,
        }
    }

    /// Copy of this task with the private label removed.
    pub fn public_view(&self) -> Self {
        Self {
            label: None,
            ..self.clone()
        }
    }
}

/// Entry of the tag catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub value: String,
    pub label: String,
}

impl TagEntry {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A flow task waiting to be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTask {
    pub id: String,
    pub label: String,
    pub difficulty: Difficulty,
}

impl FlowTask {
    pub fn new(label: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            difficulty,
        }
    }
}

/// Immutable record of a completed flow task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowCompletion {
    pub difficulty: Difficulty,
    pub completed_at: DateTime<Utc>,
}

/// The flowkeeper document: active flow tasks plus completion history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    #[serde(default)]
    pub tasks: Vec<FlowTask>,
    #[serde(default)]
    pub completions: Vec<FlowCompletion>,
}

/// Cached cumulative usage totals from the external metering source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub tokens: u64,
    pub lines_of_code: u64,
    pub fetched_at: DateTime<Utc>,
}

impl UsageTotals {
    /// Per-axis maximum of two snapshots, keeping the newer fetch time.
    ///
    /// The upstream source is cumulative, so a lower reading is a transient
    /// glitch and never replaces a higher one.
    pub fn merge_max(self, other: UsageTotals) -> UsageTotals {
        UsageTotals {
            tokens: self.tokens.max(other.tokens),
            lines_of_code: self.lines_of_code.max(other.lines_of_code),
            fetched_at: self.fetched_at.max(other.fetched_at),
        }
    }

    /// Observed tokens consumed per line of code, if any lines exist.
    pub fn tokens_per_line(&self) -> Option<f64> {
        (self.lines_of_code > 0).then(|| self.tokens as f64 / self.lines_of_code as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_uses_defaults() {
        let task = Task::new("Write report");
        assert_eq!(task.risk, Level::Low);
        assert_eq!(task.urgency, Level::Low);
        assert_eq!(task.importance, Level::Medium);
        assert_eq!(task.tag, "misc");
        assert!(!task.id.is_empty());
    }

    #[test]
    fn public_view_omits_label_field() {
        let task = Task::new("secret plan");
        let json = serde_json::to_value(task.public_view()).unwrap();
        assert!(json.get("label").is_none());
        assert_eq!(json["importance"], 2);
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        let raw = r#"{"id":"a","tag":"misc","risk":4,"urgency":1,"importance":1}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
        let raw = r#"{"id":"a","tag":"misc","risk":0,"urgency":1,"importance":1}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }

    #[test]
    fn completion_uses_camel_case() {
        let completion = FlowCompletion {
            difficulty: Difficulty::Hard,
            completed_at: Utc::now(),
        };
        let json = serde_json::to_value(completion).unwrap();
        assert_eq!(json["difficulty"], 3);
        assert!(json.get("completedAt").is_some());
    }

    #[test]
    fn usage_merge_never_regresses() {
        let t0 = Utc::now();
        let high = UsageTotals {
            tokens: 1_000,
            lines_of_code: 40,
            fetched_at: t0,
        };
        let low = UsageTotals {
            tokens: 900,
            lines_of_code: 50,
            fetched_at: t0 + chrono::Duration::seconds(5),
        };
        let merged = high.merge_max(low);
        assert_eq!(merged.tokens, 1_000);
        assert_eq!(merged.lines_of_code, 50);
        assert_eq!(merged.fetched_at, low.fetched_at);
    }
}
