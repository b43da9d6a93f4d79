//! Memory categories and the record schemas stored under each.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// The three kinds of long-term memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Free-form facts about the user
    Profile,
    /// The user's to-do list
    Todo,
    /// Preferences for maintaining the to-do list
    Instructions,
}

impl MemoryCategory {
    /// All categories, in prompt order
    pub const ALL: [MemoryCategory; 3] = [
        MemoryCategory::Profile,
        MemoryCategory::Todo,
        MemoryCategory::Instructions,
    ];

    /// First component of the store namespace
    pub fn namespace_label(self) -> &'static str {
        match self {
            MemoryCategory::Profile => "profile",
            MemoryCategory::Todo => "todo",
            MemoryCategory::Instructions => "instructions",
        }
    }

    /// Name of the schema tool the extractor exposes
    pub fn schema_name(self) -> &'static str {
        match self {
            MemoryCategory::Profile => "Profile",
            MemoryCategory::Todo => "ToDo",
            MemoryCategory::Instructions => "Instructions",
        }
    }

    /// Whether the namespace holds at most one record
    pub fn is_singleton(self) -> bool {
        !matches!(self, MemoryCategory::Todo)
    }

    /// Description shown to the model alongside the schema
    pub fn description(self) -> &'static str {
        match self {
            MemoryCategory::Profile => "This is the profile of the user you are chatting with",
            MemoryCategory::Todo => "A single item on the user's ToDo list",
            MemoryCategory::Instructions => {
                "The user's preferences for how ToDo list items are created and updated"
            }
        }
    }

    /// JSON schema for the record
    pub fn json_schema(self) -> Value {
        match self {
            MemoryCategory::Profile => json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "The user's name"},
                    "location": {"type": "string", "description": "Where the user lives"},
                    "job": {"type": "string", "description": "The user's job"},
                    "connections": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Personal connections of the user, such as family members, friends, or coworkers"
                    },
                    "interests": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Interests that the user has"
                    }
                }
            }),
            MemoryCategory::Todo => json!({
                "type": "object",
                "properties": {
                    "task": {"type": "string", "description": "The task to be completed."},
                    "time_to_complete": {
                        "type": "integer",
                        "description": "Estimated time to complete the task (minutes)."
                    },
                    "deadline": {
                        "type": "string",
                        "format": "date-time",
                        "description": "When the task needs to be completed by (if applicable)"
                    },
                    "solutions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of specific, actionable solutions (e.g., specific ideas, service providers, or concrete options relevant to completing the task)"
                    },
                    "status": {
                        "type": "string",
                        "enum": ["not started", "in progress", "done", "archived"],
                        "description": "Current status of the task"
                    }
                },
                "required": ["task"]
            }),
            MemoryCategory::Instructions => json!({
                "type": "object",
                "properties": {
                    "memory": {"type": "string", "description": "The instructions, as free text"}
                },
                "required": ["memory"]
            }),
        }
    }

    /// Validate a response against the schema and return its canonical form.
    pub fn normalize(self, value: Value) -> Result<Value, serde_json::Error> {
        match self {
            MemoryCategory::Profile => serde_json::to_value(serde_json::from_value::<Profile>(value)?),
            MemoryCategory::Todo => serde_json::to_value(serde_json::from_value::<Todo>(value)?),
            MemoryCategory::Instructions => {
                serde_json::to_value(serde_json::from_value::<Instructions>(value)?)
            }
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace_label())
    }
}

/// Facts about the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// The user's name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the user lives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The user's job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    /// Family, friends, coworkers
    pub connections: Vec<String>,
    /// Interests
    pub interests: Vec<String>,
}

/// Progress of a to-do item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodoStatus {
    /// Not yet begun
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    /// Being worked on
    #[serde(rename = "in progress")]
    InProgress,
    /// Finished
    #[serde(rename = "done")]
    Done,
    /// No longer relevant
    #[serde(rename = "archived")]
    Archived,
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    /// What needs doing
    pub task: String,
    /// Estimated minutes to complete
    #[serde(
        default,
        deserialize_with = "lenient_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_to_complete: Option<u32>,
    /// Due date. Offset-less times are read as UTC; a bare date means midnight.
    #[serde(
        default,
        deserialize_with = "lenient_deadline",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<Utc>>,
    /// Concrete options for getting it done
    #[serde(default)]
    pub solutions: Vec<String>,
    /// Current status
    #[serde(default)]
    pub status: TodoStatus,
}

impl Todo {
    /// A new, not-started task
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            time_to_complete: None,
            deadline: None,
            solutions: Vec::new(),
            status: TodoStatus::NotStarted,
        }
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a deadline written as RFC 3339, a naive date-time, or a date.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn lenient_deadline<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_deadline(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unrecognized deadline '{raw}'"))),
    }
}

// Whole numbers only, whether written as integers, floats or strings.
fn lenient_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let Some(raw) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let minutes = match &raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    minutes
        .and_then(|m| u32::try_from(m).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("time_to_complete must be a whole number of minutes, got {raw}")))
}

/// Free-text preferences for maintaining the to-do list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instructions {
    /// The instructions
    pub memory: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        assert!(MemoryCategory::Profile.is_singleton());
        assert!(MemoryCategory::Instructions.is_singleton());
        assert!(!MemoryCategory::Todo.is_singleton());
    }

    #[test]
    fn test_todo_defaults() {
        let value = MemoryCategory::Todo
            .normalize(json!({"task": "Buy milk"}))
            .unwrap();
        assert_eq!(value["status"], "not started");
        assert_eq!(value["solutions"], json!([]));
        assert!(value.get("deadline").is_none());
    }

    #[test]
    fn test_todo_requires_task() {
        assert!(MemoryCategory::Todo.normalize(json!({"status": "done"})).is_err());
    }

    #[test]
    fn test_todo_rejects_unknown_status() {
        let result = MemoryCategory::Todo.normalize(json!({"task": "x", "status": "blocked"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_accepts_partial() {
        let value = MemoryCategory::Profile
            .normalize(json!({"name": "Alex", "location": "Denver"}))
            .unwrap();
        let profile: Profile = serde_json::from_value(value).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alex"));
        assert_eq!(profile.location.as_deref(), Some("Denver"));
        assert!(profile.interests.is_empty());
    }

    #[test]
    fn test_deadline_parses_rfc3339() {
        let todo: Todo = serde_json::from_value(json!({
            "task": "File taxes",
            "deadline": "2026-04-15T00:00:00Z",
            "status": "in progress"
        }))
        .unwrap();
        assert!(todo.deadline.is_some());
        assert_eq!(todo.status, TodoStatus::InProgress);
    }

    fn deadline_of(raw: &str) -> Value {
        MemoryCategory::Todo
            .normalize(json!({"task": "File taxes", "deadline": raw}))
            .unwrap()["deadline"]
            .clone()
    }

    #[test]
    fn test_deadline_with_offset_converts_to_utc() {
        assert_eq!(deadline_of("2026-04-15T17:00:00-04:00"), "2026-04-15T21:00:00Z");
    }

    #[test]
    fn test_naive_deadline_is_utc() {
        assert_eq!(deadline_of("2026-04-15T17:00:00"), "2026-04-15T17:00:00Z");
        assert_eq!(deadline_of("2026-04-15 17:00:00"), "2026-04-15T17:00:00Z");
        assert_eq!(deadline_of("2026-04-15T17:00"), "2026-04-15T17:00:00Z");
    }

    #[test]
    fn test_date_only_deadline_is_midnight() {
        assert_eq!(deadline_of("2026-04-15"), "2026-04-15T00:00:00Z");
    }

    #[test]
    fn test_blank_or_null_deadline_is_absent() {
        let value = MemoryCategory::Todo
            .normalize(json!({"task": "x", "deadline": null}))
            .unwrap();
        assert!(value.get("deadline").is_none());
        let value = MemoryCategory::Todo
            .normalize(json!({"task": "x", "deadline": " "}))
            .unwrap();
        assert!(value.get("deadline").is_none());
    }

    #[test]
    fn test_garbage_deadline_is_rejected() {
        let err = MemoryCategory::Todo
            .normalize(json!({"task": "x", "deadline": "next tuesday"}))
            .unwrap_err();
        assert!(err.to_string().contains("next tuesday"));
    }

    #[test]
    fn test_time_to_complete_accepts_whole_numbers() {
        for raw in [json!(90), json!(90.0), json!("90")] {
            let value = MemoryCategory::Todo
                .normalize(json!({"task": "x", "time_to_complete": raw}))
                .unwrap();
            assert_eq!(value["time_to_complete"], 90);
        }
    }

    #[test]
    fn test_time_to_complete_rejects_fractions_and_negatives() {
        for raw in [json!(1.5), json!(-5), json!("soon")] {
            let result = MemoryCategory::Todo.normalize(json!({"task": "x", "time_to_complete": raw}));
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(MemoryCategory::Todo.schema_name(), "ToDo");
        assert_eq!(MemoryCategory::Profile.to_string(), "profile");
    }
}
