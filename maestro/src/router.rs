//! Routing: map the coordinator's last message to the next step.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::records::MemoryCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Memory category named by an `UpdateMemory` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// `"user"`: the profile
    User,
    /// `"todo"`: the to-do list
    Todo,
    /// `"instructions"`: to-do list preferences
    Instructions,
}

impl UpdateType {
    /// Wire value of the `update_type` argument
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateType::User => "user",
            UpdateType::Todo => "todo",
            UpdateType::Instructions => "instructions",
        }
    }

    /// Category the update writes to
    pub fn category(self) -> MemoryCategory {
        match self {
            UpdateType::User => MemoryCategory::Profile,
            UpdateType::Todo => MemoryCategory::Todo,
            UpdateType::Instructions => MemoryCategory::Instructions,
        }
    }
}

impl FromStr for UpdateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(UpdateType::User),
            "todo" => Ok(UpdateType::Todo),
            "instructions" => Ok(UpdateType::Instructions),
            other => Err(Error::UnknownUpdateType(other.to_string())),
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next step after the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No update requested; the turn is over
    Terminate,
    /// Run the to-do updater
    UpdateTodo,
    /// Run the profile updater
    UpdateProfile,
    /// Run the instructions updater
    UpdateInstructions,
}

impl From<UpdateType> for Route {
    fn from(update: UpdateType) -> Self {
        match update {
            UpdateType::User => Route::UpdateProfile,
            UpdateType::Todo => Route::UpdateTodo,
            UpdateType::Instructions => Route::UpdateInstructions,
        }
    }
}

/// Decide the next step from the coordinator's message.
///
/// Only the first tool call is consulted. A missing or unrecognized
/// `update_type` is an error, never a default.
pub fn route(last: &Message) -> Result<Route> {
    let Some(call) = last.first_tool_call() else {
        return Ok(Route::Terminate);
    };
    let update_type = match call.input.get("update_type") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Ok(update_type.parse::<UpdateType>()?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentBlock, Role};
    use serde_json::json;

    fn calls(update_types: &[&str]) -> Message {
        Message::new(
            Role::Assistant,
            update_types
                .iter()
                .enumerate()
                .map(|(i, t)| ContentBlock::tool_use(format!("c{i}"), "UpdateMemory", json!({"update_type": t})))
                .collect(),
        )
    }

    #[test]
    fn test_no_tool_call_terminates() {
        assert_eq!(route(&Message::assistant("Hi!")).unwrap(), Route::Terminate);
        assert_eq!(route(&Message::new(Role::Assistant, vec![])).unwrap(), Route::Terminate);
    }

    #[test]
    fn test_each_category() {
        assert_eq!(route(&calls(&["user"])).unwrap(), Route::UpdateProfile);
        assert_eq!(route(&calls(&["todo"])).unwrap(), Route::UpdateTodo);
        assert_eq!(route(&calls(&["instructions"])).unwrap(), Route::UpdateInstructions);
    }

    #[test]
    fn test_first_call_wins() {
        assert_eq!(route(&calls(&["todo", "user"])).unwrap(), Route::UpdateTodo);
        assert_eq!(route(&calls(&["todo", "calendar"])).unwrap(), Route::UpdateTodo);
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let err = route(&calls(&["calendar", "todo"])).unwrap_err();
        assert!(matches!(err, Error::UnknownUpdateType(ref v) if v == "calendar"));
    }

    #[test]
    fn test_missing_type_is_fatal() {
        let msg = Message::new(
            Role::Assistant,
            vec![ContentBlock::tool_use("c0", "UpdateMemory", json!({}))],
        );
        assert!(matches!(route(&msg), Err(Error::UnknownUpdateType(_))));
    }

    #[test]
    fn test_update_type_round_trip() {
        for t in [UpdateType::User, UpdateType::Todo, UpdateType::Instructions] {
            assert_eq!(t.as_str().parse::<UpdateType>().unwrap(), t);
        }
        assert_eq!(UpdateType::User.category(), MemoryCategory::Profile);
    }
}
