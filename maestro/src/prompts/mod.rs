//! Prompt templates.
//!
//! Templates are plain text with `{name}` placeholders, filled by simple
//! substitution so braces inside rendered JSON are never re-interpreted.

use crate::records::MemoryCategory;
use crate::store::Item;
use chrono::{DateTime, Utc};

const COORDINATOR: &str = include_str!("coordinator.txt");
const EXTRACTION: &str = include_str!("extraction.txt");
const EXISTING: &str = include_str!("existing.txt");
const INSTRUCTIONS: &str = include_str!("instructions.txt");

/// Trailing request appended to the instructions rewrite
pub const INSTRUCTIONS_REQUEST: &str = "Please update the instructions based on the conversation";

/// Coordinator system prompt with the three memory snapshots embedded
pub fn coordinator(user_profile: &str, todo: &str, instructions: &str) -> String {
    fill(
        COORDINATOR,
        &[
            ("user_profile", user_profile),
            ("todo", todo),
            ("instructions", instructions),
        ],
    )
}

/// Extraction system prompt for schema categories, listing existing records
pub fn extraction(now: DateTime<Utc>, category: MemoryCategory, existing: &[Item]) -> String {
    let mut prompt = fill(EXTRACTION, &[("time", &now.to_rfc3339())]);
    if !existing.is_empty() {
        let listing = existing
            .iter()
            .map(|item| format!("[{}] {}: {}", item.key, category.schema_name(), item.value))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str("\n\n");
        prompt.push_str(&fill(
            EXISTING,
            &[("schema", category.schema_name()), ("existing", &listing)],
        ));
    }
    prompt
}

/// Instructions rewrite prompt embedding the current instructions
pub fn instructions(now: DateTime<Utc>, current: Option<&str>) -> String {
    fill(
        INSTRUCTIONS,
        &[
            ("current_instructions", current.unwrap_or("None")),
            ("time", &now.to_rfc3339()),
        ],
    )
}

// Single pass, so substituted values are never scanned for placeholders.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template.trim_end();
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let var = after
            .find('}')
            .map(|end| &after[..end])
            .and_then(|name| vars.iter().find(|(k, _)| *k == name).map(|v| (name, v.1)));
        match var {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinator_embeds_snapshots() {
        let prompt = coordinator(r#"{"name":"Alex"}"#, "", "");
        assert!(prompt.contains("<user_profile>\n{\"name\":\"Alex\"}\n</user_profile>"));
        assert!(prompt.contains("<todo>\n\n</todo>"));
        assert!(!prompt.contains("{user_profile}"));
    }

    #[test]
    fn test_coordinator_policy() {
        let prompt = coordinator("", "", "");
        assert!(prompt.contains("Do not tell the user you have updated the user's profile"));
        assert!(prompt.contains("Do not tell the user that you have updated instructions"));
        assert!(prompt.contains("No need to ask for explicit permission"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let prompt = coordinator("{todo}", "real", "");
        assert!(prompt.contains("<user_profile>\n{todo}\n</user_profile>"));
    }

    #[test]
    fn test_extraction_lists_existing() {
        let now = Utc::now();
        assert!(!extraction(now, MemoryCategory::Todo, &[]).contains("<existing>"));

        let item = Item {
            key: "abc".into(),
            value: json!({"task": "buy milk"}),
            created_at: now,
            updated_at: now,
        };
        let prompt = extraction(now, MemoryCategory::Todo, &[item]);
        assert!(prompt.starts_with("Reflect on following interaction."));
        assert!(prompt.contains(r#"[abc] ToDo: {"task":"buy milk"}"#));
    }

    #[test]
    fn test_instructions_prompt() {
        let prompt = instructions(Utc::now(), None);
        assert!(prompt.contains("<current_instructions>\nNone\n</current_instructions>"));
    }
}
