//! Extract structured actions from raw LLM text
//!
//! Models answer in one of two dialects:
//! - a marker dialect, where the JSON sits between `<answer>` and `</answer>`
//!   and may be surrounded by free text or a `<think>` block;
//! - bare JSON, where the payload is the first balanced `{...}` object, or a
//!   top-level `[...]` array of actions when the text starts with one.
//!
//! Whatever shape the payload takes (single action, `issues` batch,
//! `actions` batch) it is normalized to a list of [`ActionCandidate`]s.
//! Candidates are unvalidated; see [`crate::command::validator`].

use crate::core::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const ANSWER_OPEN: &str = "<answer>";
const ANSWER_CLOSE: &str = "</answer>";

/// An action as the model described it, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCandidate {
    /// Wire name, e.g. `create_issue`
    pub action: Option<String>,
    pub project: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<String>,
}

/// Parse raw model output into action candidates
pub fn parse(raw_text: &str) -> Result<Vec<ActionCandidate>> {
    let visible = strip_think(raw_text);
    let region = answer_region(&visible).unwrap_or(visible.as_str());

    let value = match leading_array(region) {
        Some(array) => array,
        None => {
            let json = find_balanced_object(region)
                .ok_or_else(|| AgentError::parse("no structured payload found", raw_text))?;
            serde_json::from_str(json)
                .map_err(|e| AgentError::parse(format!("malformed payload: {}", e), raw_text))?
        }
    };

    let candidates = normalize(value).map_err(|msg| AgentError::parse(msg, raw_text))?;
    if candidates.is_empty() {
        return Err(AgentError::parse("empty action list", raw_text));
    }
    Ok(candidates)
}

/// Remove every `<think>...</think>` segment; an unterminated one swallows
/// the rest of the text
fn strip_think(text: &str) -> String {
    let mut output = text.to_string();
    while let Some(start) = output.find(THINK_OPEN) {
        match output[start + THINK_OPEN.len()..].find(THINK_CLOSE) {
            Some(rel_end) => {
                let end = start + THINK_OPEN.len() + rel_end + THINK_CLOSE.len();
                output.replace_range(start..end, "");
            }
            None => {
                output.truncate(start);
                break;
            }
        }
    }
    output
}

/// Text between the first `<answer>` and its closing tag (or end of text)
fn answer_region(text: &str) -> Option<&str> {
    let start = text.find(ANSWER_OPEN)? + ANSWER_OPEN.len();
    let rest = &text[start..];
    Some(match rest.find(ANSWER_CLOSE) {
        Some(end) => &rest[..end],
        None => rest,
    })
}

/// A JSON array the region opens with, e.g. `[{...}, {...}]`
///
/// Falls through to the object search when the bracketed text is not JSON,
/// so prose such as `[note] {...}` still parses.
fn leading_array(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('[') {
        return None;
    }
    let len = balanced_end(trimmed, '[', ']')?;
    serde_json::from_str::<Value>(&trimmed[..len])
        .ok()
        .filter(Value::is_array)
}

/// First `{...}` block whose braces balance, ignoring braces inside strings
fn find_balanced_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        balanced_end(&text[start..], '{', '}').map(|len| &text[start..start + len])
    })
}

/// Byte length of the balanced block starting at `text[0] == open`
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Flatten the accepted payload shapes into candidates
fn normalize(value: Value) -> std::result::Result<Vec<ActionCandidate>, String> {
    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => return batch_from(&items, &ActionCandidate::default()),
        _ => return Err("malformed payload: expected a JSON object".into()),
    };

    let batch = ["actions", "issues"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array));

    match batch {
        Some(items) => batch_from(items, &candidate_from(&object)),
        None => Ok(vec![candidate_from(&object)]),
    }
}

fn batch_from(
    items: &[Value],
    defaults: &ActionCandidate,
) -> std::result::Result<Vec<ActionCandidate>, String> {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Ok(candidate_from(map).inherit(defaults)),
            _ => Err("malformed payload: batch entries must be objects".to_string()),
        })
        .collect()
}

fn candidate_from(map: &Map<String, Value>) -> ActionCandidate {
    ActionCandidate {
        action: string_field(map, &["action", "type"]),
        project: string_field(map, &["project", "project_key"]),
        summary: string_field(map, &["summary"]),
        description: string_field(map, &["description"]),
        issue_type: string_field(map, &["issue_type", "issuetype"]),
    }
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

impl ActionCandidate {
    /// Fill the batch-level action and project into an entry that lacks them
    fn inherit(mut self, defaults: &ActionCandidate) -> Self {
        if self.action.is_none() {
            self.action = defaults.action.clone();
        }
        if self.project.is_none() {
            self.project = defaults.project.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse_err(raw: &str) -> String {
        match parse(raw) {
            Err(AgentError::Parse { message, .. }) => message,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_answer_dialect() {
        let raw = r#"<answer>{"action":"create_issue","project":"test","summary":"Fix login bug"}</answer>"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].action.as_deref(), Some("create_issue"));
        assert_eq!(candidates[0].project.as_deref(), Some("test"));
        assert_eq!(candidates[0].summary.as_deref(), Some("Fix login bug"));
    }

    #[test]
    fn test_think_block_ignored() {
        let raw = r#"<think>The user wants {"project": "WRONG"} maybe</think>
Sure thing.
<answer>
```json
{"action": "create_issue", "project": "TEST", "summary": "Fix login bug"}
```
</answer>"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates[0].project.as_deref(), Some("TEST"));
    }

    #[test]
    fn test_unterminated_think_swallows_rest() {
        let raw = r#"<think>still thinking {"action":"create_issue"}"#;
        assert_eq!(parse_err(raw), "no structured payload found");
    }

    #[test]
    fn test_bare_json_with_surrounding_text() {
        let raw = r#"Here is the action:
{"action": "create_issue", "project": "WEB", "summary": "Update footer", "description": "Use {year}"}
Let me know if you need anything else. {"ignored": true}"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description.as_deref(), Some("Use {year}"));
    }

    #[test]
    fn test_braces_inside_strings_do_not_unbalance() {
        let raw = r#"{"action":"create_issue","project":"WEB","summary":"Close } and \" quote"}"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates[0].summary.as_deref(), Some("Close } and \" quote"));
    }

    #[test]
    fn test_issues_batch_inherits_action_and_project() {
        let raw = r#"<answer>{"action":"create_issues","project":"WEB","issues":[
            {"summary":"Update the footer"},
            {"project":"API","summary":"Rotate logs"}]}</answer>"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].action.as_deref(), Some("create_issues"));
        assert_eq!(candidates[0].project.as_deref(), Some("WEB"));
        assert_eq!(candidates[1].project.as_deref(), Some("API"));
    }

    #[test]
    fn test_actions_batch_with_type_field() {
        let raw = r#"{"success": true, "message": "", "actions": [
            {"type": "create_issue", "project": "TEST", "summary": "First task"},
            {"type": "update_issue", "project": "TEST", "summary": "Second task"}]}"#;
        let candidates = parse(raw).unwrap();
        let kinds: Vec<_> = candidates.iter().map(|c| c.action.as_deref()).collect();
        assert_eq!(kinds, vec![Some("create_issue"), Some("update_issue")]);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let raw = r#"{"action":"create_issue","project":"TEST","summary":"Fix it now","priority":"High","labels":["x"]}"#;
        let candidates = parse(raw).unwrap();
        assert_eq!(candidates[0].summary.as_deref(), Some("Fix it now"));
    }

    #[test]
    fn test_no_payload() {
        assert_eq!(
            parse_err("I don't understand that command"),
            "no structured payload found"
        );
    }

    #[test]
    fn test_answer_without_json() {
        assert_eq!(
            parse_err("<answer>no json here</answer> {\"action\":\"x\"}"),
            "no structured payload found"
        );
    }

    #[test]
    fn test_malformed_payload_includes_diagnostic() {
        let message = parse_err(r#"<answer>{"action": create_issue}</answer>"#);
        assert!(message.starts_with("malformed payload: "));
        assert!(message.len() > "malformed payload: ".len());
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(parse_err(r#"{"actions": []}"#), "empty action list");
    }

    #[test]
    fn test_non_object_batch_entry() {
        let message = parse_err(r#"{"actions": ["create an issue"]}"#);
        assert!(message.contains("must be objects"));
    }

    #[test]
    fn test_parse_error_carries_excerpt() {
        let raw = "x".repeat(500);
        match parse(&raw) {
            Err(AgentError::Parse { excerpt, .. }) => assert_eq!(excerpt.len(), 203),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_top_level_array_is_a_batch() {
        let candidates = parse(
            r#"[{"action":"create_issue","project":"TEST","summary":"First task"},
                {"action":"create_issue","project":"WEB","summary":"Second task"}]"#,
        )
        .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].project.as_deref(), Some("WEB"));
    }

    #[test]
    fn test_array_inside_answer_tags() {
        let raw = r#"<think>two of them</think><answer> [{"summary":"First task"},{"summary":"Second task"}] </answer>"#;
        assert_eq!(parse(raw).unwrap().len(), 2);
    }

    #[test]
    fn test_bracketed_prose_falls_back_to_object() {
        let candidates = parse(r#"[note] {"action":"create_issue","summary":"Fix login bug"}"#).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_empty_top_level_array() {
        assert_eq!(parse_err("[]"), "empty action list");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(parse_err(""), "no structured payload found");
    }

    proptest! {
        #[test]
        fn prop_text_without_braces_never_parses(text in "[^{}]*") {
            let is_parse_error = matches!(parse(&text), Err(AgentError::Parse { .. }));
            prop_assert!(is_parse_error);
        }

        #[test]
        fn prop_reasoning_around_answer_is_ignored(
            before in "[a-zA-Z .,]{0,40}",
            after in "[a-zA-Z .,]{0,40}",
            summary in "[a-zA-Z ]{5,40}",
        ) {
            let payload = serde_json::json!({
                "action": "create_issue",
                "project": "TEST",
                "summary": summary,
            });
            let raw = format!("<think>{{ draft }}</think>{}<answer>{}</answer>{}", before, payload, after);
            let candidates = parse(&raw).unwrap();
            prop_assert_eq!(candidates.len(), 1);
            prop_assert_eq!(candidates[0].summary.as_deref(), Some(summary.as_str()));
        }
    }
}
