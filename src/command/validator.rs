//! Structural validation of action candidates
//!
//! Rules are checked in a fixed order and the first failure wins. Nothing
//! here talks to the tracker; whether a project actually exists is the
//! executor's concern.

use crate::core::error::{AgentError, Result};
use crate::core::types::{Action, ActionKind, IssueType};
use crate::llm::parser::ActionCandidate;
use regex::Regex;
use std::sync::OnceLock;

pub const SUMMARY_MIN_CHARS: usize = 5;
pub const SUMMARY_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

fn project_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{2,10}$").expect("static regex"))
}

/// Validate one candidate into an [`Action`]
pub fn validate(candidate: &ActionCandidate) -> Result<Action> {
    let kind = candidate
        .action
        .as_deref()
        .and_then(ActionKind::from_wire)
        .ok_or_else(|| AgentError::validation("action", "unsupported action"))?;

    let project = candidate
        .project
        .as_deref()
        .map(|p| p.trim().to_uppercase())
        .filter(|p| project_key_pattern().is_match(p))
        .ok_or_else(|| AgentError::validation("project", "invalid project key"))?;

    let summary = candidate.summary.as_deref().unwrap_or("").trim();
    let summary_len = summary.chars().count();
    if !(SUMMARY_MIN_CHARS..=SUMMARY_MAX_CHARS).contains(&summary_len) {
        return Err(AgentError::validation("summary", "invalid summary length"));
    }

    let description = candidate
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_CHARS) {
        return Err(AgentError::validation("description", "description too long"));
    }

    let issue_type = match candidate.issue_type.as_deref() {
        None => IssueType::default(),
        Some(name) => IssueType::parse(name)
            .ok_or_else(|| AgentError::validation("issue_type", "unsupported issue type"))?,
    };

    Ok(Action {
        kind,
        project,
        summary: summary.to_string(),
        description: description.map(str::to_string),
        issue_type,
    })
}

/// Validate a whole batch, fail-fast
///
/// Candidates without a project take `default_project` first, so a command
/// aimed at a project does not need the model to repeat it.
pub fn validate_batch(
    candidates: &[ActionCandidate],
    default_project: Option<&str>,
    max_actions: usize,
) -> Result<Vec<Action>> {
    if candidates.len() > max_actions {
        return Err(AgentError::validation(
            "actions",
            format!("too many actions ({} > {})", candidates.len(), max_actions),
        ));
    }

    candidates
        .iter()
        .map(|candidate| match (&candidate.project, default_project) {
            (None, Some(project)) => validate(&ActionCandidate {
                project: Some(project.to_string()),
                ..candidate.clone()
            }),
            _ => validate(candidate),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parser;
    use proptest::prelude::*;

    fn candidate(action: &str, project: &str, summary: &str) -> ActionCandidate {
        ActionCandidate {
            action: Some(action.into()),
            project: Some(project.into()),
            summary: Some(summary.into()),
            ..ActionCandidate::default()
        }
    }

    fn failing_field<T: std::fmt::Debug>(result: Result<T>) -> (&'static str, String) {
        match result {
            Err(AgentError::Validation { field, message }) => (field, message),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_candidate() {
        let action = validate(&candidate("create_issue", "test", "  Fix login bug ")).unwrap();
        assert_eq!(action.kind, ActionKind::Create);
        assert_eq!(action.project, "TEST");
        assert_eq!(action.summary, "Fix login bug");
        assert_eq!(action.description, None);
        assert_eq!(action.issue_type, IssueType::Task);
    }

    #[test]
    fn test_unknown_kind() {
        let (field, message) = failing_field(validate(&candidate("find_issues", "TEST", "Fix login bug")));
        assert_eq!(field, "action");
        assert_eq!(message, "unsupported action");
    }

    #[test]
    fn test_missing_kind() {
        let mut c = candidate("x", "TEST", "Fix login bug");
        c.action = None;
        assert_eq!(failing_field(validate(&c)).1, "unsupported action");
    }

    #[test]
    fn test_invalid_project_keys() {
        for key in ["T", "TEST1", "ABCDEFGHIJK", "TE ST", "", "TÉST"] {
            let (field, message) = failing_field(validate(&candidate("create_issue", key, "Fix login bug")));
            assert_eq!(field, "project", "key {:?}", key);
            assert_eq!(message, "invalid project key");
        }
        assert!(validate(&candidate("create_issue", "ab", "Fix login bug")).is_ok());
        assert!(validate(&candidate("create_issue", "ABCDEFGHIJ", "Fix login bug")).is_ok());
    }

    #[test]
    fn test_summary_bounds() {
        let (field, message) = failing_field(validate(&candidate("create_issue", "TEST", "Fix")));
        assert_eq!(field, "summary");
        assert_eq!(message, "invalid summary length");

        assert!(validate(&candidate("create_issue", "TEST", "Fixes")).is_ok());
        assert!(validate(&candidate("create_issue", "TEST", &"a".repeat(255))).is_ok());
        assert!(validate(&candidate("create_issue", "TEST", &"a".repeat(256))).is_err());
        assert!(validate(&candidate("create_issue", "TEST", "      ")).is_err());
    }

    #[test]
    fn test_summary_counts_chars_not_bytes() {
        assert!(validate(&candidate("create_issue", "TEST", &"é".repeat(200))).is_ok());
    }

    #[test]
    fn test_rule_order_first_failure_wins() {
        let (field, _) = failing_field(validate(&candidate("nope", "x", "")));
        assert_eq!(field, "action");
        let (field, _) = failing_field(validate(&candidate("create_issue", "x", "")));
        assert_eq!(field, "project");
    }

    #[test]
    fn test_description_limit() {
        let mut c = candidate("create_issue", "TEST", "Fix login bug");
        c.description = Some("d".repeat(2000));
        assert!(validate(&c).is_ok());
        c.description = Some("d".repeat(2001));
        assert_eq!(failing_field(validate(&c)).0, "description");
    }

    #[test]
    fn test_issue_type() {
        let mut c = candidate("create_issue", "TEST", "Fix login bug");
        c.issue_type = Some("bug".into());
        assert_eq!(validate(&c).unwrap().issue_type, IssueType::Bug);
        c.issue_type = Some("Incident".into());
        assert_eq!(failing_field(validate(&c)).0, "issue_type");
    }

    #[test]
    fn test_batch_fails_on_any_invalid_action() {
        let batch = vec![
            candidate("create_issue", "TEST", "First task"),
            candidate("create_issue", "TEST", "no"),
        ];
        assert_eq!(failing_field(validate_batch(&batch, None, 10)).0, "summary");
    }

    #[test]
    fn test_batch_size_limit() {
        let batch = vec![candidate("create_issue", "TEST", "Some task"); 3];
        let err = validate_batch(&batch, None, 2).unwrap_err();
        assert!(matches!(err, AgentError::Validation { field: "actions", .. }));
        assert_eq!(validate_batch(&batch, None, 3).unwrap().len(), 3);
    }

    #[test]
    fn test_batch_default_project() {
        let mut c = candidate("create_issue", "x", "Update footer");
        c.project = None;
        let actions = validate_batch(&[c.clone()], Some("web"), 10).unwrap();
        assert_eq!(actions[0].project, "WEB");
        assert_eq!(failing_field(validate_batch(&[c], None, 10)).0, "project");
    }

    #[test]
    fn test_batch_explicit_project_wins() {
        let batch = vec![candidate("create_issue", "api", "Rotate logs")];
        let actions = validate_batch(&batch, Some("WEB"), 10).unwrap();
        assert_eq!(actions[0].project, "API");
    }

    proptest! {
        #[test]
        fn prop_single_payload_round_trips(
            project in "[a-zA-Z]{2,10}",
            summary in "[a-zA-Z0-9][a-zA-Z0-9 ]{3,60}[a-zA-Z0-9]",
            description in proptest::option::of("[a-zA-Z0-9][a-zA-Z0-9 ]{0,80}[a-zA-Z0-9]"),
        ) {
            let mut payload = serde_json::json!({
                "action": "create_issue",
                "project": project,
                "summary": summary,
            });
            if let Some(d) = &description {
                payload["description"] = serde_json::Value::String(d.clone());
            }

            let candidates = parser::parse(&payload.to_string()).unwrap();
            prop_assert_eq!(candidates.len(), 1);
            let action = validate(&candidates[0]).unwrap();
            prop_assert_eq!(action.kind, ActionKind::Create);
            prop_assert_eq!(action.project, project.to_uppercase());
            prop_assert_eq!(action.summary, summary);
            prop_assert_eq!(action.description, description);
        }
    }
}
