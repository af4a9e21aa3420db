//! Build the prompt sent to the LLM
//!
//! The formatter is pure: the same command always yields the same prompt.

use crate::core::types::Command;

/// Fixed instruction describing the response schema
pub const SYSTEM_INSTRUCTION: &str = r#"You are a Jira assistant. Translate the user's request into issue tracker actions.
Return ONLY JSON, wrapped in <answer></answer> tags. You may think first, but nothing outside the tags is read.

AVAILABLE ACTIONS:
- create_issue: create a new issue
- update_issue: change an existing issue
- comment_issue: comment on an issue
- transition_issue: move an issue to another status

FIELDS:
- "action": one of the actions above
- "project": project key, 2-10 letters, UPPERCASE (e.g. "TEST")
- "summary": 5-255 characters
- "description": optional, at most 2000 characters
- "issue_type": optional, one of "Task", "Bug", "Story", "Epic" (default "Task")

OUTPUT FORMAT, single action:
<answer>{"action": "create_issue", "project": "TEST", "summary": "Task summary here", "description": "Details"}</answer>

OUTPUT FORMAT, several issues:
<answer>{"action": "create_issues", "issues": [{"project": "TEST", "summary": "First task"}, {"project": "TEST", "summary": "Second task"}]}</answer>

Examples:
"Create a bug ticket for login page in TEST" -> <answer>{"action": "create_issue", "project": "TEST", "summary": "Fix login page bug", "issue_type": "Bug"}</answer>
"Add two tasks to WEB: update the footer and fix the logo" -> <answer>{"action": "create_issues", "issues": [{"project": "WEB", "summary": "Update the footer"}, {"project": "WEB", "summary": "Fix the logo"}]}</answer>
"#;

/// Render the full prompt for a command
pub fn format(command: &Command) -> String {
    let mut prompt = String::from(SYSTEM_INSTRUCTION);

    if let Some(project) = command
        .target_project
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        prompt.push_str(&format!(
            "\nDEFAULT PROJECT: {} (use it when the request names no project)\n",
            project.to_uppercase()
        ));
    }

    prompt.push_str("\nUSER REQUEST:\n");
    prompt.push_str(command.text.trim());
    prompt
}
