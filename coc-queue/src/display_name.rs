//! Deterministic `displayName` derivation when the caller didn't supply one.

use chrono::{DateTime, Local, Utc};

use crate::types::TaskPayload;

const MAX_PREVIEW: usize = 60;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}…")
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn derive(payload: &TaskPayload, created_at: DateTime<Utc>) -> String {
    match payload {
        TaskPayload::AiClarification { prompt, .. } => truncate(prompt, MAX_PREVIEW),
        TaskPayload::FollowPrompt {
            prompt_file_path, ..
        } => format!("Follow Prompt: {}", basename(prompt_file_path)),
        TaskPayload::CodeReview {
            diff_type,
            commit_sha,
        } => match commit_sha {
            Some(sha) => {
                let short: String = sha.chars().take(7).collect();
                format!("Code Review: {diff_type} ({short})")
            }
            None => format!("Code Review: {diff_type}"),
        },
        TaskPayload::ResolveComments { count } => format!("Resolve Comments ({count})"),
        TaskPayload::Custom { data } => match data.get("prompt").and_then(|v| v.as_str()) {
            Some(prompt) => truncate(prompt, MAX_PREVIEW),
            None => fallback(created_at),
        },
    }
}

/// Derive only if the caller-supplied name is absent or whitespace-only.
pub fn derive_if_needed(
    supplied: Option<&str>,
    payload: &TaskPayload,
    created_at: DateTime<Utc>,
) -> String {
    match supplied {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => derive(payload, created_at),
    }
}

fn fallback(created_at: DateTime<Utc>) -> String {
    let local = created_at.with_timezone(&Local);
    format!("Task @ {}", local.format("%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn ai_clarification_truncates_to_60_chars() {
        let long_prompt = "x".repeat(100);
        let payload = TaskPayload::AiClarification {
            prompt: long_prompt.clone(),
            working_directory: None,
        };
        let name = derive(&payload, ts());
        assert_eq!(name.chars().count(), 61); // 60 + ellipsis
        assert!(name.ends_with('…'));
    }

    #[test]
    fn ai_clarification_short_prompt_is_untouched() {
        let payload = TaskPayload::AiClarification {
            prompt: "hi there".to_string(),
            working_directory: None,
        };
        assert_eq!(derive(&payload, ts()), "hi there");
    }

    #[test]
    fn follow_prompt_uses_basename() {
        let payload = TaskPayload::FollowPrompt {
            prompt_file_path: "/a/b/plan.md".to_string(),
            plan_file_path: None,
            additional_context: None,
            working_directory: None,
        };
        assert_eq!(derive(&payload, ts()), "Follow Prompt: plan.md");
    }

    #[test]
    fn code_review_with_sha_truncates_to_seven_chars() {
        let payload = TaskPayload::CodeReview {
            diff_type: "pr".to_string(),
            commit_sha: Some("abcdef1234567890".to_string()),
        };
        assert_eq!(derive(&payload, ts()), "Code Review: pr (abcdef1)");
    }

    #[test]
    fn code_review_without_sha() {
        let payload = TaskPayload::CodeReview {
            diff_type: "pr".to_string(),
            commit_sha: None,
        };
        assert_eq!(derive(&payload, ts()), "Code Review: pr");
    }

    #[test]
    fn resolve_comments_includes_count() {
        let payload = TaskPayload::ResolveComments { count: 3 };
        assert_eq!(derive(&payload, ts()), "Resolve Comments (3)");
    }

    #[test]
    fn custom_with_prompt_string_uses_it() {
        let mut data = std::collections::HashMap::new();
        data.insert(
            "prompt".to_string(),
            serde_json::Value::String("do the thing".to_string()),
        );
        let payload = TaskPayload::Custom { data };
        assert_eq!(derive(&payload, ts()), "do the thing");
    }

    #[test]
    fn custom_without_prompt_falls_back_to_wall_clock() {
        let payload = TaskPayload::Custom {
            data: std::collections::HashMap::new(),
        };
        let name = derive(&payload, ts());
        assert!(name.starts_with("Task @ "));
    }

    #[test]
    fn derive_if_needed_respects_caller_supplied_name() {
        let payload = TaskPayload::ResolveComments { count: 1 };
        assert_eq!(
            derive_if_needed(Some("My Task"), &payload, ts()),
            "My Task"
        );
    }

    #[test]
    fn derive_if_needed_ignores_whitespace_only_name() {
        let payload = TaskPayload::ResolveComments { count: 1 };
        assert_eq!(
            derive_if_needed(Some("   "), &payload, ts()),
            "Resolve Comments (1)"
        );
    }
}
