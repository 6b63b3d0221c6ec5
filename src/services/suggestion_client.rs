use std::sync::Arc;

use crate::error::AppError;
use crate::models::file_entry::EntryKind;
use crate::models::suggestion::Suggestion;
use crate::services::completion::{CompletionRequest, CompletionService};
use crate::services::prompt_builder::SYSTEM_PROMPT;

/// Strips a surrounding code fence (with or without a language tag).
pub fn normalize_reply(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Drops empty segments and immediate case-insensitive repeats like `Reports/reports`.
pub fn sanitize_folder_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
        let repeated = segments
            .last()
            .is_some_and(|prev| prev.eq_ignore_ascii_case(segment));
        if !repeated {
            segments.push(segment);
        }
    }
    segments.join("/")
}

fn points_into_itself(suggestion: &Suggestion, path: &str) -> bool {
    suggestion.kind == EntryKind::Folder
        && path.split('/').any(|segment| {
            segment.eq_ignore_ascii_case(suggestion.current_name.trim())
                || segment.eq_ignore_ascii_case(suggestion.new_name.trim())
        })
}

fn validate(mut suggestion: Suggestion) -> Option<Suggestion> {
    if suggestion.new_name.trim().is_empty() {
        return None;
    }
    suggestion.new_name = suggestion.new_name.trim().to_string();
    suggestion.new_folder = match suggestion.new_folder.take() {
        Some(raw) => {
            let path = sanitize_folder_path(&raw);
            if path.is_empty() {
                None
            } else if points_into_itself(&suggestion, &path) {
                tracing::warn!(
                    "dropping folder move for {}: {path} contains the folder itself",
                    suggestion.id
                );
                None
            } else {
                Some(path)
            }
        }
        None => None,
    };
    Some(suggestion)
}

/// Decodes a reply into validated suggestions, rebinding ids by array position.
/// Malformed elements and elements past the end of the request are dropped; a
/// reply that is not a JSON array is an error.
pub fn decode_suggestions(
    reply: &str,
    request_ids: &[String],
) -> Result<Vec<Suggestion>, AppError> {
    let payload = normalize_reply(reply);
    let elements: Vec<serde_json::Value> = serde_json::from_str(payload)?;
    if elements.len() > request_ids.len() {
        tracing::warn!(
            "reply has {} suggestions for {} entries; dropping the extras",
            elements.len(),
            request_ids.len()
        );
    }

    let mut out = Vec::with_capacity(elements.len().min(request_ids.len()));
    for (i, (mut element, id)) in elements.into_iter().zip(request_ids).enumerate() {
        if let Some(object) = element.as_object_mut() {
            object.insert("id".to_string(), serde_json::Value::String(id.clone()));
        }
        match serde_json::from_value::<Suggestion>(element) {
            Ok(suggestion) => match validate(suggestion) {
                Some(valid) => out.push(valid),
                None => tracing::warn!("dropping suggestion {i}: blank newName"),
            },
            Err(err) => tracing::warn!("dropping malformed suggestion {i}: {err}"),
        }
    }
    Ok(out)
}

pub struct SuggestionClient {
    completion: Arc<dyn CompletionService>,
    temperature: f32,
    max_tokens: u32,
}

impl SuggestionClient {
    pub fn new(completion: Arc<dyn CompletionService>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            completion,
            temperature,
            max_tokens,
        }
    }

    /// Never fails: service or decode errors yield an empty list.
    pub async fn suggest(&self, prompt: &str, request_ids: &[String]) -> Vec<Suggestion> {
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: prompt.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let reply = match self.completion.complete(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!("completion request failed: {err}");
                return Vec::new();
            }
        };
        match decode_suggestions(&reply, request_ids) {
            Ok(suggestions) => {
                tracing::debug!(
                    "decoded {} suggestions for {} entries",
                    suggestions.len(),
                    request_ids.len()
                );
                suggestions
            }
            Err(err) => {
                let preview: String = reply.chars().take(500).collect();
                tracing::warn!("suggestion decode failed: {err}; reply: {preview}");
                Vec::new()
            }
        }
    }
}
