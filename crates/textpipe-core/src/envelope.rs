//! Responses API envelope parsing.

use tracing::warn;

/// Result text used when a response carries no `output_text` entries.
pub const NO_TEXT_PLACEHOLDER: &str = "No text content found in response";

/// Collects `output_text` entries of `message` items, one line per entry.
///
/// Returns `None` when the envelope holds no such entry.
pub fn extract_output_text(envelope: &serde_json::Value) -> Option<String> {
    let items = envelope.get("output").and_then(|v| v.as_array())?;
    let mut text = String::new();
    let mut found = false;
    for item in items {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for entry in content {
            if entry.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            found = true;
            if let Some(segment) = entry.get("text").and_then(|v| v.as_str()) {
                text.push_str(segment);
            }
            text.push('\n');
        }
    }
    found.then_some(text)
}

/// Turns a raw response body into the user-facing result text.
///
/// Bodies that are not JSON, or that contain nothing extractable, become
/// [`NO_TEXT_PLACEHOLDER`].
pub fn result_text(body: &str) -> String {
    let envelope: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                event = "envelope.invalid_json",
                domain = "response",
                body_len = body.len() as u64,
                error = %e
            );
            return NO_TEXT_PLACEHOLDER.to_string();
        }
    };
    extract_output_text(&envelope).unwrap_or_else(|| NO_TEXT_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_output_text_with_newline() {
        let body = serde_json::json!({
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "Hi there"}]}
            ]
        })
        .to_string();
        assert_eq!(result_text(&body), "Hi there\n");
    }

    #[test]
    fn keeps_order_across_items_and_skips_other_kinds() {
        let envelope = serde_json::json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "one"},
                    {"type": "refusal", "refusal": "nope"},
                    {"type": "output_text", "text": "two"}
                ]},
                {"type": "message", "content": [{"type": "output_text", "text": "three"}]}
            ]
        });
        assert_eq!(
            extract_output_text(&envelope).as_deref(),
            Some("one\ntwo\nthree\n")
        );
    }

    #[test]
    fn no_message_items_yields_placeholder() {
        let body = serde_json::json!({"output": [{"type": "reasoning"}]}).to_string();
        assert_eq!(result_text(&body), NO_TEXT_PLACEHOLDER);
    }

    #[test]
    fn empty_or_missing_output_yields_placeholder() {
        assert_eq!(result_text(r#"{"output": []}"#), NO_TEXT_PLACEHOLDER);
        assert_eq!(result_text(r#"{"id": "resp_1"}"#), NO_TEXT_PLACEHOLDER);
    }

    #[test]
    fn non_json_body_yields_placeholder() {
        assert_eq!(result_text("<html>gateway</html>"), NO_TEXT_PLACEHOLDER);
    }

    #[test]
    fn message_without_content_is_skipped() {
        let envelope = serde_json::json!({"output": [{"type": "message"}]});
        assert_eq!(extract_output_text(&envelope), None);
    }
}
