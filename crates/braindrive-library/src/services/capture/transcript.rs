// Transcript ingestion
//
// Turns an uploaded transcript document into an ingestion prompt. Long
// transcripts are truncated to a fixed character budget with an explicit
// marker so the model knows material was cut.

/// Maximum transcript characters forwarded to the model.
pub const TRANSCRIPT_CHAR_LIMIT: usize = 12_000;

const TRUNCATION_MARKER: &str = "\n\n[Transcript truncated]";

/// Default source tag for ingestion prompts; the module config can
/// override it so downstream tooling can attribute the captured material.
pub const TRANSCRIPT_SOURCE: &str = "capture-upload";

/// Truncate a transcript to the character budget, appending a marker when
/// anything was cut. Counts characters, not bytes, so multi-byte text is
/// never split mid-character.
pub fn truncate_transcript(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(TRANSCRIPT_CHAR_LIMIT) {
        None => text.to_string(),
        Some((byte_offset, _)) => {
            let mut truncated = text[..byte_offset].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
    }
}

/// Build the ingestion prompt for an uploaded transcript.
///
/// The prompt instructs the model to propose what to capture but to wait
/// for explicit approval before writing anything.
pub fn build_ingestion_prompt(source: &str, file_name: &str, transcript: &str) -> String {
    let body = truncate_transcript(transcript);
    format!(
        "I am uploading a transcript ({source}: {file_name}). Review it, \
         summarize the key points, and propose any notes, tasks, or \
         decisions worth capturing. Do not write anything until I \
         explicitly approve each proposal.\n\n---\n{body}",
        source = source,
        file_name = file_name,
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_transcript_passes_through() {
        let text = "short transcript";
        assert_eq!(truncate_transcript(text), text);
    }

    #[test]
    fn test_exactly_at_limit_is_untouched() {
        let text = "a".repeat(TRANSCRIPT_CHAR_LIMIT);
        assert_eq!(truncate_transcript(&text), text);
    }

    #[test]
    fn test_over_limit_truncates_with_marker() {
        let text = "a".repeat(TRANSCRIPT_CHAR_LIMIT + 1);
        let truncated = truncate_transcript(&text);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            truncated.len(),
            TRANSCRIPT_CHAR_LIMIT + TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        // 3-byte characters; byte length far exceeds the char limit
        let text = "\u{65e5}".repeat(TRANSCRIPT_CHAR_LIMIT + 5);
        let truncated = truncate_transcript(&text);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        let kept = truncated.trim_end_matches(TRUNCATION_MARKER);
        assert_eq!(kept.chars().count(), TRANSCRIPT_CHAR_LIMIT);
    }

    #[test]
    fn test_ingestion_prompt_mentions_file_and_requires_approval() {
        let prompt =
            build_ingestion_prompt(TRANSCRIPT_SOURCE, "standup.txt", "we discussed things");
        assert!(prompt.contains("standup.txt"));
        assert!(prompt.contains("capture-upload"));
        assert!(prompt.contains("explicitly approve"));
        assert!(prompt.ends_with("we discussed things"));
    }

    #[test]
    fn test_ingestion_prompt_uses_configured_source() {
        let prompt = build_ingestion_prompt("meeting-import", "notes.txt", "hello");
        assert!(prompt.contains("(meeting-import: notes.txt)"));
    }
}
