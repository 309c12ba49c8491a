//! Reminder content limits and text utilities
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Subjects are forced onto one line before truncation
//! - 1.0.0: Shared UTF-8 safe truncation for every delivery channel

/// Rendered subject limit, matching common mailer caps
pub const SUBJECT_LIMIT: usize = 120;
/// Rendered body limit
pub const BODY_LIMIT: usize = 4000;

/// Truncate a rendered subject, collapsing any line breaks first.
pub fn truncate_subject(text: &str) -> String {
    let one_line = if text.contains('\n') {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.to_string()
    };
    truncate_text(&one_line, SUBJECT_LIMIT)
}

/// Truncate a rendered body to the channel-safe limit.
pub fn truncate_body(text: &str) -> String {
    truncate_text(text, BODY_LIMIT)
}

/// Truncate to `limit` bytes with an ellipsis, never splitting a UTF-8
/// character.
fn truncate_text(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit.saturating_sub(3);
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_passes_through() {
        assert_eq!(truncate_subject("Deadline soon"), "Deadline soon");
        assert_eq!(truncate_body("All fine"), "All fine");
    }

    #[test]
    fn test_long_subject_is_cut_with_ellipsis() {
        let subject = "x".repeat(500);
        let result = truncate_subject(&subject);
        assert!(result.len() <= SUBJECT_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_subject_newlines_collapse_to_spaces() {
        let result = truncate_subject("One week left:\nMerit   Grant");
        assert_eq!(result, "One week left: Merit Grant");
    }

    #[test]
    fn test_body_exactly_at_limit_is_untouched() {
        let body = "b".repeat(BODY_LIMIT);
        assert_eq!(truncate_body(&body), body);
    }

    #[test]
    fn test_truncation_respects_utf8_boundaries() {
        let body = "деньги на учёбу ".repeat(400);
        let result = truncate_body(&body);
        assert!(result.len() <= BODY_LIMIT);
        // Slicing mid-character would have panicked before we got here
        assert!(result.chars().count() > 0);
    }
}
