//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::config::MAX_UPCOMING_DAYS;
use crate::domain::TaskId;
use chrono::NaiveDate;

/// Maximum title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Parse a task ID: a positive integer, optionally written as `#N`.
pub fn parse_task_id(s: &str) -> Result<TaskId, String> {
    let id: TaskId = s
        .parse()
        .map_err(|_| format!("Invalid task ID '{}'. Expected a number such as 12 or #12", s.trim()))?;
    if id.get() == 0 {
        return Err("Task IDs start at 1".to_string());
    }
    Ok(id)
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {e}. Expected YYYY-MM-DD", s.trim()))
}

/// Parse an upcoming-deadlines window in days.
pub fn parse_days(s: &str) -> Result<u32, String> {
    let days: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number of days '{}'", s.trim()))?;
    if !(1..=MAX_UPCOMING_DAYS).contains(&days) {
        return Err(format!("Days must be between 1 and {MAX_UPCOMING_DAYS}"));
    }
    Ok(days)
}

/// Validate title length.
///
/// Titles are trimmed, single-line, non-empty and at most
/// [`MAX_TITLE_LENGTH`] characters.
pub fn validate_title(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    let length = s.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters, got {length} characters"
        ));
    }

    if s.contains('\n') || s.contains('\r') {
        return Err("Title cannot contain newline characters".to_string());
    }

    // Control characters excluding tab
    if let Some(pos) = s.chars().position(|c| {
        let code = u32::from(c);
        (code < 0x20 && code != 0x09) || (0x7F..=0x9F).contains(&code)
    }) {
        return Err(format!(
            "Title contains invalid control character at position {pos}"
        ));
    }

    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12", 12)]
    #[case("#12", 12)]
    #[case(" 3 ", 3)]
    fn task_ids_parse(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(parse_task_id(input).unwrap(), TaskId(expected));
    }

    #[rstest]
    #[case::zero("0", "start at 1")]
    #[case::negative("-4", "Invalid task ID")]
    #[case::word("abc", "Invalid task ID")]
    #[case::empty("", "Invalid task ID")]
    fn bad_task_ids_are_rejected(#[case] input: &str, #[case] expected: &str) {
        let err = parse_task_id(input).unwrap_err();
        assert!(err.contains(expected), "got: {err}");
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date("2025-03-12").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
        );
        assert!(parse_date("12/03/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }

    #[rstest]
    #[case("1", true)]
    #[case("3650", true)]
    #[case("0", false)]
    #[case("3651", false)]
    #[case("soon", false)]
    fn days_range(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_days(input).is_ok(), ok);
    }

    #[rstest]
    #[case::valid("Pour foundation", true)]
    #[case::trimmed("  Frame walls  ", true)]
    #[case::empty("   ", false)]
    #[case::newline("Line\nbreak", false)]
    #[case::control("Bell\u{7}", false)]
    #[case::tab("Tab\there", true)]
    fn titles(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_title(input).is_ok(), ok);
    }

    #[test]
    fn title_length_counts_characters() {
        assert!(validate_title(&"é".repeat(MAX_TITLE_LENGTH)).is_ok());
        let err = validate_title(&"a".repeat(MAX_TITLE_LENGTH + 1)).unwrap_err();
        assert!(err.contains("cannot exceed 200"));
    }
}
