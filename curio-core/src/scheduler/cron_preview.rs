//! Cron expression validation and upcoming-occurrence preview, exposed to
//! the (unimplemented) HTTP layer's schedule editor. See `spec.md` §4.10.

use chrono::{DateTime, Utc};

use super::parse_standard_cron;

/// Result of previewing a cron expression: either a list of upcoming UTC
/// occurrences, or a validation error — never both.
#[derive(Debug, Clone)]
pub struct CronPreview {
    pub valid: bool,
    pub occurrences: Vec<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Returns up to `count` (clamped to 1..=10) upcoming UTC occurrences of a
/// standard 5-field cron expression. An unparsable expression yields
/// `{valid: false, error}` rather than an error return, matching the
/// spec's "invalid expressions return `{valid: false, error}`" contract —
/// this is a user-facing preview, not a fallible operation the caller
/// needs to propagate.
pub fn preview_cron(expression: &str, count: usize) -> CronPreview {
    let count = count.clamp(1, 10);
    match parse_standard_cron(expression) {
        Ok(schedule) => CronPreview {
            valid: true,
            occurrences: schedule.after(&Utc::now()).take(count).collect(),
            error: None,
        },
        Err(e) => CronPreview {
            valid: false,
            occurrences: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_expression_yields_requested_occurrence_count() {
        let preview = preview_cron("0 3 * * 0", 5);
        assert!(preview.valid);
        assert_eq!(preview.occurrences.len(), 5);
        assert!(preview.error.is_none());
    }

    #[test]
    fn invalid_expression_is_reported_without_occurrences() {
        let preview = preview_cron("not a cron expression", 3);
        assert!(!preview.valid);
        assert!(preview.occurrences.is_empty());
        assert!(preview.error.is_some());
    }

    #[test]
    fn count_is_clamped_to_ten() {
        let preview = preview_cron("0 */6 * * *", 999);
        assert_eq!(preview.occurrences.len(), 10);
    }
}
