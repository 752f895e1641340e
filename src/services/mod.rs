use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::ServiceError;

// Pure availability computations
pub mod availability;

// Data access
pub mod designs;
pub mod materials;
pub mod orders;
pub mod products;

/// Trims a free-text field, mapping empty input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// For PATCH bodies: a present key (even `null`) becomes `Some`, an absent
/// key stays `None` through `#[serde(default)]`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid due date '{}'", raw)))
}

pub(crate) fn validate_priority(priority: Option<i32>) -> Result<(), ServiceError> {
    match priority {
        Some(p) if !(0..=2).contains(&p) => Err(ServiceError::ValidationError(
            "Priority must be 0 (normal), 1 (high) or 2 (urgent)".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn due_dates_accept_timestamps_and_plain_dates() {
        assert_eq!(
            parse_due_date("2025-06-01").unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("2025-06-01T12:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap()
        );
        assert!(parse_due_date("next tuesday").is_err());
    }

    #[test]
    fn priority_range() {
        assert!(validate_priority(None).is_ok());
        assert!(validate_priority(Some(2)).is_ok());
        assert!(validate_priority(Some(3)).is_err());
        assert!(validate_priority(Some(-1)).is_err());
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "present")]
        due: Option<Option<String>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"due": null}"#).unwrap();
        let value: Patch = serde_json::from_str(r#"{"due": "2025-01-01"}"#).unwrap();
        assert_eq!(absent.due, None);
        assert_eq!(null.due, Some(None));
        assert_eq!(value.due, Some(Some("2025-01-01".to_string())));
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Black ".into())), Some("Black".into()));
        assert_eq!(non_blank(None), None);
    }
}
