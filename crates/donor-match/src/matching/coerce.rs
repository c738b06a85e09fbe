//! Tolerant field readers for heterogeneous donor/request exports.
//!
//! Field readers degrade to a defined default instead of failing so a single
//! dirty record never aborts a dataset pass. Identifiers are the exception.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}

/// Text or numeric identifiers; null and structured values are rejected.
pub(crate) fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric identifier, found {other}"
        ))),
    }
}

pub(crate) fn lenient_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().map(age_from_float).unwrap_or(0),
        Some(Value::String(text)) => age_from_text(&text),
        _ => 0,
    })
}

/// Integer coercion for ages; negative, fractional-garbage, or blank input reads as 0.
pub(crate) fn age_from_text(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if let Ok(age) = trimmed.parse::<u32>() {
        return age;
    }
    trimmed.parse::<f64>().map(age_from_float).unwrap_or(0)
}

fn age_from_float(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Accepts `"Kidney;Liver"` or `["Kidney", "Liver"]`; arrays are re-joined with `;`.
pub(crate) fn organ_offers<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        ),
        _ => None,
    })
}

/// Organ names from either plain strings or `{ "organ": ... }` history entries.
pub(crate) fn organ_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name),
            Value::Object(mut entry) => match entry.remove("organ") {
                Some(Value::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        })
        .collect())
}

pub(crate) fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => parse_date(&text),
        _ => None,
    })
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_from_text_coerces_integers_and_floats() {
        assert_eq!(age_from_text("42"), 42);
        assert_eq!(age_from_text(" 35.0 "), 35);
        assert_eq!(age_from_text("-3"), 0);
        assert_eq!(age_from_text("unknown"), 0);
        assert_eq!(age_from_text(""), 0);
    }

    #[test]
    fn parse_date_supports_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_date("2025-06-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
        assert_eq!(parse_date("2025-06-02"), NaiveDate::from_ymd_opt(2025, 6, 2));
        assert!(parse_date("  ").is_none());
        assert!(parse_date("last spring").is_none());
    }
}
