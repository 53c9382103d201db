use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Strip invisible characters and collapse whitespace in free-text fields.
pub(crate) fn clean_text(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lookup key: lowercase ASCII alphanumerics only.
pub(crate) fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Non-empty, cleaned string or `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(clean_text)
        .filter(|cleaned| !cleaned.is_empty())
}

/// Outcome of reading a date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateField {
    Absent,
    Parsed(NaiveDate),
    Malformed,
}

impl DateField {
    pub(crate) fn value(self) -> Option<NaiveDate> {
        match self {
            Self::Parsed(date) => Some(date),
            Self::Absent | Self::Malformed => None,
        }
    }
}

/// Parse `YYYY-MM-DD`, RFC 3339 timestamps (UTC date), or naive `YYYY-MM-DDTHH:MM:SS`.
pub(crate) fn parse_date_field(value: Option<&str>) -> DateField {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return DateField::Absent;
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return DateField::Parsed(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return DateField::Parsed(timestamp.naive_utc().date());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return DateField::Parsed(timestamp.date());
        }
    }

    DateField::Malformed
}

/// Accept numbers and numeric strings; anything negative or unparsable is `None`.
pub(crate) fn loose_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}
