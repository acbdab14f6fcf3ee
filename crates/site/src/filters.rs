//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{DateTime, NaiveDate};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Format a stored date (`YYYY-MM-DD` or RFC 3339) for display, e.g. `9 March 2024`.
///
/// Unparseable values are shown as stored.
///
/// Usage in templates: `{{ item.date|date_label }}`
#[askama::filter_fn]
pub fn date_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_date_label(&value.to_string()))
}

/// Returns the build-time hash of the static assets for cache busting.
///
/// Usage in templates: `{{ ""|asset_version }}`
#[askama::filter_fn]
pub fn asset_version(
    _value: impl Display,
    _env: &dyn askama::Values,
) -> askama::Result<&'static str> {
    Ok(env!("ASSET_VERSION"))
}

fn format_date_label(raw: &str) -> String {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .map_or_else(|| raw.to_string(), |date| date.format("%-d %B %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_label() {
        assert_eq!(format_date_label("2024-03-09"), "9 March 2024");
        assert_eq!(format_date_label("2024-11-20T08:00:00Z"), "20 November 2024");
        assert_eq!(format_date_label("Spring 2024"), "Spring 2024");
        assert_eq!(format_date_label(""), "");
    }
}
