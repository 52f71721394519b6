// src/fields/date.rs
use chrono::NaiveDate;

use crate::config::consts::ISO_DATE_FORMAT;

/// `YYYY-MM-DD`, optionally followed by a time part. Empty or malformed → `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, ISO_DATE_FORMAT).ok()
}

pub fn format_date(date: Option<NaiveDate>, fmt: &str) -> String {
    date.map(|d| d.format(fmt).to_string()).unwrap_or_default()
}
