// src/fields/term.rs
use chrono::{Duration, NaiveDate};
use serde::Deserialize;

/// Year boundary a term start or end is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermAnchor {
    Q1Start,
    Q3Start,
    YearEnd,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TermRule {
    /// Source term label, e.g. "First".
    pub label: String,
    /// Output code, e.g. "S1".
    pub code: String,
    pub start: TermAnchor,
    #[serde(default)]
    pub start_offset_days: i64,
    pub end: TermAnchor,
    #[serde(default)]
    pub end_offset_days: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearBoundaries {
    pub q1_start: NaiveDate,
    pub q3_start: NaiveDate,
    pub year_end: NaiveDate,
}

impl YearBoundaries {
    fn at(&self, anchor: TermAnchor) -> NaiveDate {
        match anchor {
            TermAnchor::Q1Start => self.q1_start,
            TermAnchor::Q3Start => self.q3_start,
            TermAnchor::YearEnd => self.year_end,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    pub code: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Code and dates for a term label. Unknown labels keep their label as the
/// code and get no dates (warning logged); missing boundaries give no dates.
pub fn derive_term(label: &str, bounds: Option<&YearBoundaries>, rules: &[TermRule]) -> Term {
    let label = label.trim();
    let Some(rule) = rules.iter().find(|r| r.label == label) else {
        tracing::warn!(term = label, "unknown term label");
        return Term { code: s!(label), start: None, end: None };
    };
    let date = |anchor, offset| bounds.map(|b| b.at(anchor) + Duration::days(offset));
    Term {
        code: rule.code.clone(),
        start: date(rule.start, rule.start_offset_days),
        end: date(rule.end, rule.end_offset_days),
    }
}
