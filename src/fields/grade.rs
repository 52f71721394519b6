// src/fields/grade.rs
use std::collections::BTreeMap;

/// Canonical grade code for a source grade label.
/// Unmapped labels come back unchanged and `None` becomes ""; both log a warning.
pub fn translate_grade(raw: Option<&str>, table: &BTreeMap<String, String>) -> String {
    let Some(label) = raw else {
        tracing::warn!("missing grade");
        return s!();
    };
    match table.get(label.trim()) {
        Some(code) => code.clone(),
        None => {
            tracing::warn!(grade = label, "unmapped grade");
            s!(label)
        }
    }
}
